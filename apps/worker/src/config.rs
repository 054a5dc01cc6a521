//! Worker configuration loaded from environment variables
//!
//! This module provides configuration management for the Spotshot worker.
//! Configuration is loaded from environment variables with sensible defaults
//! for development environments.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use spotshot_shared_config::{CommonConfig, Environment, RedisConfig, SpotifyConfig};

use crate::store::DEFAULT_KEY_PREFIX;

/// Signature appended to playlist descriptions by default
pub const DEFAULT_PLAYLIST_SIGNATURE: &str = "spotshot.jelliott.dev";

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Seconds between month-boundary checks
    pub month_check_interval_secs: u64,

    /// Maximum playlist builds in flight during a monthly batch
    ///
    /// The default of 1 builds subscribers one at a time in enumeration
    /// order. Wider pools give up that ordering.
    pub max_concurrent_jobs: usize,

    /// Pending one-off requests the trigger queue holds
    pub trigger_queue_capacity: usize,

    /// Seconds a request handler waits for room in the trigger queue
    pub trigger_send_timeout_secs: u64,

    /// Prefix of subscriber keys in Redis
    pub key_prefix: String,

    /// Site name written at the end of every playlist description
    pub playlist_signature: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let config = Self {
            common,

            month_check_interval_secs: env::var("WORKER_MONTH_CHECK_INTERVAL")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid WORKER_MONTH_CHECK_INTERVAL value")?,

            max_concurrent_jobs: env::var("WORKER_MAX_CONCURRENT_JOBS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid WORKER_MAX_CONCURRENT_JOBS value")?,

            trigger_queue_capacity: env::var("WORKER_TRIGGER_QUEUE_CAPACITY")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("Invalid WORKER_TRIGGER_QUEUE_CAPACITY value")?,

            trigger_send_timeout_secs: env::var("WORKER_TRIGGER_SEND_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid WORKER_TRIGGER_SEND_TIMEOUT value")?,

            key_prefix: env::var("SUBSCRIBER_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),

            playlist_signature: env::var("PLAYLIST_SIGNATURE")
                .unwrap_or_else(|_| DEFAULT_PLAYLIST_SIGNATURE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.month_check_interval_secs == 0 {
            bail!("WORKER_MONTH_CHECK_INTERVAL must be greater than zero");
        }
        if self.max_concurrent_jobs == 0 {
            bail!("WORKER_MAX_CONCURRENT_JOBS must be greater than zero");
        }
        if self.trigger_queue_capacity == 0 {
            bail!("WORKER_TRIGGER_QUEUE_CAPACITY must be greater than zero");
        }
        if self.key_prefix.is_empty() || self.key_prefix.contains(':') {
            bail!("SUBSCRIBER_KEY_PREFIX must be non-empty and must not contain ':'");
        }
        Ok(())
    }

    /// Interval between month-boundary checks
    pub fn month_check_interval(&self) -> Duration {
        Duration::from_secs(self.month_check_interval_secs)
    }

    /// How long a request handler waits to enqueue a one-off request
    pub fn trigger_send_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_send_timeout_secs)
    }

    // Convenience accessors for common config fields

    /// Get Redis configuration
    pub fn redis(&self) -> &RedisConfig {
        &self.common.redis
    }

    /// Get Spotify configuration
    pub fn spotify(&self) -> &SpotifyConfig {
        &self.common.spotify
    }

    /// Get environment mode
    pub fn environment(&self) -> Environment {
        self.common.environment
    }
}
