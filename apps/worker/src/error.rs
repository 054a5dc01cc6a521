//! Error handling for the Spotshot worker
//!
//! This module provides a unified error type using thiserror for the
//! playlist scheduler: store access, per-user playlist builds, and the
//! enqueue side of the one-off trigger channel.

use std::fmt;
use std::time::Duration;

use spotshot_spotify_client::SpotifyError;
use thiserror::Error;

/// Step of a playlist build, used to tell which external call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Minting a Spotify client from the stored refresh token
    MintClient,
    /// Fetching the user's top tracks
    FetchTopTracks,
    /// Creating the (empty) playlist
    CreatePlaylist,
    /// Adding the fetched tracks to the new playlist
    AddTracks,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MintClient => "mint Spotify client",
            Self::FetchTopTracks => "fetch top tracks",
            Self::CreatePlaylist => "create playlist",
            Self::AddTracks => "add tracks to playlist",
        })
    }
}

/// Main worker error type
#[derive(Error, Debug)]
pub enum WorkerError {
    // ========== Store Errors ==========
    /// Redis operation failed
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Subscriber record exists but cannot be decoded
    #[error("invalid subscriber record '{key}': {reason}")]
    InvalidSubscriber { key: String, reason: String },

    // ========== Playlist Build Errors ==========
    /// One step of a playlist build failed against the Spotify API
    #[error("failed to {step} for user {user_id}: {source}")]
    Build {
        user_id: String,
        step: BuildStep,
        /// Playlist left behind empty when the failure came after creation
        playlist_id: Option<String>,
        #[source]
        source: SpotifyError,
    },

    // ========== Configuration Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WorkerError {
    /// Check if this error is transient
    ///
    /// Nothing is retried inside a batch; a retryable failure is simply
    /// picked up again by a later run.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Redis(_) => true,
            Self::Build { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get a severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Redis(_) => ErrorSeverity::Error,
            Self::Build { source, .. } if source.is_retryable() => ErrorSeverity::Warning,
            Self::Build { .. } => ErrorSeverity::Error,
            Self::InvalidSubscriber { .. } => ErrorSeverity::Warning,
        }
    }

    /// Get the failed build step, if this is a build error
    pub fn build_step(&self) -> Option<BuildStep> {
        match self {
            Self::Build { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Log the error with appropriate severity
    pub fn log(&self) {
        let step = self
            .build_step()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        match self.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %self,
                    step = %step,
                    retryable = self.is_retryable(),
                    "Critical worker error"
                );
            }
            ErrorSeverity::Error => {
                tracing::error!(
                    error = %self,
                    step = %step,
                    retryable = self.is_retryable(),
                    "Worker error"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error = %self,
                    step = %step,
                    retryable = self.is_retryable(),
                    "Worker warning"
                );
            }
        }
    }

    /// Create a build error for a step that left nothing behind
    pub fn build(user_id: impl Into<String>, step: BuildStep, source: SpotifyError) -> Self {
        Self::Build {
            user_id: user_id.into(),
            step,
            playlist_id: None,
            source,
        }
    }

    /// Create an invalid subscriber error
    pub fn invalid_subscriber(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubscriber {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that should trigger alerts
    Critical,
    /// Standard errors
    Error,
    /// Warnings for expected or transient failures
    Warning,
}

/// Result type alias for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure to hand a one-off request to the scheduler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The queue stayed full for the whole send timeout
    #[error("playlist scheduler did not accept the request within {0:?}")]
    Timeout(Duration),

    /// The scheduler loop has exited
    #[error("playlist scheduler has stopped")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let rate_limited = WorkerError::build(
            "alice",
            BuildStep::FetchTopTracks,
            SpotifyError::RateLimited {
                retry_after_secs: None,
            },
        );
        assert!(rate_limited.is_retryable());

        let revoked = WorkerError::build(
            "alice",
            BuildStep::FetchTopTracks,
            SpotifyError::TokenRefresh("invalid_grant".to_string()),
        );
        assert!(!revoked.is_retryable());

        assert!(!WorkerError::invalid_subscriber("k", "bad").is_retryable());
        assert!(!WorkerError::Configuration("x".to_string()).is_retryable());
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(
            WorkerError::Configuration("test".to_string()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            WorkerError::build("a", BuildStep::CreatePlaylist, SpotifyError::Unauthorized)
                .severity(),
            ErrorSeverity::Error
        );
        assert_eq!(
            WorkerError::build("a", BuildStep::AddTracks, SpotifyError::Timeout).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            WorkerError::invalid_subscriber("k", "bad").severity(),
            ErrorSeverity::Warning
        );
    }

    #[test]
    fn test_build_error_names_the_step() {
        let err = WorkerError::build(
            "coolkid99",
            BuildStep::CreatePlaylist,
            SpotifyError::Api {
                status: 403,
                message: "Forbidden".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "failed to create playlist for user coolkid99: Spotify API error 403: Forbidden"
        );
        assert_eq!(err.build_step(), Some(BuildStep::CreatePlaylist));
    }

    #[test]
    fn test_error_display() {
        let err = WorkerError::invalid_subscriber("spot_usr_id:bob", "num_songs is not a number");
        assert_eq!(
            err.to_string(),
            "invalid subscriber record 'spot_usr_id:bob': num_songs is not a number"
        );

        assert_eq!(
            TriggerError::Timeout(Duration::from_secs(5)).to_string(),
            "playlist scheduler did not accept the request within 5s"
        );
    }
}
