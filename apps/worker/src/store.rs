//! Subscriber records in Redis
//!
//! Each subscriber is one Redis hash keyed `{prefix}:{user_id}`:
//!
//! | field           | meaning                                          |
//! |-----------------|--------------------------------------------------|
//! | `num_songs`     | requested track count; presence = subscribed     |
//! | `is_private`    | presence flag (empty value) for private playlists |
//! | `refresh_token` | credential used to mint a Spotify client         |
//! | `last_period`   | `YYYY-MM` of the last monthly playlist built     |
//!
//! The scheduler only reads records and writes `last_period`. The other
//! writes exist for the request layer that handles subscribe and
//! unsubscribe actions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use spotshot_shared_config::RedisConfig;

use crate::clock::Period;
use crate::error::{WorkerError, WorkerResult};

/// Field holding the requested track count
pub const NUM_SONGS_FIELD: &str = "num_songs";

/// Field whose presence marks playlists as private
pub const IS_PRIVATE_FIELD: &str = "is_private";

/// Field holding the Spotify refresh token
pub const REFRESH_TOKEN_FIELD: &str = "refresh_token";

/// Field holding the month of the last monthly playlist
pub const LAST_PERIOD_FIELD: &str = "last_period";

/// Key prefix used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "spot_usr_id";

/// Smallest track count a subscriber can ask for
pub const MIN_SONGS: u32 = 1;

/// Largest track count a subscriber can ask for
pub const MAX_SONGS: u32 = 50;

/// A subscriber eligible for playlist builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub user_id: String,
    /// Full store key the record was read from
    pub key: String,
    pub song_count: u32,
    pub is_private: bool,
    pub refresh_token: String,
    /// Month of the last monthly playlist, if one was ever recorded
    pub last_period: Option<Period>,
}

/// Outcome of reading one subscriber record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberLookup {
    Eligible(Subscriber),
    /// No track count stored; the user is not subscribed
    NotEligible,
}

impl Subscriber {
    /// Decode a subscriber from the fields of its hash
    ///
    /// A missing `num_songs` is not an error: it means the user unsubscribed
    /// (or never subscribed) and yields [`SubscriberLookup::NotEligible`].
    pub fn from_fields(key: &str, fields: &HashMap<String, String>) -> WorkerResult<SubscriberLookup> {
        let Some(raw_count) = fields.get(NUM_SONGS_FIELD) else {
            return Ok(SubscriberLookup::NotEligible);
        };

        let song_count: u32 = raw_count.trim().parse().map_err(|_| {
            WorkerError::invalid_subscriber(
                key,
                format!("{} is not a number: '{}'", NUM_SONGS_FIELD, raw_count),
            )
        })?;

        let refresh_token = fields
            .get(REFRESH_TOKEN_FIELD)
            .filter(|t| !t.is_empty())
            .cloned()
            .ok_or_else(|| {
                WorkerError::invalid_subscriber(key, format!("{} is missing", REFRESH_TOKEN_FIELD))
            })?;

        let last_period = fields
            .get(LAST_PERIOD_FIELD)
            .and_then(|raw| match raw.parse::<Period>() {
                Ok(period) => Some(period),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring unreadable period marker");
                    None
                }
            });

        Ok(SubscriberLookup::Eligible(Self {
            user_id: user_id_from_key(key).to_string(),
            key: key.to_string(),
            song_count,
            is_private: fields.contains_key(IS_PRIVATE_FIELD),
            refresh_token,
            last_period,
        }))
    }
}

/// Build the store key for a user
pub fn subscriber_key(prefix: &str, user_id: &str) -> String {
    format!("{}:{}", prefix, user_id)
}

/// User ID part of a store key (everything after the first `:`)
pub fn user_id_from_key(key: &str) -> &str {
    key.split_once(':').map_or(key, |(_, user_id)| user_id)
}

/// Clamp a requested track count into the range Spotify will serve
pub fn clamp_song_count(requested: i64) -> u32 {
    // Bounds fit in u32 after the clamp
    requested.clamp(MIN_SONGS as i64, MAX_SONGS as i64) as u32
}

/// Read access to subscriber records, as used by the scheduler
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Keys of every subscriber record (subscribed or not)
    async fn list_subscriber_keys(&self) -> WorkerResult<Vec<String>>;

    /// Read one record in a single round trip
    async fn load_subscriber(&self, key: &str) -> WorkerResult<SubscriberLookup>;

    /// Record that the monthly playlist for `period` was built
    async fn mark_processed(&self, key: &str, period: Period) -> WorkerResult<()>;
}

/// Redis hash commands the subscriber store is built on
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Keys matching a glob pattern (`SCAN MATCH`)
    async fn keys_matching(&self, pattern: &str) -> WorkerResult<Vec<String>>;

    /// Every field of a hash (`HGETALL`); empty when the key is absent
    async fn read_hash(&self, key: &str) -> WorkerResult<HashMap<String, String>>;

    /// `HSET`
    async fn set_field(&self, key: &str, field: &str, value: &str) -> WorkerResult<()>;

    /// `HDEL`
    async fn remove_field(&self, key: &str, field: &str) -> WorkerResult<()>;

    /// `HEXISTS`
    async fn has_field(&self, key: &str, field: &str) -> WorkerResult<bool>;
}

#[async_trait]
impl HashStore for MultiplexedConnection {
    async fn keys_matching(&self, pattern: &str) -> WorkerResult<Vec<String>> {
        let mut conn = self.clone();
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn read_hash(&self, key: &str) -> WorkerResult<HashMap<String, String>> {
        let mut conn = self.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> WorkerResult<()> {
        let mut conn = self.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn remove_field(&self, key: &str, field: &str) -> WorkerResult<()> {
        let mut conn = self.clone();
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }

    async fn has_field(&self, key: &str, field: &str) -> WorkerResult<bool> {
        let mut conn = self.clone();
        Ok(conn.hexists(key, field).await?)
    }
}

/// Subscriber store backed by Redis hashes
#[derive(Clone)]
pub struct RedisSubscriberStore<H = MultiplexedConnection> {
    hashes: H,
    prefix: String,
}

impl RedisSubscriberStore {
    /// Open a multiplexed connection and check it with `PING`
    pub async fn connect(config: &RedisConfig, prefix: impl Into<String>) -> WorkerResult<Self> {
        let client = redis::Client::open(config.connection_url())?;
        let timeout = Duration::from_secs(config.connect_timeout_secs);

        let mut conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                WorkerError::Configuration(format!(
                    "timed out connecting to Redis after {:?}",
                    timeout
                ))
            })??;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self::new(conn, prefix))
    }
}

impl<H: HashStore> RedisSubscriberStore<H> {
    /// Wrap an existing connection
    pub fn new(hashes: H, prefix: impl Into<String>) -> Self {
        Self {
            hashes,
            prefix: prefix.into(),
        }
    }

    /// Key prefix this store scans under
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Subscribe a user, or update an existing subscription
    ///
    /// The track count is clamped into [`MIN_SONGS`]..=[`MAX_SONGS`] here and
    /// never re-clamped on read.
    pub async fn subscribe(&self, user_id: &str, num_songs: i64, is_private: bool) -> WorkerResult<u32> {
        let key = subscriber_key(&self.prefix, user_id);
        let song_count = clamp_song_count(num_songs);

        self.hashes
            .set_field(&key, NUM_SONGS_FIELD, &song_count.to_string())
            .await?;
        if is_private {
            self.hashes.set_field(&key, IS_PRIVATE_FIELD, "").await?;
        } else {
            self.hashes.remove_field(&key, IS_PRIVATE_FIELD).await?;
        }

        tracing::info!(user_id = %user_id, song_count, is_private, "Subscriber updated");
        Ok(song_count)
    }

    /// Stop monthly playlists for a user, keeping the stored credential
    pub async fn unsubscribe(&self, user_id: &str) -> WorkerResult<()> {
        let key = subscriber_key(&self.prefix, user_id);
        self.hashes.remove_field(&key, NUM_SONGS_FIELD).await?;

        tracing::info!(user_id = %user_id, "Subscriber removed");
        Ok(())
    }

    /// Store the refresh token obtained at login
    pub async fn store_refresh_token(&self, user_id: &str, refresh_token: &str) -> WorkerResult<()> {
        let key = subscriber_key(&self.prefix, user_id);
        self.hashes
            .set_field(&key, REFRESH_TOKEN_FIELD, refresh_token)
            .await
    }

    /// Whether the user currently has a monthly subscription
    pub async fn is_subscribed(&self, user_id: &str) -> WorkerResult<bool> {
        let key = subscriber_key(&self.prefix, user_id);
        self.hashes.has_field(&key, NUM_SONGS_FIELD).await
    }
}

#[async_trait]
impl<H: HashStore> SubscriberStore for RedisSubscriberStore<H> {
    async fn list_subscriber_keys(&self) -> WorkerResult<Vec<String>> {
        let pattern = format!("{}:*", self.prefix);
        let keys = self.hashes.keys_matching(&pattern).await?;

        tracing::debug!(pattern = %pattern, count = keys.len(), "Enumerated subscriber keys");
        Ok(keys)
    }

    async fn load_subscriber(&self, key: &str) -> WorkerResult<SubscriberLookup> {
        let fields = self.hashes.read_hash(key).await?;
        Subscriber::from_fields(key, &fields)
    }

    async fn mark_processed(&self, key: &str, period: Period) -> WorkerResult<()> {
        self.hashes
            .set_field(key, LAST_PERIOD_FIELD, &period.to_string())
            .await
    }
}
