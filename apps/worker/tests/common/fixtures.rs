//! Test fixtures for worker integration tests
//!
//! Provides subscriber seeding helpers and a harness that wires a
//! [`PlaylistScheduler`] to the in-memory mocks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use spotshot_test_utils::MockRedisStore;
use spotshot_worker::store::{subscriber_key, IS_PRIVATE_FIELD, NUM_SONGS_FIELD, REFRESH_TOKEN_FIELD};
use spotshot_worker::{PlaylistBuilder, PlaylistScheduler};

use super::mocks::{ManualClock, MockMusicService, MockSubscriberStore};

/// Key prefix used by every fixture
pub const PREFIX: &str = "spot_usr_id";

/// Signature appended to playlist descriptions in tests
pub const SIGNATURE: &str = "spotshot.test";

/// Tick interval used by loop tests
pub const TICK: Duration = Duration::from_secs(60);

/// Noon UTC on the given day
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Refresh token the fixtures store for `user_id`
pub fn token_for(user_id: &str) -> String {
    format!("token-{}", user_id)
}

/// Mocks plus the clock a scheduler under test runs against
pub struct TestHarness {
    pub redis: MockRedisStore,
    pub store: MockSubscriberStore,
    pub music: MockMusicService,
    pub clock: ManualClock,
}

impl TestHarness {
    /// Create a harness whose clock starts at `now`
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let redis = MockRedisStore::new();
        Self {
            store: MockSubscriberStore::new(redis.clone(), PREFIX),
            redis,
            music: MockMusicService::new(),
            clock: ManualClock::new(now),
        }
    }

    /// Store a subscribed user with a refresh token
    pub fn subscribe(&self, user_id: &str, num_songs: u32, is_private: bool) -> &Self {
        let key = subscriber_key(PREFIX, user_id);
        self.redis.hset(&key, NUM_SONGS_FIELD, num_songs.to_string());
        self.redis.hset(&key, REFRESH_TOKEN_FIELD, token_for(user_id));
        if is_private {
            self.redis.hset(&key, IS_PRIVATE_FIELD, "");
        }
        self
    }

    /// Store a user who logged in but never subscribed (or unsubscribed)
    pub fn register_only(&self, user_id: &str) -> &Self {
        let key = subscriber_key(PREFIX, user_id);
        self.redis.hset(&key, REFRESH_TOKEN_FIELD, token_for(user_id));
        self
    }

    /// Set a raw field on a user's record
    pub fn set_field(&self, user_id: &str, field: &str, value: &str) -> &Self {
        self.redis.hset(&subscriber_key(PREFIX, user_id), field, value);
        self
    }

    /// Read a raw field from a user's record
    pub fn field(&self, user_id: &str, field: &str) -> Option<String> {
        self.redis.hget(&subscriber_key(PREFIX, user_id), field)
    }

    /// Scheduler over this harness building `max_concurrent_jobs` at once
    pub fn scheduler(&self, max_concurrent_jobs: usize) -> PlaylistScheduler {
        let builder = PlaylistBuilder::new(Arc::new(self.music.clone()), SIGNATURE);
        PlaylistScheduler::new(
            Arc::new(self.store.clone()),
            builder,
            Arc::new(self.clock.clone()),
            TICK,
        )
        .with_key_prefix(PREFIX)
        .with_max_concurrent_jobs(max_concurrent_jobs)
    }
}
