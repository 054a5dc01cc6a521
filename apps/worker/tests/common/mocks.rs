//! Mock services for worker integration tests
//!
//! Provides in-memory stand-ins for the subscriber store, the music service
//! and the clock, so scheduler behaviour can be checked without Redis or
//! network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spotshot_spotify_client::{SpotifyError, SpotifyResult, TimeRange};
use spotshot_test_utils::MockRedisStore;
use spotshot_worker::store::LAST_PERIOD_FIELD;
use spotshot_worker::{
    BuildStep, Clock, MusicClient, MusicClientFactory, Period, Subscriber, SubscriberLookup,
    SubscriberStore, WorkerError, WorkerResult,
};

// =============================================================================
// Subscriber store
// =============================================================================

/// [`SubscriberStore`] over the shared in-memory Redis mock
#[derive(Clone)]
pub struct MockSubscriberStore {
    redis: MockRedisStore,
    prefix: String,
    fail_enumeration: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
    load_calls: Arc<AtomicUsize>,
}

impl MockSubscriberStore {
    pub fn new(redis: MockRedisStore, prefix: &str) -> Self {
        Self {
            redis,
            prefix: prefix.to_string(),
            fail_enumeration: Arc::new(AtomicBool::new(false)),
            list_calls: Arc::new(AtomicUsize::new(0)),
            load_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make key enumeration fail until switched back
    pub fn set_enumeration_failure(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    /// Number of enumeration plus record reads so far
    pub fn read_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst) + self.load_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriberStore for MockSubscriberStore {
    async fn list_subscriber_keys(&self) -> WorkerResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(WorkerError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))));
        }
        Ok(self.redis.keys(&format!("{}:*", self.prefix)))
    }

    async fn load_subscriber(&self, key: &str) -> WorkerResult<SubscriberLookup> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Subscriber::from_fields(key, &self.redis.hgetall(key))
    }

    async fn mark_processed(&self, key: &str, period: Period) -> WorkerResult<()> {
        self.redis.hset(key, LAST_PERIOD_FIELD, period.to_string());
        Ok(())
    }
}

// =============================================================================
// Music service
// =============================================================================

/// A playlist as the mock music service recorded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPlaylist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub track_ids: Vec<String>,
}

#[derive(Default)]
struct MusicState {
    playlists: Vec<RecordedPlaylist>,
    failures: HashMap<String, BuildStep>,
    /// Refresh token of every API call, in call order
    calls: Vec<String>,
    latency: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Recording fake for the music service
///
/// Clients are keyed by refresh token. Top tracks for token `t` with
/// limit `n` are `t-00`, `t-01`, ... `t-{n-1}` in rank order.
#[derive(Clone, Default)]
pub struct MockMusicService {
    state: Arc<Mutex<MusicState>>,
}

impl MockMusicService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MusicState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the given build step for the owner of `refresh_token`
    pub fn fail_for(&self, refresh_token: &str, step: BuildStep) {
        self.lock().failures.insert(refresh_token.to_string(), step);
    }

    /// Delay every top-tracks call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Playlists created so far, in creation order
    pub fn playlists(&self) -> Vec<RecordedPlaylist> {
        self.lock().playlists.clone()
    }

    /// Playlists created for one user
    pub fn playlists_for(&self, user_id: &str) -> Vec<RecordedPlaylist> {
        self.playlists()
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect()
    }

    /// Total API calls made through any client
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// API calls made with one refresh token
    pub fn calls_for(&self, refresh_token: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|t| t.as_str() == refresh_token)
            .count()
    }

    /// Largest number of top-tracks calls seen in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Track IDs the mock returns for `refresh_token` and `limit`
    pub fn expected_tracks(refresh_token: &str, limit: u32) -> Vec<String> {
        (0..limit)
            .map(|i| format!("{}-{:02}", refresh_token, i))
            .collect()
    }

    fn failure(&self, refresh_token: &str, step: BuildStep) -> Option<SpotifyError> {
        let configured = self.lock().failures.get(refresh_token).copied();
        (configured == Some(step)).then(|| match step {
            BuildStep::MintClient => SpotifyError::MissingRefreshToken,
            BuildStep::FetchTopTracks => SpotifyError::Api {
                status: 500,
                message: "Server error".to_string(),
            },
            BuildStep::CreatePlaylist | BuildStep::AddTracks => SpotifyError::Api {
                status: 403,
                message: "Forbidden".to_string(),
            },
        })
    }
}

impl MusicClientFactory for MockMusicService {
    fn client_for(&self, refresh_token: &str) -> SpotifyResult<Box<dyn MusicClient>> {
        if let Some(err) = self.failure(refresh_token, BuildStep::MintClient) {
            return Err(err);
        }
        Ok(Box::new(MockMusicClient {
            service: self.clone(),
            refresh_token: refresh_token.to_string(),
        }))
    }
}

struct MockMusicClient {
    service: MockMusicService,
    refresh_token: String,
}

impl MockMusicClient {
    fn record_call(&self) {
        self.service.lock().calls.push(self.refresh_token.clone());
    }
}

#[async_trait]
impl MusicClient for MockMusicClient {
    async fn fetch_top_tracks(&self, limit: u32, range: TimeRange) -> SpotifyResult<Vec<String>> {
        assert_eq!(range, TimeRange::ShortTerm);
        self.record_call();

        let latency = {
            let mut state = self.service.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.service.lock().in_flight -= 1;

        if let Some(err) = self
            .service
            .failure(&self.refresh_token, BuildStep::FetchTopTracks)
        {
            return Err(err);
        }
        Ok(MockMusicService::expected_tracks(&self.refresh_token, limit))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> SpotifyResult<String> {
        self.record_call();
        if let Some(err) = self
            .service
            .failure(&self.refresh_token, BuildStep::CreatePlaylist)
        {
            return Err(err);
        }

        let mut state = self.service.lock();
        let id = format!("playlist-{}", state.playlists.len() + 1);
        state.playlists.push(RecordedPlaylist {
            id: id.clone(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            public,
            track_ids: Vec::new(),
        });
        Ok(id)
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> SpotifyResult<()> {
        self.record_call();
        if let Some(err) = self
            .service
            .failure(&self.refresh_token, BuildStep::AddTracks)
        {
            return Err(err);
        }

        let mut state = self.service.lock();
        if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.track_ids.extend_from_slice(track_ids);
        }
        Ok(())
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
