//! Spotify API client implementation

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use spotshot_shared_config::SpotifyConfig;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{
    track_uri, AddTracksRequest, CreatePlaylistRequest, ErrorResponse, Playlist,
    SnapshotResponse, TimeRange, TokenErrorResponse, TokenResponse, TopTracksResponse, Track,
};

/// Largest `limit` accepted by the top-tracks endpoint
pub const MAX_TOP_TRACKS: u32 = 50;

/// Largest number of tracks accepted by one add-tracks call
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Access tokens are refreshed this long before Spotify says they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Factory for per-user Spotify clients
///
/// Holds the application credentials and a shared HTTP connection pool.
/// Every minted [`SpotifyClient`] exchanges its own refresh token for
/// access tokens on demand.
#[derive(Clone)]
pub struct SpotifyAuthenticator {
    http_client: Client,
    config: Arc<SpotifyConfig>,
}

impl fmt::Debug for SpotifyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyAuthenticator")
            .field("config", &self.config)
            .finish()
    }
}

impl SpotifyAuthenticator {
    /// Create a new authenticator from application configuration
    ///
    /// # Errors
    /// Returns `SpotifyError::MissingCredentials` if the client ID or secret is empty
    pub fn new(config: SpotifyConfig) -> SpotifyResult<Self> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(SpotifyError::MissingCredentials);
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("Spotshot/1.0")
            .build()?;

        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }

    /// Mint a client acting on behalf of the user owning `refresh_token`
    ///
    /// No network call is made here; the token is exchanged on first use.
    ///
    /// # Errors
    /// Returns `SpotifyError::MissingRefreshToken` if the token is empty
    pub fn client(&self, refresh_token: impl Into<String>) -> SpotifyResult<SpotifyClient> {
        let refresh_token = refresh_token.into();
        if refresh_token.trim().is_empty() {
            return Err(SpotifyError::MissingRefreshToken);
        }

        Ok(SpotifyClient {
            http_client: self.http_client.clone(),
            config: Arc::clone(&self.config),
            refresh_token,
            access_token: Arc::new(Mutex::new(None)),
        })
    }
}

/// Cached access token with its expiry
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn new(value: String, expires_in: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + expires_in,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// Spotify Web API client scoped to one user
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    config: Arc<SpotifyConfig>,
    refresh_token: String,
    access_token: Arc<Mutex<Option<AccessToken>>>,
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("refresh_token", &"[REDACTED]")
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl SpotifyClient {
    /// Return a usable access token, exchanging the refresh token when needed
    async fn access_token(&self) -> SpotifyResult<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.refresh_access_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Exchange the refresh token for a new access token
    async fn refresh_access_token(&self) -> SpotifyResult<AccessToken> {
        debug!("Refreshing Spotify access token");

        let response = self
            .http_client
            .post(self.config.token_url())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }

        let text = response.text().await.map_err(SpotifyError::Http)?;
        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("status {}", status.as_u16()),
            };
            return Err(SpotifyError::TokenRefresh(message));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }

    /// Send an authorized request and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> SpotifyResult<T> {
        let token = self.access_token().await?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = match check_status(response).await {
            Ok(response) => response,
            Err(SpotifyError::Unauthorized) => {
                // Drop the cached token so the next call re-exchanges it
                self.access_token.lock().await.take();
                return Err(SpotifyError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        let text = response.text().await.map_err(SpotifyError::Http)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Get the current user's top tracks, best ranked first
    ///
    /// # Arguments
    /// * `limit` - Number of tracks to return (1 to 50)
    /// * `time_range` - Ranking window
    ///
    /// # Errors
    /// - `SpotifyError::InvalidInput` - If `limit` is out of range
    /// - `SpotifyError::Api` - If Spotify returns an error
    /// - `SpotifyError::Http` - If the HTTP request fails
    #[instrument(skip(self))]
    pub async fn top_tracks(&self, limit: u32, time_range: TimeRange) -> SpotifyResult<Vec<Track>> {
        if limit == 0 || limit > MAX_TOP_TRACKS {
            return Err(SpotifyError::InvalidInput(format!(
                "top tracks limit must be between 1 and {}, got {}",
                MAX_TOP_TRACKS, limit
            )));
        }

        let limit_str = limit.to_string();
        let request = self
            .http_client
            .get(self.config.api_endpoint("me/top/tracks"))
            .query(&[("time_range", time_range.as_str()), ("limit", limit_str.as_str())]);

        let response: TopTracksResponse = self.send(request).await?;

        debug!(track_count = response.items.len(), "Fetched top tracks");

        Ok(response.items)
    }

    /// Create an empty playlist owned by `user_id`
    ///
    /// # Errors
    /// - `SpotifyError::InvalidInput` - If the user ID or name is empty
    /// - `SpotifyError::Api` - If Spotify returns an error
    #[instrument(skip(self, description))]
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> SpotifyResult<Playlist> {
        if user_id.trim().is_empty() {
            return Err(SpotifyError::InvalidInput(
                "user ID cannot be empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(SpotifyError::InvalidInput(
                "playlist name cannot be empty".to_string(),
            ));
        }

        let request = self
            .http_client
            .post(self.resource_url("users", user_id, "playlists")?)
            .json(&CreatePlaylistRequest {
                name,
                description,
                public,
            });

        let playlist: Playlist = self.send(request).await?;

        debug!(playlist_id = %playlist.id, "Created playlist");

        Ok(playlist)
    }

    /// Append tracks to a playlist, keeping the given order
    ///
    /// Returns the playlist snapshot ID after the change.
    ///
    /// # Errors
    /// - `SpotifyError::InvalidInput` - If no tracks or more than 100 tracks are given
    /// - `SpotifyError::Api` - If Spotify returns an error
    #[instrument(skip(self, track_ids), fields(track_count = track_ids.len()))]
    pub async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> SpotifyResult<String> {
        if track_ids.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "at least one track is required".to_string(),
            ));
        }
        if track_ids.len() > MAX_TRACKS_PER_REQUEST {
            return Err(SpotifyError::InvalidInput(format!(
                "at most {} tracks can be added per request, got {}",
                MAX_TRACKS_PER_REQUEST,
                track_ids.len()
            )));
        }

        let request = self
            .http_client
            .post(self.resource_url("playlists", playlist_id, "tracks")?)
            .json(&AddTracksRequest {
                uris: track_ids.iter().map(|id| track_uri(id)).collect(),
            });

        let response: SnapshotResponse = self.send(request).await?;
        Ok(response.snapshot_id)
    }

    /// API URL for `{collection}/{id}/{tail}`, with `id` percent-encoded as a
    /// single path segment
    fn resource_url(&self, collection: &str, id: &str, tail: &str) -> SpotifyResult<Url> {
        let mut url = Url::parse(&self.config.api_endpoint(collection))
            .map_err(|e| SpotifyError::InvalidInput(format!("invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SpotifyError::InvalidInput("API URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push(id)
            .push(tail);
        Ok(url)
    }
}

/// Map a transport failure, distinguishing timeouts
fn map_transport_error(e: reqwest::Error) -> SpotifyError {
    if e.is_timeout() {
        SpotifyError::Timeout
    } else {
        SpotifyError::Http(e)
    }
}

/// Build a rate-limit error from the `Retry-After` header
fn rate_limited(response: &Response) -> SpotifyError {
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    warn!(?retry_after_secs, "Spotify API rate limited");
    SpotifyError::RateLimited { retry_after_secs }
}

/// Turn non-success statuses into typed errors
async fn check_status(response: Response) -> SpotifyResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(rate_limited(&response)),
        StatusCode::UNAUTHORIZED => Err(SpotifyError::Unauthorized),
        _ => {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => err.error.message,
                Err(_) if !text.is_empty() => text,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            };
            Err(SpotifyError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
