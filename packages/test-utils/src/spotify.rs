//! Mock Spotify server for testing playlist creation
//!
//! Provides a [`MockSpotifyServer`] that serves both the accounts service
//! token endpoint and the Web API endpoints the playlist worker calls, so a
//! client configured with one base URL can run end to end.

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Access token handed out by [`MockSpotifyServer::mock_token_success`]
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

const BEARER: &str = "Bearer mock-access-token";
const TOP_TRACKS_PATH: &str = "/v1/me/top/tracks";
const CREATE_PLAYLIST_PATH: &str = r"^/v1/users/[^/]+/playlists$";
const ADD_TRACKS_PATH: &str = r"^/v1/playlists/[^/]+/tracks$";

/// Mock Spotify server for testing the Spotify client and playlist builds
///
/// # Example
///
/// ```rust,ignore
/// use spotshot_test_utils::MockSpotifyServer;
///
/// #[tokio::test]
/// async fn test_top_tracks() {
///     let server = MockSpotifyServer::start().await;
///     server.mock_token_success().await;
///     server.mock_top_tracks().await;
///
///     // Configure the client with SpotifyConfig::with_base_url(server.url())
/// }
/// ```
pub struct MockSpotifyServer {
    server: MockServer,
}

impl MockSpotifyServer {
    /// Start a new mock Spotify server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the server URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Mount a mock for a successful refresh-token exchange
    pub async fn mock_token_success(&self) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": MOCK_ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-top-read playlist-modify-private playlist-modify-public"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for a revoked refresh token
    pub async fn mock_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Refresh token revoked"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for top tracks
    ///
    /// Returns exactly `limit` tracks named `track0`, `track1`, ... in rank order.
    pub async fn mock_top_tracks(&self) {
        Mock::given(method("GET"))
            .and(path(TOP_TRACKS_PATH))
            .and(header("Authorization", BEARER))
            .respond_with(TopTracksResponder)
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for playlist creation that assigns `playlist_id`
    ///
    /// The response echoes the name, description and visibility from the request.
    pub async fn mock_create_playlist(&self, playlist_id: &str) {
        Mock::given(method("POST"))
            .and(path_regex(CREATE_PLAYLIST_PATH))
            .and(header("Authorization", BEARER))
            .respond_with(CreatePlaylistResponder {
                playlist_id: playlist_id.to_string(),
            })
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for adding tracks to any playlist
    pub async fn mock_add_tracks(&self) {
        Mock::given(method("POST"))
            .and(path_regex(ADD_TRACKS_PATH))
            .and(header("Authorization", BEARER))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "snapshot_id": "mock-snapshot"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a Spotify-style error body on the add-tracks endpoint
    pub async fn mock_add_tracks_failure(&self, status_code: u16, message: &str) {
        self.mock_api_error("POST", ADD_TRACKS_PATH, status_code, message)
            .await;
    }

    /// Mount a Spotify-style error body on the top-tracks endpoint
    pub async fn mock_top_tracks_failure(&self, status_code: u16, message: &str) {
        self.mock_api_error("GET", TOP_TRACKS_PATH, status_code, message)
            .await;
    }

    /// Mount a rate-limit response on the top-tracks endpoint (`Retry-After: 7`)
    pub async fn mock_top_tracks_rate_limited(&self) {
        Mock::given(method("GET"))
            .and(path(TOP_TRACKS_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&self.server)
            .await;
    }

    /// Mount an expired-token response on the top-tracks endpoint
    pub async fn mock_top_tracks_unauthorized(&self) {
        Mock::given(method("GET"))
            .and(path(TOP_TRACKS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "status": 401, "message": "The access token expired" }
            })))
            .mount(&self.server)
            .await;
    }

    async fn mock_api_error(&self, verb: &str, path_pattern: &str, status_code: u16, message: &str) {
        Mock::given(method(verb))
            .and(path_regex(path_pattern))
            .respond_with(ResponseTemplate::new(status_code).set_body_json(json!({
                "error": { "status": status_code, "message": message }
            })))
            .mount(&self.server)
            .await;
    }

    /// Requests received so far whose path matches `path_pattern`
    pub async fn requests_matching(&self, path_pattern: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| path_matches(path_pattern, r.url.path()))
            .collect()
    }

    /// Number of token exchanges received
    pub async fn token_request_count(&self) -> usize {
        self.requests_matching("/api/token").await.len()
    }

    /// Number of top-tracks requests received
    pub async fn top_tracks_request_count(&self) -> usize {
        self.requests_matching(TOP_TRACKS_PATH).await.len()
    }

    /// JSON bodies of every playlist creation request, in arrival order
    pub async fn created_playlists(&self) -> Vec<Value> {
        self.requests_matching(CREATE_PLAYLIST_PATH)
            .await
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Track URIs of every add-tracks request, in arrival order
    pub async fn added_track_uris(&self) -> Vec<Vec<String>> {
        self.requests_matching(ADD_TRACKS_PATH)
            .await
            .iter()
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .map(|body| {
                body["uris"]
                    .as_array()
                    .map(|uris| {
                        uris.iter()
                            .filter_map(|u| u.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Match a request path against one of the fixed patterns above
///
/// Literal paths match exactly; in the anchored patterns `[^/]+` stands for
/// one non-empty path segment.
fn path_matches(pattern: &str, candidate: &str) -> bool {
    let trimmed = pattern.trim_start_matches('^').trim_end_matches('$');
    match trimmed.split_once("[^/]+") {
        None => candidate == trimmed,
        Some((prefix, suffix)) => candidate
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
    }
}

/// Echoes `limit` generated tracks
struct TopTracksResponder;

impl Respond for TopTracksResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let limit = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(20);

        let items: Vec<Value> = (0..limit)
            .map(|i| {
                json!({
                    "id": format!("track{}", i),
                    "name": format!("Track {}", i),
                    "uri": format!("spotify:track:track{}", i),
                    "artists": [{ "id": "artist0", "name": "Mock Artist" }]
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "items": items, "total": limit }))
    }
}

/// Echoes the requested playlist attributes under a fixed ID
struct CreatePlaylistResponder {
    playlist_id: String,
}

impl Respond for CreatePlaylistResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);

        ResponseTemplate::new(201).set_body_json(json!({
            "id": self.playlist_id,
            "name": body["name"],
            "description": body["description"],
            "public": body["public"],
            "uri": format!("spotify:playlist:{}", self.playlist_id)
        }))
    }
}
