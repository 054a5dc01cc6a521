//! Spotify application credential configuration

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

/// Default Spotify Web API base URL
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

/// Default Spotify accounts service base URL (token exchange)
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Spotify application configuration
#[derive(Clone)]
pub struct SpotifyConfig {
    /// OAuth client ID of the registered Spotify application
    pub client_id: String,

    /// OAuth client secret of the registered Spotify application
    pub client_secret: String,

    /// Redirect URI registered for the login callback
    pub redirect_uri: String,

    /// Web API base URL
    pub api_url: String,

    /// Accounts service base URL
    pub accounts_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_url", &self.api_url)
            .field("accounts_url", &self.accounts_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SpotifyConfig {
    /// Load Spotify configuration from environment variables
    ///
    /// `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET` are required.
    pub fn from_env() -> ConfigResult<Self> {
        let client_id = get_required_env("SPOTIFY_CLIENT_ID")?;
        let client_secret = get_required_env("SPOTIFY_CLIENT_SECRET")?;

        if client_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SPOTIFY_CLIENT_ID".to_string(),
                "client ID cannot be empty".to_string(),
            ));
        }

        if client_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SPOTIFY_CLIENT_SECRET".to_string(),
                "client secret cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: get_env_or_default(
                "SPOTIFY_REDIRECT_URI",
                "http://localhost:8080/callback",
            ),
            api_url: get_env_or_default("SPOTIFY_API_URL", DEFAULT_API_URL),
            accounts_url: get_env_or_default("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            timeout_secs: parse_env("SPOTIFY_TIMEOUT", 10)?,
        })
    }

    /// Create a configuration with custom credentials (useful for testing)
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Point both the Web API and the accounts service at one base URL
    ///
    /// Used to route every call through a single mock server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_url = url.clone();
        self.accounts_url = url;
        self
    }

    /// Get the full URL for a Web API path
    pub fn api_endpoint(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/v1/{}", base, path)
    }

    /// Get the full URL of the token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }
}
