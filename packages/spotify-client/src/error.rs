//! Spotify API error types

use thiserror::Error;

/// Spotify API client errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Application client ID or secret is missing
    #[error("client ID and secret are required for Spotify API access")]
    MissingCredentials,

    /// No refresh token was available to mint a client
    #[error("refresh token is required to create a Spotify client")]
    MissingRefreshToken,

    /// Invalid input provided to API method
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Refresh token exchange was rejected by the accounts service
    #[error("Spotify token refresh failed: {0}")]
    TokenRefresh(String),

    /// Access token was rejected
    #[error("Spotify rejected the access token")]
    Unauthorized,

    /// Spotify API returned an error
    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Spotify
    #[error("Rate limited by Spotify API")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Request timeout
    #[error("Request to Spotify timed out")]
    Timeout,
}

impl SpotifyError {
    /// Check if this error is retryable (transient failure)
    ///
    /// Retries make sense on:
    /// - Timeouts
    /// - Rate limiting
    /// - Transport errors (connect, timeout)
    /// - Server errors (5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            SpotifyError::Timeout | SpotifyError::RateLimited { .. } => true,
            SpotifyError::Api { status, .. } => *status >= 500,
            SpotifyError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error())
            }
            _ => false,
        }
    }
}

/// Result type for Spotify operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;
