//! Shared test utilities for Spotshot workspace
//!
//! This crate provides mock implementations of external services for testing
//! without network dependencies. These mocks are used by the worker and the
//! Spotify client test suites.
//!
//! # Mock Services
//!
//! - [`MockSpotifyServer`] - Mock Spotify accounts + Web API server
//! - [`MockRedisStore`] - In-memory Redis mock with hash commands
//!
//! # Example
//!
//! ```rust,ignore
//! use spotshot_test_utils::{MockRedisStore, MockSpotifyServer};
//!
//! #[tokio::test]
//! async fn test_with_mocks() {
//!     let spotify = MockSpotifyServer::start().await;
//!     spotify.mock_token_success().await;
//!     spotify.mock_top_tracks().await;
//!
//!     // Point SpotifyConfig::with_base_url at spotify.url()
//! }
//! ```

mod redis;
mod spotify;

pub use redis::MockRedisStore;
pub use spotify::{MockSpotifyServer, MOCK_ACCESS_TOKEN};
