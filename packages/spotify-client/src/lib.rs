//! Spotify Web API client for Spotshot
//!
//! This crate mints per-user Spotify clients from stored refresh tokens and
//! exposes the handful of endpoints the playlist worker needs:
//! - Top tracks of the current user over a time range
//! - Playlist creation
//! - Adding tracks to a playlist
//!
//! # Example
//!
//! ```rust,no_run
//! use spotshot_shared_config::SpotifyConfig;
//! use spotshot_spotify_client::{SpotifyAuthenticator, TimeRange};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = SpotifyAuthenticator::new(SpotifyConfig::new("client-id", "client-secret"))?;
//! let client = auth.client("stored-refresh-token")?;
//!
//! let tracks = client.top_tracks(20, TimeRange::ShortTerm).await?;
//! let playlist = client
//!     .create_playlist("some-user", "My Top Songs", "made by me", true)
//!     .await?;
//! let ids: Vec<String> = tracks.into_iter().map(|t| t.id).collect();
//! client.add_tracks(&playlist.id, &ids).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `SPOTIFY_CLIENT_ID`: application client ID (required)
//! - `SPOTIFY_CLIENT_SECRET`: application client secret (required)

mod client;
mod error;
mod models;

pub use client::{SpotifyAuthenticator, SpotifyClient, MAX_TOP_TRACKS, MAX_TRACKS_PER_REQUEST};
pub use error::{SpotifyError, SpotifyResult};
pub use models::{Artist, Playlist, TimeRange, Track};
