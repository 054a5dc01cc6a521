//! Top-songs playlist creation job
//!
//! Builds one user's snapshot playlist: fetch their top tracks over roughly
//! the last four weeks, name the playlist after the month (or day) it
//! covers, create it, then fill it in rank order.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use spotshot_spotify_client::TimeRange;

use crate::clock::Period;
use crate::error::{BuildStep, WorkerError, WorkerResult};
use crate::music::MusicClientFactory;
use crate::store::Subscriber;

/// Ranking window for top tracks (about four weeks)
pub const TOP_TRACKS_RANGE: TimeRange = TimeRange::ShortTerm;

/// Why a playlist is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistMode {
    /// Month-boundary batch; named for the month that just ended
    Monthly,
    /// On-demand request; named for today
    OneOff,
}

impl fmt::Display for PlaylistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Monthly => "monthly",
            Self::OneOff => "one-off",
        })
    }
}

/// A playlist as created on the music service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    /// Track IDs in the order they were added
    pub track_ids: Vec<String>,
}

/// Playlist name for a build running at `now`
///
/// Monthly playlists read like "Your Top Songs Aug 19"; one-off playlists
/// like "Your Monthly Top Songs Sep 14 2019".
pub fn playlist_name(mode: PlaylistMode, now: DateTime<Utc>) -> String {
    match mode {
        PlaylistMode::Monthly => {
            let target = Period::containing(now).previous();
            format!(
                "Your Top Songs {} {:02}",
                target.month_abbrev(),
                target.year.rem_euclid(100)
            )
        }
        PlaylistMode::OneOff => {
            let current = Period::containing(now);
            format!(
                "Your Monthly Top Songs {} {} {}",
                current.month_abbrev(),
                now.day(),
                now.year()
            )
        }
    }
}

/// Playlist description for a build running at `now`
pub fn playlist_description(mode: PlaylistMode, now: DateTime<Utc>, signature: &str) -> String {
    match mode {
        PlaylistMode::Monthly => {
            let target = Period::containing(now).previous();
            format!(
                "Your top songs in {} {}, made by {}",
                target.month_name(),
                target.year,
                signature
            )
        }
        PlaylistMode::OneOff => {
            let current = Period::containing(now);
            format!(
                "Your top songs in the past month before {} {} {}, made by {}",
                current.month_name(),
                now.day(),
                now.year(),
                signature
            )
        }
    }
}

/// Runs playlist builds against the music service
#[derive(Clone)]
pub struct PlaylistBuilder {
    factory: Arc<dyn MusicClientFactory>,
    signature: String,
}

impl PlaylistBuilder {
    /// Create a builder; `signature` is appended to every description
    pub fn new(factory: Arc<dyn MusicClientFactory>, signature: impl Into<String>) -> Self {
        Self {
            factory,
            signature: signature.into(),
        }
    }

    /// Build one playlist for `subscriber`
    ///
    /// Nothing is retried. If adding tracks fails the playlist created just
    /// before stays behind empty, and its ID is carried on the error.
    pub async fn build(
        &self,
        subscriber: &Subscriber,
        mode: PlaylistMode,
        now: DateTime<Utc>,
    ) -> WorkerResult<PlaylistResult> {
        let user_id = subscriber.user_id.as_str();
        tracing::debug!(user_id = %user_id, mode = %mode, "Building playlist");

        let client = self
            .factory
            .client_for(&subscriber.refresh_token)
            .map_err(|e| WorkerError::build(user_id, BuildStep::MintClient, e))?;

        let track_ids = client
            .fetch_top_tracks(subscriber.song_count, TOP_TRACKS_RANGE)
            .await
            .map_err(|e| WorkerError::build(user_id, BuildStep::FetchTopTracks, e))?;

        let name = playlist_name(mode, now);
        let description = playlist_description(mode, now, &self.signature);
        let public = !subscriber.is_private;

        let playlist_id = client
            .create_playlist(user_id, &name, &description, public)
            .await
            .map_err(|e| WorkerError::build(user_id, BuildStep::CreatePlaylist, e))?;

        // Spotify rejects an empty add; a user with no listening history
        // simply gets an empty playlist.
        if !track_ids.is_empty() {
            client
                .add_tracks(&playlist_id, &track_ids)
                .await
                .map_err(|source| WorkerError::Build {
                    user_id: user_id.to_string(),
                    step: BuildStep::AddTracks,
                    playlist_id: Some(playlist_id.clone()),
                    source,
                })?;
        }

        tracing::info!(
            user_id = %user_id,
            mode = %mode,
            playlist_id = %playlist_id,
            track_count = track_ids.len(),
            "Created playlist"
        );

        Ok(PlaylistResult {
            id: playlist_id,
            name,
            description,
            public,
            track_ids,
        })
    }
}
