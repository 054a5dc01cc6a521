//! Music service seam used by the playlist builder
//!
//! The builder talks to these traits rather than to [`SpotifyClient`]
//! directly, so batches can run against a recording fake in tests.

use async_trait::async_trait;
use spotshot_spotify_client::{
    SpotifyAuthenticator, SpotifyClient, SpotifyResult, TimeRange,
};

/// Operations a playlist build needs from the music service
#[async_trait]
pub trait MusicClient: Send + Sync {
    /// IDs of the user's top tracks, best ranked first
    async fn fetch_top_tracks(&self, limit: u32, range: TimeRange) -> SpotifyResult<Vec<String>>;

    /// Create an empty playlist and return its ID
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> SpotifyResult<String>;

    /// Append tracks in the given order
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> SpotifyResult<()>;
}

/// Mints a [`MusicClient`] acting for the owner of a refresh token
pub trait MusicClientFactory: Send + Sync {
    fn client_for(&self, refresh_token: &str) -> SpotifyResult<Box<dyn MusicClient>>;
}

#[async_trait]
impl MusicClient for SpotifyClient {
    async fn fetch_top_tracks(&self, limit: u32, range: TimeRange) -> SpotifyResult<Vec<String>> {
        let tracks = self.top_tracks(limit, range).await?;
        Ok(tracks.into_iter().map(|t| t.id).collect())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> SpotifyResult<String> {
        let playlist = SpotifyClient::create_playlist(self, user_id, name, description, public).await?;
        Ok(playlist.id)
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> SpotifyResult<()> {
        let snapshot_id = SpotifyClient::add_tracks(self, playlist_id, track_ids).await?;
        tracing::trace!(playlist_id = %playlist_id, snapshot_id = %snapshot_id, "Tracks added");
        Ok(())
    }
}

impl MusicClientFactory for SpotifyAuthenticator {
    fn client_for(&self, refresh_token: &str) -> SpotifyResult<Box<dyn MusicClient>> {
        Ok(Box::new(self.client(refresh_token)?))
    }
}
