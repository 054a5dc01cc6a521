//! Spotify API request and response models

use serde::{Deserialize, Serialize};

/// Ranking window for the current user's top items
///
/// Spotify approximates `short_term` as the last 4 weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    /// Query-string value understood by the Web API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::MediumTerm => "medium_term",
            Self::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A track from the Spotify catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Spotify track ID
    pub id: String,
    /// Track title
    pub name: String,
    /// Spotify URI (`spotify:track:{id}`)
    pub uri: String,
    /// Credited artists
    #[serde(default)]
    pub artists: Vec<Artist>,
}

/// Simplified artist attached to a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// A playlist owned by a Spotify user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// Spotify playlist ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Description (Spotify returns null for an empty description)
    #[serde(default)]
    pub description: Option<String>,
    /// Visibility on the user's profile
    #[serde(default)]
    pub public: Option<bool>,
    /// Spotify URI (`spotify:playlist:{id}`)
    #[serde(default)]
    pub uri: Option<String>,
}

/// Build the catalog URI for a track ID
pub(crate) fn track_uri(track_id: &str) -> String {
    if track_id.starts_with("spotify:track:") {
        track_id.to_string()
    } else {
        format!("spotify:track:{}", track_id)
    }
}

// Internal wire types

#[derive(Debug, Deserialize)]
pub(crate) struct TopTracksResponse {
    pub items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[allow(dead_code)] // Mirrors the HTTP status, which we already have
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddTracksRequest {
    pub uris: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_query_values() {
        assert_eq!(TimeRange::ShortTerm.as_str(), "short_term");
        assert_eq!(TimeRange::MediumTerm.as_str(), "medium_term");
        assert_eq!(TimeRange::LongTerm.to_string(), "long_term");
        assert_eq!(TimeRange::default(), TimeRange::ShortTerm);
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("abc"), "spotify:track:abc");
        assert_eq!(track_uri("spotify:track:abc"), "spotify:track:abc");
    }

    #[test]
    fn test_playlist_null_description() {
        let playlist: Playlist = serde_json::from_str(
            r#"{"id":"p1","name":"Mix","description":null,"public":false}"#,
        )
        .unwrap();
        assert!(playlist.description.is_none());
        assert_eq!(playlist.public, Some(false));
    }

    #[test]
    fn test_top_tracks_preserve_order() {
        let response: TopTracksResponse = serde_json::from_str(
            r#"{"items":[
                {"id":"b","name":"Second","uri":"spotify:track:b"},
                {"id":"a","name":"First","uri":"spotify:track:a","artists":[{"id":"x","name":"X"}]}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<_> = response.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(response.items[1].artists[0].name, "X");
    }
}
