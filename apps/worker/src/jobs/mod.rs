//! Background job definitions and handlers
//!
//! This module contains the work the scheduler drives:
//! - Top-songs playlist creation (monthly batches and one-off requests)

pub mod playlist;

pub use playlist::{
    playlist_description, playlist_name, PlaylistBuilder, PlaylistMode, PlaylistResult,
    TOP_TRACKS_RANGE,
};
