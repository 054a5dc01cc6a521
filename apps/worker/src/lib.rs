//! Spotshot playlist worker
//!
//! Builds top-songs playlists on Spotify for every subscriber once a month,
//! and for single users on request.

pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod music;
pub mod scheduler;
pub mod store;
pub mod trigger;

pub use clock::{Clock, Period, SystemClock};
pub use config::Config;
pub use error::{BuildStep, ErrorSeverity, TriggerError, WorkerError, WorkerResult};
pub use jobs::{PlaylistBuilder, PlaylistMode, PlaylistResult};
pub use music::{MusicClient, MusicClientFactory};
pub use scheduler::{BatchSummary, JobOutcome, PlaylistScheduler};
pub use store::{HashStore, RedisSubscriberStore, Subscriber, SubscriberLookup, SubscriberStore};
pub use trigger::{trigger_channel, PlaylistTrigger};
