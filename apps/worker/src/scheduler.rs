//! Playlist scheduler loop
//!
//! A single long-lived task that waits on three sources:
//! - cancellation, checked first on every iteration
//! - a periodic tick that starts a monthly batch when the calendar month
//!   changes
//! - one-off requests arriving from [`PlaylistTrigger`](crate::PlaylistTrigger)
//!
//! Work started by one source finishes before the next source is polled,
//! so a tick and a one-off build never overlap. Inside a batch, up to
//! `max_concurrent_jobs` subscribers are built at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, Period};
use crate::error::WorkerError;
use crate::jobs::{PlaylistBuilder, PlaylistMode};
use crate::store::{subscriber_key, user_id_from_key, SubscriberLookup, SubscriberStore, DEFAULT_KEY_PREFIX};

/// What happened to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// A playlist was created
    Created,
    /// Nothing to do (not subscribed, or already built this month)
    Skipped,
    /// The record could not be read or the build failed
    Failed,
}

/// Counts for one monthly batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(mut self, outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Created => self.created += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Failed => self.failed += 1,
        }
        self
    }

    /// Number of subscriber keys the batch visited
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }
}

/// Drives monthly and one-off playlist builds
pub struct PlaylistScheduler {
    store: Arc<dyn SubscriberStore>,
    builder: PlaylistBuilder,
    clock: Arc<dyn Clock>,
    key_prefix: String,
    tick_interval: Duration,
    max_concurrent_jobs: usize,
    last_processed: Period,
}

impl PlaylistScheduler {
    /// Create a scheduler
    ///
    /// The current month counts as already processed, so the first batch
    /// runs at the next month boundary.
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        builder: PlaylistBuilder,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        let last_processed = Period::containing(clock.now());
        Self {
            store,
            builder,
            clock,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            tick_interval,
            max_concurrent_jobs: 1,
            last_processed,
        }
    }

    /// Set the store key prefix one-off requests are resolved under
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Set how many subscribers a batch builds at once (minimum 1)
    pub fn with_max_concurrent_jobs(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs.max(1);
        self
    }

    /// Month of the last batch that got past enumeration
    pub fn last_processed(&self) -> Period {
        self.last_processed
    }

    /// Run until `cancel` fires
    ///
    /// If every [`PlaylistTrigger`](crate::PlaylistTrigger) is dropped the
    /// loop keeps serving ticks.
    pub async fn run(mut self, cancel: CancellationToken, mut triggers: mpsc::Receiver<String>) {
        let mut ticker = time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut triggers_open = true;

        tracing::info!(
            tick_interval = ?self.tick_interval,
            max_concurrent_jobs = self.max_concurrent_jobs,
            current_period = %self.last_processed,
            "Playlist scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Playlist scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.on_tick().await;
                }
                trigger = triggers.recv(), if triggers_open => {
                    match trigger {
                        Some(user_id) => {
                            self.handle_trigger(&user_id).await;
                        }
                        None => {
                            tracing::debug!("Trigger channel closed, serving ticks only");
                            triggers_open = false;
                        }
                    }
                }
            }
        }

        tracing::info!("Playlist scheduler stopped");
    }

    /// Handle one periodic tick
    ///
    /// Returns the batch summary when a new month started a batch. If
    /// enumeration fails the month is left unprocessed and the next tick
    /// tries again.
    pub async fn on_tick(&mut self) -> Option<BatchSummary> {
        let now = self.clock.now();
        let current = Period::containing(now);
        if current == self.last_processed {
            return None;
        }

        tracing::info!(
            previous = %self.last_processed,
            current = %current,
            "New month, starting playlist batch"
        );

        let keys = match self.store.list_subscriber_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                e.log();
                tracing::warn!(period = %current, "Subscriber enumeration failed, retrying next tick");
                return None;
            }
        };

        self.last_processed = current;
        let summary = self.run_batch(keys, now).await;

        tracing::info!(
            period = %current,
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "Playlist batch completed"
        );

        Some(summary)
    }

    async fn run_batch(&self, keys: Vec<String>, now: DateTime<Utc>) -> BatchSummary {
        stream::iter(keys)
            .map(|key| self.process_monthly(key, now))
            .buffer_unordered(self.max_concurrent_jobs)
            .fold(BatchSummary::default(), |summary, outcome| async move {
                summary.record(outcome)
            })
            .await
    }

    async fn process_monthly(&self, key: String, now: DateTime<Utc>) -> JobOutcome {
        let user_id = user_id_from_key(&key);
        let target = Period::containing(now).previous();

        let subscriber = match self.store.load_subscriber(&key).await {
            Ok(SubscriberLookup::Eligible(subscriber)) => subscriber,
            Ok(SubscriberLookup::NotEligible) => {
                tracing::debug!(user_id = %user_id, "Not subscribed, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                report_failure(user_id, &e);
                return JobOutcome::Failed;
            }
        };

        if subscriber.last_period == Some(target) {
            tracing::debug!(user_id = %user_id, period = %target, "Playlist already built, skipping");
            return JobOutcome::Skipped;
        }

        match self.builder.build(&subscriber, PlaylistMode::Monthly, now).await {
            Ok(_) => {
                if let Err(e) = self.store.mark_processed(&key, target).await {
                    tracing::warn!(
                        user_id = %user_id,
                        period = %target,
                        error = %e,
                        "Failed to record processed period"
                    );
                }
                JobOutcome::Created
            }
            Err(e) => {
                report_failure(user_id, &e);
                JobOutcome::Failed
            }
        }
    }

    /// Build a one-off playlist for `user_id`
    ///
    /// The request layer has already checked the user; the record is only
    /// read for the song count, visibility and refresh token. The period
    /// marker is neither checked nor written.
    pub async fn handle_trigger(&self, user_id: &str) -> JobOutcome {
        let key = subscriber_key(&self.key_prefix, user_id);
        let now = self.clock.now();

        let subscriber = match self.store.load_subscriber(&key).await {
            Ok(SubscriberLookup::Eligible(subscriber)) => subscriber,
            Ok(SubscriberLookup::NotEligible) => {
                tracing::warn!(user_id = %user_id, "One-off request for user with no song count, dropping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                report_failure(user_id, &e);
                return JobOutcome::Failed;
            }
        };

        match self.builder.build(&subscriber, PlaylistMode::OneOff, now).await {
            Ok(_) => JobOutcome::Created,
            Err(e) => {
                report_failure(user_id, &e);
                JobOutcome::Failed
            }
        }
    }
}

fn report_failure(user_id: &str, err: &WorkerError) {
    if let WorkerError::Build {
        playlist_id: Some(playlist_id),
        ..
    } = err
    {
        tracing::warn!(user_id = %user_id, playlist_id = %playlist_id, "Empty playlist left behind");
    }

    tracing::error_span!("subscriber", user_id = %user_id).in_scope(|| err.log());
}
