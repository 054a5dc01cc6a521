use std::sync::Arc;

use anyhow::Context;
use spotshot_spotify_client::SpotifyAuthenticator;
use spotshot_worker::{
    trigger_channel, Config, PlaylistBuilder, PlaylistScheduler, RedisSubscriberStore, SystemClock,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotshot_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Spotshot worker");

    let config = Config::from_env()?;
    tracing::info!(
        environment = %config.environment(),
        key_prefix = %config.key_prefix,
        "Configuration loaded"
    );

    let store = RedisSubscriberStore::connect(config.redis(), config.key_prefix.clone())
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Connected to Redis");

    let authenticator = SpotifyAuthenticator::new(config.spotify().clone())
        .context("Failed to create Spotify authenticator")?;
    let builder = PlaylistBuilder::new(Arc::new(authenticator), config.playlist_signature.clone());

    // The request layer shares this process; it takes clones of `_trigger`.
    let (_trigger, triggers) =
        trigger_channel(config.trigger_queue_capacity, config.trigger_send_timeout());

    let scheduler = PlaylistScheduler::new(
        Arc::new(store),
        builder,
        Arc::new(SystemClock),
        config.month_check_interval(),
    )
    .with_key_prefix(config.key_prefix.clone())
    .with_max_concurrent_jobs(config.max_concurrent_jobs);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(cancel.clone(), triggers));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    handle.await.context("Scheduler task panicked")?;

    tracing::info!("Spotshot worker stopped");
    Ok(())
}
