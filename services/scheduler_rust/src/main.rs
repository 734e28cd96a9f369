use anyhow::{Context, Result};
use dotenv::dotenv;
use miniscore_core::db::{create_pool, schema::apply_schema};
use miniscore_core::{
    EspnClient, EspnPageDecoder, EspnTransport, EventStore, PgEventStore, ScheduleDecoder,
    UpdateCache,
};
use scheduler_rust::active::ActiveSet;
use scheduler_rust::config::Config;
use scheduler_rust::feed::WeeklyEventFeed;
use scheduler_rust::monitor::MonitorContext;
use scheduler_rust::scheduler::EventScheduler;
use scheduler_rust::sync::ScheduleSynchronizer;
use scheduler_rust::updater::GameUpdater;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting scheduler service...");

    let config = Config::from_env().context("Failed to load configuration")?;

    // Database
    let pool = create_pool(&config.database_url, &config.pool).await?;
    if config.apply_schema {
        apply_schema(&pool)
            .await
            .context("Failed to apply database schema")?;
        info!("Database schema applied");
    }
    let store: Arc<dyn EventStore> = Arc::new(
        PgEventStore::new(pool.clone()).with_max_attempts(config.db_max_attempts),
    );

    // ESPN
    let transport: Arc<dyn EspnTransport> = Arc::new(EspnClient::new(config.espn.clone()));
    let decoder: Arc<dyn ScheduleDecoder> =
        Arc::new(EspnPageDecoder::new().context("Failed to build page decoder")?);

    let updater = Arc::new(GameUpdater::new(
        store.clone(),
        transport.clone(),
        decoder.clone(),
        Arc::new(UpdateCache::new()),
    ));
    let active = ActiveSet::new();
    let ctx = Arc::new(MonitorContext {
        transport: transport.clone(),
        decoder: decoder.clone(),
        updater,
        active: active.clone(),
        config: config.monitor.clone(),
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    let (feed_tx, feed_rx) = mpsc::channel(config.feed_queue_size);

    let mut tasks = Vec::new();

    // 1. Schedule sync
    let synchronizer =
        ScheduleSynchronizer::new(store.clone(), transport, decoder, config.sync_interval);
    tasks.push(tokio::spawn(synchronizer.run(stop_rx)));

    // 2. Weekly feed
    tasks.push(tokio::spawn(WeeklyEventFeed::new(store).run(feed_tx)));

    // 3. Scheduler
    tasks.push(tokio::spawn(EventScheduler::new(ctx).run(feed_rx)));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    let _ = stop_tx.send(true);
    for task in &tasks {
        task.abort();
    }
    futures_util::future::join_all(tasks).await;

    let monitored = active.len();
    active.shutdown();
    info!("Stopped {} game monitors", monitored);

    pool.close().await;
    info!("Scheduler service stopped");
    Ok(())
}
