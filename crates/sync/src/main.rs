//! Slabworks Sync - background inventory sync worker.
//!
//! Drains the durable sync queue against Shopify and periodically heals the
//! local inventory-level cache mirror. All interactive write paths (intake,
//! transfers, sold-event webhooks) use this crate as a library; the worker
//! only runs the background halves.
//!
//! # Security
//!
//! **CRITICAL: This binary holds the HIGH PRIVILEGE Shopify Admin API
//! access token.** Run it only on trusted infrastructure.
//!
//! # Architecture
//!
//! - Single sequential drain loop (no intra-queue parallelism, by design:
//!   one shared rate limiter, no same-item write races)
//! - `PostgreSQL` for the queue, dead letters, audit log, and cache mirror
//! - Sentry + tracing for error tracking and structured logs

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Instant;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slabworks_sync::config::SyncConfig;
use slabworks_sync::inventory::{CacheHealer, InventoryWriteGateway};
use slabworks_sync::listings::HttpListingClient;
use slabworks_sync::queue::QueueProcessor;
use slabworks_sync::shopify::ShopifyClient;
use slabworks_sync::db;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let config = SyncConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "slabworks_sync=info".into());

    // Use JSON format on Fly.io for structured log parsing, text format locally
    let is_fly = std::env::var("FLY_APP_NAME").is_ok();
    let json_layer = is_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p slabworks-cli -- migrate

    // One client, one rate-limiter bucket, shared by every path.
    let shopify = ShopifyClient::new(&config.shopify, config.rate_limit);
    let listings = HttpListingClient::new(&config.listings);
    let gateway = InventoryWriteGateway::new(shopify.clone(), pool.clone());
    let processor = QueueProcessor::new(
        gateway,
        shopify.clone(),
        listings,
        config.queue,
    );
    let healer = CacheHealer::new(shopify, pool, config.cache_heal_batch_size);

    tracing::info!(
        store = %config.shopify.store,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Sync worker started"
    );

    let mut last_heal = Instant::now();
    let mut poll = tokio::time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, stopping after current batch");
                break;
            }
            _ = poll.tick() => {
                match processor.process_batch().await {
                    Ok(summary) if summary.processed > 0 => {
                        tracing::info!(
                            completed = summary.completed,
                            requeued = summary.requeued,
                            dead_lettered = summary.dead_lettered,
                            "Drain pass finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Drain pass failed"),
                }

                let heal_due = !config.cache_heal_interval.is_zero()
                    && last_heal.elapsed() >= config.cache_heal_interval;
                if heal_due {
                    last_heal = Instant::now();
                    if let Err(e) = healer.heal_once(&config.store_key).await {
                        tracing::error!(error = %e, "Cache healing pass failed");
                    }
                }
            }
        }
    }
}
