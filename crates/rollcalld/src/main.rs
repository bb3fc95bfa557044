use anyhow::{Context, Result};
use rollcall_core::{SimulatedExtractor, WeightedMatcher};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod dbus_interface;
mod engine;

const BUS_NAME: &str = "org.rollcall.Rollcall1";
const OBJECT_PATH: &str = "/org/rollcall/Rollcall1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = config::Config::load()?;
    tracing::info!(
        backend = ?config.backend,
        db = %config.db_path.display(),
        seed_policy = ?config.seed_policy,
        "configuration loaded"
    );

    let store = config.open_store().context("opening identity store")?;
    if store.initialize().context("initializing identity store")? {
        tracing::info!("first run: demo data seeded");
    }

    let engine = engine::spawn_engine(
        Box::new(SimulatedExtractor::new(config.detection_rate)),
        Box::new(WeightedMatcher),
        engine::Latency {
            capture: config.capture_delay(),
            matching: config.match_delay(),
        },
    )?;

    let api = Arc::new(api::Api::new(store, config.location.clone()));
    let service = dbus_interface::RollcallService::new(api, engine);

    let _conn = zbus::connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .context("registering on the session bus")?;

    tracing::info!(bus = BUS_NAME, path = OBJECT_PATH, "rollcalld ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("rollcalld shutting down");

    Ok(())
}
