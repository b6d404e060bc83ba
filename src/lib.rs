pub mod auth;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod seed;
pub mod simulation;
pub mod store;
pub mod subscription;
pub mod ticker;

use crate::dashboard::DashboardCore;
use crate::errors::{AppError, AppResult};
use std::path::Path;
use tokio::time::Duration;

const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "password";

/// Headless session: signs the demo user in, emits a JSON dashboard
/// snapshot after every live tick until interrupted, then signs out.
pub async fn run() -> AppResult<()> {
    let settings = config::load_settings()?;
    logging::init_tracing(settings.log_dir.as_deref().map(Path::new)).map_err(AppError::Config)?;

    let core = DashboardCore::demo(settings.clone());
    let user = core.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await?;
    tracing::info!(user_id = %user.id, "demo session started");

    core.refresh().await;
    emit_snapshot(&core).await?;
    println!("{}", serde_json::to_string(&core.data_source_overview().await)?);

    let mut interval = tokio::time::interval(Duration::from_millis(settings.tick_interval_ms));
    interval.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                emit_snapshot(&core).await?;
            }
        }
    }

    core.sign_out().await;
    core.shutdown().await;
    Ok(())
}

async fn emit_snapshot(core: &DashboardCore) -> AppResult<()> {
    let view = core.dashboard().await;
    println!("{}", serde_json::to_string(&view)?);
    Ok(())
}
