use anyhow::Result;
use chrono::Utc;

use furlough_core::config::{AppConfig, LoadOptions};
use furlough_core::planning::planning_year_for;
use furlough_service::{bootstrap_with_config, telemetry};

/// Cron entry point: one escalation sweep plus a planning-window stage
/// refresh, then exit. Scheduling cadence lives in the crontab, not here.
#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    telemetry::init_logging(&config);

    run(config).await
}

async fn run(config: AppConfig) -> Result<()> {
    let app = bootstrap_with_config(config).await?;

    let escalation_config = app.escalation.get_escalation_config().await?;
    let now_local = Utc::now().with_timezone(&escalation_config.company_offset());
    let window_year = planning_year_for(now_local);
    let window = app.planning.current_window(window_year).await?;
    tracing::info!(
        event_name = "sweeper.window_refreshed",
        year = window.year,
        stage = %window.stage,
        "planning window stage refreshed"
    );

    let summary = app.escalation.check_and_escalate_pending_approvals().await?;
    tracing::info!(
        event_name = "sweeper.run_complete",
        scanned = summary.scanned,
        escalated = summary.escalated,
        auto_approved = summary.auto_approved,
        skipped = summary.skipped,
        "sweep finished"
    );

    Ok(())
}
