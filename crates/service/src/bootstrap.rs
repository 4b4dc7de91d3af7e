use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use furlough_core::config::{AppConfig, ConfigError, LoadOptions};
use furlough_db::repositories::{
    SqlApprovalRepository, SqlAuditRepository, SqlBalanceRepository, SqlDelegateRepository,
    SqlDirectoryRepository, SqlHolidayRepository, SqlLeaveRepository, SqlNotificationRepository,
    SqlPlanningRepository, SqlSettingsRepository,
};
use furlough_db::{connect_with_settings, migrations, DbPool};

use crate::balance::BalanceService;
use crate::clock::SystemClock;
use crate::delegation::DelegationService;
use crate::dispatch::EffectDispatcher;
use crate::escalation::EscalationService;
use crate::mailer::{EmailSender, NoopMailer, RelayMailer};
use crate::planning::PlanningService;
use crate::rollover::RolloverService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub balances: BalanceService,
    pub escalation: EscalationService,
    pub planning: PlanningService,
    pub rollover: RolloverService,
    pub delegation: DelegationService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        database_url = config.database.url.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        "database migrations applied"
    );

    let mailer: Arc<dyn EmailSender> = match RelayMailer::from_config(&config.mailer) {
        Some(relay) => Arc::new(relay),
        None => Arc::new(NoopMailer),
    };
    let dispatcher = EffectDispatcher::new(
        Arc::new(SqlNotificationRepository::new(db_pool.clone())),
        mailer,
    );

    let leave = Arc::new(SqlLeaveRepository::new(db_pool.clone()));
    let balances_repo = Arc::new(SqlBalanceRepository::new(db_pool.clone()));
    let audit = Arc::new(SqlAuditRepository::new(db_pool.clone()));
    let directory = Arc::new(SqlDirectoryRepository::new(db_pool.clone()));
    let settings = Arc::new(SqlSettingsRepository::new(db_pool.clone()));
    let clock = Arc::new(SystemClock);

    let balances = BalanceService::new(leave.clone(), balances_repo.clone());
    let escalation = EscalationService::new(
        directory.clone(),
        leave.clone(),
        Arc::new(SqlApprovalRepository::new(db_pool.clone())),
        Arc::new(SqlDelegateRepository::new(db_pool.clone())),
        Arc::new(SqlHolidayRepository::new(db_pool.clone())),
        settings.clone(),
        audit.clone(),
        balances.clone(),
        dispatcher.clone(),
        clock.clone(),
    );
    let planning = PlanningService::new(
        Arc::new(SqlPlanningRepository::new(db_pool.clone())),
        directory.clone(),
        settings.clone(),
        audit.clone(),
        dispatcher.clone(),
        clock,
    );
    let rollover = RolloverService::new(balances_repo, audit.clone());
    let delegation =
        DelegationService::new(Arc::new(SqlDelegateRepository::new(db_pool.clone())), audit);

    Ok(Application { config, db_pool, balances, escalation, planning, rollover, delegation })
}
