use hireflow_core::audit::{AuditEvent, AuditSink};
use hireflow_core::config::{AppConfig, ConfigError};
use hireflow_core::ledger::BudgetLedger;
use hireflow_db::{connect_with_settings, migrations, DbPool, HiringService};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: HiringService,
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

/// Writes audit events to the tracing pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = "audit.event",
            correlation_id = %event.correlation_id,
            request_id = event.request_id.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
            actor_id = %event.actor,
            audit_event_id = %event.event_id,
            audit_event_type = %event.event_type,
            category = ?event.category,
            outcome = ?event.outcome,
            metadata = ?event.metadata,
            "audit event recorded"
        );
    }
}

/// Configs built in code skip `AppConfig::load`, so validation runs again here.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    config.validate()?;
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
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
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = HiringService::sqlite(db_pool.clone(), BudgetLedger::new(config.ledger.debit_rate))
        .with_audit_sink(Arc::new(LogAuditSink));

    Ok(Application { config, db_pool, service })
}
