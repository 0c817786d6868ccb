use thiserror::Error;
use timetabler_core::config::{AppConfig, ConfigError, LoadOptions};
use timetabler_db::{connect_with_config, migrations, DbPool};
use tracing::info;

use crate::portal::PortalState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub portal: PortalState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("template compilation failed: {0}")]
    Templates(#[from] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connect, migrate and assemble portal state from an already loaded config.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let portal = PortalState::from_pool(db_pool.clone(), &config)?;
    info!(
        event_name = "system.bootstrap.portal_ready",
        authoring_url = %config.authoring.url,
        session_ttl_hours = config.session.ttl_hours,
        "portal state assembled"
    );

    Ok(Application { config, db_pool, portal })
}

#[cfg(test)]
mod tests {
    use timetabler_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(database_url: &str, authoring_url: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                authoring_url: authoring_url.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_authoring_url() {
        let result = bootstrap(options("sqlite::memory:", Some("ftp://authoring"))).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("authoring.url"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_portal_tables() {
        let app = bootstrap(options("sqlite::memory:", Some("https://authoring.test/")))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('users', 'timetables', 'sessions')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("portal tables should exist after bootstrap");
        assert_eq!(table_count, 3);
        assert_eq!(app.config.authoring.url, "https://authoring.test/");

        app.db_pool.close().await;
    }
}
