pub mod config;
pub mod create_user;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use timetabler_core::config::{AppConfig, LoadOptions};
use timetabler_db::{connect_with_config, migrations, DbPool};
use tokio::runtime::Runtime;

/// Exit code plus the single JSON line printed for a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Serialize)]
struct Report<'a> {
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    message: &'a str,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::emit(0, Report { command, status: "ok", error_class: None, message: &message })
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let message = message.into();
        let report =
            Report { command, status: "error", error_class: Some(error_class), message: &message };
        Self::emit(exit_code, report)
    }

    fn emit(exit_code: u8, report: Report<'_>) -> Self {
        let output = serde_json::to_string(&report).unwrap_or_else(|_| {
            serde_json::json!({ "command": report.command, "status": "error" }).to_string()
        });
        Self { exit_code, output }
    }
}

/// Failure triple carried out of an async command body.
pub(crate) type StepError = (&'static str, String, u8);

/// Load config and build a single-threaded runtime, or report why not.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

pub(crate) async fn open_migrated(config: &AppConfig) -> Result<DbPool, StepError> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}
