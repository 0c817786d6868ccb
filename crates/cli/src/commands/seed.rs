use chrono::Utc;
use timetabler_db::{DemoAccounts, ProvisionReport, SqlUserRepository};

use crate::commands::{open_migrated, prepare, CommandResult, StepError};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        let users = SqlUserRepository::new(pool.clone());
        let report = DemoAccounts::provision(&users, Utc::now()).await;
        pool.close().await;
        Ok::<ProvisionReport, StepError>(report)
    });

    match result {
        Ok(report) => summarize(&report),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Any failed account turns the whole run into an error, but the report
/// still lists every account.
fn summarize(report: &ProvisionReport) -> CommandResult {
    let failed = report.failed();
    if failed > 0 {
        return CommandResult::failure(
            "seed",
            "seed_execution",
            format!("{failed} demo account(s) failed:\n{}", report.render()),
            6,
        );
    }

    CommandResult::success(
        "seed",
        format!("demo accounts processed ({} created):\n{}", report.created(), report.render()),
    )
}
