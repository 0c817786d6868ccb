use chrono::Utc;
use secrecy::SecretString;

use timetabler_core::credentials::authenticate;
use timetabler_core::domain::user::Role;
use timetabler_db::migrations::run_pending;
use timetabler_db::{connect_with_settings, DemoAccounts, SqlUserRepository, UserRepository};

type ContractResult<T = ()> = Result<T, String>;

#[tokio::test]
async fn demo_accounts_sign_in_with_documented_credentials() -> ContractResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;

    let users = SqlUserRepository::new(pool.clone());
    let report = DemoAccounts::provision(&users, Utc::now()).await;
    if report.failed() != 0 {
        return Err(format!("provisioning reported failures:\n{}", report.render()));
    }

    let expected = [
        ("admin", "admin123", Role::Admin, None),
        ("depthead", "dept123", Role::DeptHead, Some("Engineering")),
        ("scheduler", "schedule123", Role::Scheduler, Some("Marketing")),
    ];
    for (username, password, role, department) in expected {
        let account = users
            .find_by_username(username)
            .await
            .map_err(|error| format!("lookup {username}: {error}"))?;
        let identity =
            authenticate(account.as_ref(), &SecretString::from(password.to_string()))
                .map_err(|error| format!("{username} should sign in: {error}"))?;
        if identity.role != role {
            return Err(format!("{username} has role {} not {role}", identity.role));
        }
        if identity.department.as_deref() != department {
            return Err(format!("{username} has unexpected department {:?}", identity.department));
        }
    }

    let rerun = DemoAccounts::provision(&users, Utc::now()).await;
    if rerun.created() != 0 {
        return Err("second provisioning pass should not create accounts".to_string());
    }

    pool.close().await;
    Ok(())
}
