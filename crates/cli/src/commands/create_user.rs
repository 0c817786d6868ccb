use chrono::Utc;
use secrecy::SecretString;
use timetabler_core::credentials::hash_password;
use timetabler_core::domain::user::{NewUser, Role, User};
use timetabler_db::{RepositoryError, SqlUserRepository, UserRepository};

use crate::commands::{open_migrated, prepare, CommandResult, StepError};
use crate::CreateUserArgs;

pub fn run(args: CreateUserArgs) -> CommandResult {
    let new_user = match validate(args) {
        Ok(new_user) => new_user,
        Err(failure) => return failure,
    };

    let (config, runtime) = match prepare("create-user") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        let inserted = SqlUserRepository::new(pool.clone()).insert(new_user).await;
        pool.close().await;
        let user = inserted.map_err(|error| match error {
            RepositoryError::Conflict(message) => ("conflict", message, 7u8),
            other => ("persistence", other.to_string(), 5u8),
        })?;
        Ok::<User, StepError>(user)
    });

    match result {
        Ok(user) => CommandResult::success(
            "create-user",
            format!("created {} ({}) with id {}", user.username, user.role_tag, user.id),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("create-user", error_class, message, exit_code)
        }
    }
}

/// Check the arguments and hash the password before touching the database.
fn validate(args: CreateUserArgs) -> Result<NewUser, CommandResult> {
    let invalid = |error_class: &str, message: String| {
        CommandResult::failure("create-user", error_class, message, 2)
    };

    let username = args.username.trim().to_string();
    if username.is_empty() {
        return Err(invalid("invalid_input", "username must not be empty".to_string()));
    }
    if args.password.is_empty() {
        return Err(invalid("invalid_input", "password must not be empty".to_string()));
    }

    let role = args.role.trim().parse::<Role>().map_err(|_| {
        invalid(
            "invalid_role",
            format!("unknown role `{}`; expected Admin, Dept_Head or Scheduler", args.role),
        )
    })?;

    let password_hash = hash_password(&SecretString::from(args.password))
        .map_err(|error| CommandResult::failure("create-user", "hashing", error.to_string(), 3))?;

    let department = args
        .department
        .map(|department| department.trim().to_string())
        .filter(|department| !department.is_empty());

    Ok(NewUser { username, password_hash, role, department, created_at: Utc::now() })
}

#[cfg(test)]
mod tests {
    use timetabler_core::domain::user::Role;

    use super::validate;
    use crate::CreateUserArgs;

    fn args(role: &str, department: Option<&str>) -> CreateUserArgs {
        CreateUserArgs {
            username: "  alice ".to_string(),
            password: "pw".to_string(),
            role: role.to_string(),
            department: department.map(str::to_string),
        }
    }

    #[test]
    fn valid_arguments_become_a_hashed_account() {
        let user = validate(args("Dept_Head", Some(" Physics "))).expect("valid");
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::DeptHead);
        assert_eq!(user.department.as_deref(), Some("Physics"));
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn blank_department_is_unassigned() {
        let user = validate(args("Scheduler", Some("  "))).expect("valid");
        assert_eq!(user.department, None);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let failure = validate(args("Guest", None)).err().expect("invalid role");
        assert_eq!(failure.exit_code, 2);
        assert!(failure.output.contains("invalid_role"));
        assert!(failure.output.contains("Guest"));
    }

    #[test]
    fn empty_password_is_rejected() {
        let mut input = args("Admin", None);
        input.password.clear();
        let failure = validate(input).err().expect("invalid input");
        assert!(failure.output.contains("invalid_input"));
    }
}
