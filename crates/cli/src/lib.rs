pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "timetabler",
    about = "Timetabler operator CLI",
    long_about = concat!(
        "Operate the timetable approval portal: migrations, demo accounts, ",
        "user provisioning, and config inspection."
    ),
    after_help = concat!(
        "Examples:\n",
        "  timetabler migrate\n",
        "  timetabler seed\n",
        "  timetabler create-user --username alice --password s3cret --role Scheduler",
        " --department Physics\n",
        "  timetabler config"
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Provision the demo accounts, skipping any that already exist")]
    Seed,
    #[command(about = "Create a portal account with a hashed password")]
    CreateUser(CreateUserArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long, help = "One of Admin, Dept_Head, Scheduler")]
    pub role: String,
    #[arg(long)]
    pub department: Option<String>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::CreateUser(args) => commands::create_user::run(args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn create_user_arguments_parse() {
        let cli = Cli::try_parse_from([
            "timetabler",
            "create-user",
            "--username",
            "alice",
            "--password",
            "pw",
            "--role",
            "Dept_Head",
            "--department",
            "Physics",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::CreateUser(args) => {
                assert_eq!(args.username, "alice");
                assert_eq!(args.role, "Dept_Head");
                assert_eq!(args.department.as_deref(), Some("Physics"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_user_requires_a_role() {
        let args = ["timetabler", "create-user", "--username", "a", "--password", "b"];
        let parsed = Cli::try_parse_from(args);
        assert!(parsed.is_err());
    }
}
