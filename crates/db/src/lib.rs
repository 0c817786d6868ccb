pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoAccount, DemoAccounts, ProvisionOutcome, ProvisionReport};
pub use repositories::{
    InMemoryPortalRepository, RepositoryError, SessionRepository, SqlSessionRepository,
    SqlTimetableRepository, SqlUserRepository, StatusCounts, TimetableRepository, UserRepository,
};
