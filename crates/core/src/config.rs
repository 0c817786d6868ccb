//! Portal configuration.
//!
//! Values are layered: built-in defaults, then `timetabler.toml` (or
//! `config/timetabler.toml`) with `${VAR}` placeholders expanded, then
//! `TIMETABLER_*` environment variables, then programmatic overrides. The
//! merged result is validated before it is returned.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SEARCH_PATHS: [&str; 2] = ["timetabler.toml", "config/timetabler.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub authoring: AuthoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_hours: u32,
    pub secure_cookie: bool,
}

/// Where schedulers are sent to author timetable content.
#[derive(Clone, Debug)]
pub struct AuthoringConfig {
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        [Self::Compact, Self::Pretty, Self::Json]
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "logging.format `{value}` is not one of compact|pretty|json"
                ))
            })
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

/// Values set by the embedding program; these beat every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub authoring_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file `{path}` is missing")]
    FileNotFound { path: PathBuf },
    #[error("reading config file `{path}` failed: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("config file `{path}` is not valid TOML: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
    #[error("placeholder `${{{name}}}` refers to an unset environment variable")]
    UnsetVariable { name: String },
    #[error("placeholder starting at byte {offset} is missing its closing brace")]
    UnclosedPlaceholder { offset: usize },
    #[error("environment variable `{key}` has unusable value `{value}`")]
    BadEnvValue { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://timetabler.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            session: SessionConfig {
                cookie_name: "timetabler_session".to_string(),
                ttl_hours: 12,
                secure_cookie: false,
            },
            authoring: AuthoringConfig { url: "http://localhost:5173/".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match locate_file(options.config_path.as_deref()) {
            Some(path) => config.merge_file(FileLayer::read(&path)?),
            None if options.require_file => {
                let path = options.config_path.unwrap_or_else(|| PathBuf::from(SEARCH_PATHS[0]));
                return Err(ConfigError::FileNotFound { path });
            }
            None => {}
        }

        config.merge_env()?;
        config.merge_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn merge_file(&mut self, layer: FileLayer) {
        let FileLayer { database, server, session, authoring, logging } = layer;

        let database = database.unwrap_or_default();
        set(&mut self.database.url, database.url);
        set(&mut self.database.max_connections, database.max_connections);
        set(&mut self.database.timeout_secs, database.timeout_secs);

        let server = server.unwrap_or_default();
        set(&mut self.server.bind_address, server.bind_address);
        set(&mut self.server.port, server.port);
        set(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);

        let session = session.unwrap_or_default();
        set(&mut self.session.cookie_name, session.cookie_name);
        set(&mut self.session.ttl_hours, session.ttl_hours);
        set(&mut self.session.secure_cookie, session.secure_cookie);

        set(&mut self.authoring.url, authoring.unwrap_or_default().url);

        let logging = logging.unwrap_or_default();
        set(&mut self.logging.level, logging.level);
        set(&mut self.logging.format, logging.format);
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        set(&mut self.database.url, env_value(&["TIMETABLER_DATABASE_URL"])?);
        set(
            &mut self.database.max_connections,
            env_value(&["TIMETABLER_DATABASE_MAX_CONNECTIONS"])?,
        );
        set(&mut self.database.timeout_secs, env_value(&["TIMETABLER_DATABASE_TIMEOUT_SECS"])?);

        set(&mut self.server.bind_address, env_value(&["TIMETABLER_SERVER_BIND_ADDRESS"])?);
        set(&mut self.server.port, env_value(&["TIMETABLER_SERVER_PORT"])?);
        set(
            &mut self.server.graceful_shutdown_secs,
            env_value(&["TIMETABLER_SERVER_GRACEFUL_SHUTDOWN_SECS"])?,
        );

        set(&mut self.session.cookie_name, env_value(&["TIMETABLER_SESSION_COOKIE_NAME"])?);
        set(&mut self.session.ttl_hours, env_value(&["TIMETABLER_SESSION_TTL_HOURS"])?);
        set(&mut self.session.secure_cookie, env_value(&["TIMETABLER_SESSION_SECURE_COOKIE"])?);

        set(&mut self.authoring.url, env_value(&["TIMETABLER_AUTHORING_URL"])?);

        set(
            &mut self.logging.level,
            env_value(&["TIMETABLER_LOGGING_LEVEL", "TIMETABLER_LOG_LEVEL"])?,
        );
        set(
            &mut self.logging.format,
            env_value(&["TIMETABLER_LOGGING_FORMAT", "TIMETABLER_LOG_FORMAT"])?,
        );
        Ok(())
    }

    fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        set(&mut self.database.url, overrides.database_url);
        set(&mut self.logging.level, overrides.log_level);
        set(&mut self.server.port, overrides.server_port);
        set(&mut self.authoring.url, overrides.authoring_url);
    }

    /// Reject the first setting that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        let cookie = self.session.cookie_name.trim();
        let authoring = self.authoring.url.trim();

        let rules: [(bool, &str); 10] = [
            (
                url.starts_with("sqlite:") || url == ":memory:",
                "database.url must be a sqlite URL (`sqlite://...` or `sqlite::memory:`)",
            ),
            (self.database.max_connections > 0, "database.max_connections must be at least 1"),
            (
                (1..=300).contains(&self.database.timeout_secs),
                "database.timeout_secs must be between 1 and 300",
            ),
            (!self.server.bind_address.trim().is_empty(), "server.bind_address is empty"),
            (self.server.port > 0, "server.port must be non-zero"),
            (
                self.server.graceful_shutdown_secs > 0,
                "server.graceful_shutdown_secs must be non-zero",
            ),
            (
                !cookie.is_empty()
                    && cookie.chars().all(|ch| ch.is_ascii_alphanumeric() || "_-".contains(ch)),
                "session.cookie_name may only use [A-Za-z0-9_-] and must not be empty",
            ),
            (
                (1..=24 * 30).contains(&self.session.ttl_hours),
                "session.ttl_hours must be between 1 and 720",
            ),
            (
                authoring.starts_with("http://") || authoring.starts_with("https://"),
                "authoring.url must be an http:// or https:// URL",
            ),
            (
                matches!(
                    self.logging.level.trim().to_ascii_lowercase().as_str(),
                    "trace" | "debug" | "info" | "warn" | "error"
                ),
                "logging.level must be trace, debug, info, warn or error",
            ),
        ];

        match rules.into_iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(ConfigError::Invalid(message.to_string())),
            None => Ok(()),
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.is_file().then(|| path.to_path_buf()),
        None => SEARCH_PATHS.iter().map(PathBuf::from).find(|path| path.is_file()),
    }
}

/// First non-blank variable among `keys`, parsed as `T`. Earlier keys win.
fn env_value<T: FromStr>(keys: &[&str]) -> Result<Option<T>, ConfigError> {
    let found = keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    });

    match found {
        None => Ok(None),
        Some((key, value)) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::BadEnvValue { key: key.to_string(), value }),
    }
}

/// Replace every `${NAME}` with the value of environment variable `NAME`.
fn expand_placeholders(input: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;
    let mut consumed = 0;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find('}')
            .ok_or(ConfigError::UnclosedPlaceholder { offset: consumed + start })?;

        let name = &after_open[..end];
        let value = env::var(name)
            .map_err(|_| ConfigError::UnsetVariable { name: name.to_string() })?;
        expanded.push_str(&value);

        let advance = start + 2 + end + 1;
        consumed += advance;
        rest = &rest[advance..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

/// Shape of the TOML file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLayer {
    database: Option<DatabaseLayer>,
    server: Option<ServerLayer>,
    session: Option<SessionLayer>,
    authoring: Option<AuthoringLayer>,
    logging: Option<LoggingLayer>,
}

impl FileLayer {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&expand_placeholders(&raw)?)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseLayer {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerLayer {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionLayer {
    cookie_name: Option<String>,
    ttl_hours: Option<u32>,
    secure_cookie: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthoringLayer {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<LogFormat>,
}
