use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use timetabler_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
}

fn render(config: &AppConfig, doc: Option<&Value>, path: Option<&Path>) -> String {
    let fields: [(&str, &[&str], String); 12] = [
        ("database.url", &["TIMETABLER_DATABASE_URL"], redact_url(&config.database.url)),
        (
            "database.max_connections",
            &["TIMETABLER_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            &["TIMETABLER_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        (
            "server.bind_address",
            &["TIMETABLER_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        ("server.port", &["TIMETABLER_SERVER_PORT"], config.server.port.to_string()),
        (
            "server.graceful_shutdown_secs",
            &["TIMETABLER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        (
            "session.cookie_name",
            &["TIMETABLER_SESSION_COOKIE_NAME"],
            config.session.cookie_name.clone(),
        ),
        (
            "session.ttl_hours",
            &["TIMETABLER_SESSION_TTL_HOURS"],
            config.session.ttl_hours.to_string(),
        ),
        (
            "session.secure_cookie",
            &["TIMETABLER_SESSION_SECURE_COOKIE"],
            config.session.secure_cookie.to_string(),
        ),
        ("authoring.url", &["TIMETABLER_AUTHORING_URL"], config.authoring.url.clone()),
        (
            "logging.level",
            &["TIMETABLER_LOGGING_LEVEL", "TIMETABLER_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["TIMETABLER_LOGGING_FORMAT", "TIMETABLER_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, env_keys, value) in fields {
        lines.push(render_line(key, &value, field_source(key, env_keys, doc, path)));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["timetabler.toml", "config/timetabler.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Hide `user:password@` credentials embedded in a database URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((_, host)) => format!("{scheme}://<redacted>@{host}"),
        None => url.to_string(),
    }
}
