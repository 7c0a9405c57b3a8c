use std::env;
use std::fs;
use std::path::Path;

use brainrelay_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key_path: &'static str, env_keys: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { key_path, env_keys, value: value.into() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let signing_secret =
        if config.slack.signing_secret.is_some() { "<redacted>" } else { "<unset>" };
    let api_key = if config.quivr.api_key.expose_secret().trim().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    };

    vec![
        Field::new("database.url", &["BRAINRELAY_DATABASE_URL"], config.database.url.clone()),
        Field::new(
            "database.max_connections",
            &["BRAINRELAY_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        Field::new(
            "database.timeout_secs",
            &["BRAINRELAY_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        Field::new(
            "slack.bot_token",
            &["BRAINRELAY_SLACK_BOT_TOKEN"],
            redact_token(config.slack.bot_token.expose_secret()),
        ),
        Field::new("slack.signing_secret", &["BRAINRELAY_SLACK_SIGNING_SECRET"], signing_secret),
        Field::new(
            "slack.api_base_url",
            &["BRAINRELAY_SLACK_API_BASE_URL"],
            config.slack.api_base_url.clone(),
        ),
        Field::new("quivr.base_url", &["BRAINRELAY_QUIVR_BASE_URL"], config.quivr.base_url.clone()),
        Field::new("quivr.api_key", &["BRAINRELAY_QUIVR_API_KEY"], api_key),
        Field::new(
            "quivr.timeout_secs",
            &["BRAINRELAY_QUIVR_TIMEOUT_SECS"],
            config.quivr.timeout_secs.to_string(),
        ),
        Field::new(
            "quivr.chat_name",
            &["BRAINRELAY_QUIVR_CHAT_NAME"],
            config.quivr.chat_name.clone(),
        ),
        Field::new(
            "server.bind_address",
            &["BRAINRELAY_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        Field::new("server.port", &["BRAINRELAY_SERVER_PORT"], config.server.port.to_string()),
        Field::new(
            "server.graceful_shutdown_secs",
            &["BRAINRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        Field::new(
            "logging.level",
            &["BRAINRELAY_LOGGING_LEVEL", "BRAINRELAY_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        Field::new(
            "logging.format",
            &["BRAINRELAY_LOGGING_FORMAT", "BRAINRELAY_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
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

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
