use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quotedesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key: "database.url",
            env_keys: &["QUOTEDESK_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        Field {
            key: "database.max_connections",
            env_keys: &["QUOTEDESK_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        Field {
            key: "database.timeout_secs",
            env_keys: &["QUOTEDESK_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        Field {
            key: "quotes.validity_days",
            env_keys: &["QUOTEDESK_QUOTES_VALIDITY_DAYS"],
            value: config.quotes.validity_days.to_string(),
        },
        Field {
            key: "quotes.max_installments",
            env_keys: &["QUOTEDESK_QUOTES_MAX_INSTALLMENTS"],
            value: config.quotes.max_installments.to_string(),
        },
        Field {
            key: "quotes.min_installment_value",
            env_keys: &["QUOTEDESK_QUOTES_MIN_INSTALLMENT_VALUE"],
            value: config.quotes.min_installment_value.to_string(),
        },
        Field {
            key: "quotes.interest_free_threshold",
            env_keys: &["QUOTEDESK_QUOTES_INTEREST_FREE_THRESHOLD"],
            value: config.quotes.interest_free_threshold.to_string(),
        },
        Field {
            key: "quotes.interest_rate_pct",
            env_keys: &["QUOTEDESK_QUOTES_INTEREST_RATE_PCT"],
            value: config.quotes.interest_rate_pct.to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["QUOTEDESK_LOGGING_LEVEL", "QUOTEDESK_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["QUOTEDESK_LOGGING_FORMAT", "QUOTEDESK_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("quotedesk.toml"), PathBuf::from("config/quotedesk.toml")]
        .into_iter()
        .find(|path| path.exists())
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
