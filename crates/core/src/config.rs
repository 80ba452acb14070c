use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::settings::GeneralSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub quotes: QuoteConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Defaults for the general settings used until an operator stores their own.
#[derive(Clone, Debug)]
pub struct QuoteConfig {
    pub validity_days: u32,
    pub max_installments: u32,
    pub min_installment_value: Decimal,
    pub interest_free_threshold: u32,
    pub interest_rate_pct: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub validity_days: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = GeneralSettings::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://quotedesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            quotes: QuoteConfig {
                validity_days: settings.validity_days,
                max_installments: settings.max_installments,
                min_installment_value: settings.min_installment_value,
                interest_free_threshold: settings.interest_free_threshold,
                interest_rate_pct: settings.interest_rate_per_installment,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl QuoteConfig {
    pub fn general_settings(&self) -> GeneralSettings {
        GeneralSettings {
            validity_days: self.validity_days,
            max_installments: self.max_installments,
            min_installment_value: self.min_installment_value,
            interest_free_threshold: self.interest_free_threshold,
            interest_rate_per_installment: self.interest_rate_pct,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("quotedesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(quotes) = patch.quotes {
            if let Some(validity_days) = quotes.validity_days {
                self.quotes.validity_days = validity_days;
            }
            if let Some(max_installments) = quotes.max_installments {
                self.quotes.max_installments = max_installments;
            }
            if let Some(min_installment_value) = quotes.min_installment_value {
                self.quotes.min_installment_value = min_installment_value;
            }
            if let Some(interest_free_threshold) = quotes.interest_free_threshold {
                self.quotes.interest_free_threshold = interest_free_threshold;
            }
            if let Some(interest_rate_pct) = quotes.interest_rate_pct {
                self.quotes.interest_rate_pct = interest_rate_pct;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTEDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("QUOTEDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("QUOTEDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("QUOTEDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEDESK_QUOTES_VALIDITY_DAYS") {
            self.quotes.validity_days = parse_u32("QUOTEDESK_QUOTES_VALIDITY_DAYS", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTES_MAX_INSTALLMENTS") {
            self.quotes.max_installments = parse_u32("QUOTEDESK_QUOTES_MAX_INSTALLMENTS", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTES_MIN_INSTALLMENT_VALUE") {
            self.quotes.min_installment_value =
                parse_decimal("QUOTEDESK_QUOTES_MIN_INSTALLMENT_VALUE", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTES_INTEREST_FREE_THRESHOLD") {
            self.quotes.interest_free_threshold =
                parse_u32("QUOTEDESK_QUOTES_INTEREST_FREE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTES_INTEREST_RATE_PCT") {
            self.quotes.interest_rate_pct =
                parse_decimal("QUOTEDESK_QUOTES_INTEREST_RATE_PCT", &value)?;
        }

        let log_level =
            read_env("QUOTEDESK_LOGGING_LEVEL").or_else(|| read_env("QUOTEDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTEDESK_LOGGING_FORMAT").or_else(|| read_env("QUOTEDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(validity_days) = overrides.validity_days {
            self.quotes.validity_days = validity_days;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_quotes(&self.quotes)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quotedesk.toml"), PathBuf::from("config/quotedesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_quotes(quotes: &QuoteConfig) -> Result<(), ConfigError> {
    if quotes.validity_days == 0 || quotes.validity_days > 365 {
        return Err(ConfigError::Validation(
            "quotes.validity_days must be in range 1..=365".to_string(),
        ));
    }

    if quotes.max_installments == 0 || quotes.max_installments > 48 {
        return Err(ConfigError::Validation(
            "quotes.max_installments must be in range 1..=48".to_string(),
        ));
    }

    if quotes.interest_free_threshold == 0 {
        return Err(ConfigError::Validation(
            "quotes.interest_free_threshold must be greater than zero".to_string(),
        ));
    }

    if quotes.min_installment_value < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "quotes.min_installment_value must not be negative".to_string(),
        ));
    }

    if quotes.interest_rate_pct < Decimal::ZERO || quotes.interest_rate_pct > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::Validation(
            "quotes.interest_rate_pct must be in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    quotes: Option<QuotesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotesPatch {
    validity_days: Option<u32>,
    max_installments: Option<u32>,
    min_installment_value: Option<Decimal>,
    interest_free_threshold: Option<u32>,
    interest_rate_pct: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_general_settings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let settings = config.quotes.general_settings();

        ensure(settings.validity_days == 15, "default validity should be 15 days")?;
        ensure(settings.max_installments == 6, "default max installments should be 6")?;
        ensure(
            settings.interest_rate_per_installment == Decimal::new(25, 1),
            "default interest rate should be 2.5%",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_QUOTEDESK_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quotedesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_QUOTEDESK_DB}"

[quotes]
validity_days = 30
interest_rate_pct = "1.75"
min_installment_value = 500
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.quotes.validity_days == 30, "validity days should come from file")?;
            ensure(
                config.quotes.interest_rate_pct == Decimal::new(175, 2),
                "interest rate should come from file",
            )?;
            ensure(
                config.quotes.min_installment_value == Decimal::from(500),
                "minimum installment should come from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_QUOTEDESK_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_LOG_LEVEL", "warn");
        env::set_var("QUOTEDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["QUOTEDESK_LOG_LEVEL", "QUOTEDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("QUOTEDESK_QUOTES_VALIDITY_DAYS", "20");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quotedesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[quotes]
validity_days = 10
max_installments = 10

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.quotes.validity_days == 20, "env validity should win over file")?;
            ensure(config.quotes.max_installments == 10, "file value should win over default")?;
            Ok(())
        })();

        clear_vars(&["QUOTEDESK_DATABASE_URL", "QUOTEDESK_QUOTES_VALIDITY_DAYS"]);
        result
    }

    #[test]
    fn invalid_env_number_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_QUOTES_INTEREST_RATE_PCT", "two");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid override error".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "QUOTEDESK_QUOTES_INTEREST_RATE_PCT"
                ),
                "invalid override should name the variable",
            )
        })();

        clear_vars(&["QUOTEDESK_QUOTES_INTEREST_RATE_PCT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { validity_days: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("quotes.validity_days")
            ),
            "validation failure should mention quotes.validity_days",
        )
    }

    #[test]
    fn non_sqlite_database_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/quotes".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("database.url")),
            "postgres url should be rejected",
        )
    }
}
