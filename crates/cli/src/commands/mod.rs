pub mod config;
pub mod dashboard;
pub mod discount;
pub mod expire;
pub mod installments;
pub mod migrate;
pub mod quotes;
pub mod seed;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use quotedesk_core::config::{AppConfig, LoadOptions};
use quotedesk_core::errors::{ApplicationError, InterfaceError};
use quotedesk_core::notifications::TracingNotificationBus;
use quotedesk_core::service::QuoteService;
use quotedesk_db::{
    connect_with_config, migrations, DbPool, SqlClientDirectory, SqlQuoteStore, SqlSettingsProvider,
};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// `(error_class, message, exit_code)` carried out of an async command body.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::ok(command, message.into(), None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::ok(command, message.into(), Some(value)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn ok(command: &str, message: String, data: Option<serde_json::Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

/// Loads config, then drives `body` to completion on a current-thread runtime.
pub(crate) fn run_async<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<CommandResult, Failure>>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(body(config)) {
        Ok(result) => result,
        Err(failure) => CommandResult::from_failure(command, failure),
    }
}

/// Connects and applies pending migrations so every command sees the current schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    debug!(event_name = "cli.database.ready", url = %config.database.url, "database ready");
    Ok(pool)
}

pub(crate) fn quote_service(pool: &DbPool, config: &AppConfig) -> QuoteService {
    QuoteService::new(
        Arc::new(SqlQuoteStore::new(pool.clone())),
        Arc::new(SqlClientDirectory::new(pool.clone())),
        Arc::new(SqlSettingsProvider::new(pool.clone(), config.quotes.general_settings())),
        Arc::new(TracingNotificationBus),
    )
}

pub(crate) fn service_failure(error: ApplicationError) -> Failure {
    let interface = error.into_interface(Uuid::new_v4().to_string());
    let message = format!("{interface} ({})", interface.user_message());
    match interface {
        InterfaceError::BadRequest { .. } | InterfaceError::NotFound { .. } => {
            ("domain_rule", message, 6)
        }
        InterfaceError::ServiceUnavailable { .. } => ("persistence", message, 7),
        InterfaceError::Internal { .. } => ("internal", message, 9),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use quotedesk_core::errors::{ApplicationError, DomainError};

    use super::{service_failure, CommandResult};

    #[test]
    fn success_payload_omits_absent_data() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn data_payload_is_embedded_as_json() {
        let result = CommandResult::success_with_data("discount", "computed", &vec![1, 2, 3]);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["data"][2], 3);
    }

    #[test]
    fn failure_carries_class_and_exit_code() {
        let result = CommandResult::failure("expire", "db_connectivity", "no database", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["error_class"], "db_connectivity");
    }

    #[test]
    fn service_errors_are_classified_through_interface_mapping() {
        let (class, message, code) =
            service_failure(ApplicationError::from(DomainError::not_found("quote", "q-9")));
        assert_eq!((class, code), ("domain_rule", 6));
        assert!(message.starts_with("not found: quote `q-9` was not found"));

        let (class, _, code) = service_failure(ApplicationError::Persistence("disk full".into()));
        assert_eq!((class, code), ("persistence", 7));

        let (class, _, code) = service_failure(ApplicationError::Configuration("bad".into()));
        assert_eq!((class, code), ("internal", 9));
    }
}
