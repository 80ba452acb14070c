use std::env;
use std::sync::{Mutex, OnceLock};

use quotedesk_cli::commands::{dashboard, discount, expire, installments, migrate, quotes, seed};
use quotedesk_core::domain::quote::QuoteStatus;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure_for_invalid_validity() {
    with_env(
        &[("QUOTEDESK_DATABASE_URL", "sqlite::memory:"), ("QUOTEDESK_QUOTES_VALIDITY_DAYS", "0")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn migrate_rejects_non_sqlite_urls() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "postgres://localhost/quotes")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    with_env(&[("QUOTEDESK_DATABASE_URL", &url)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "first seed failed: {}", first.output);
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert!(first_payload["message"].as_str().unwrap_or("").contains("3 quotes inserted"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "second seed failed: {}", second.output);
        let second_payload = parse_payload(&second.output);
        assert!(second_payload["message"].as_str().unwrap_or("").contains("3 already present"));
    });
}

#[test]
fn seeded_database_lists_quotes_newest_first() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    with_env(&[("QUOTEDESK_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0);

        let all = quotes::run(None);
        assert_eq!(all.exit_code, 0, "quotes failed: {}", all.output);
        let payload = parse_payload(&all.output);
        let rows = payload["data"].as_array().expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], "quote-demo-003");
        assert_eq!(rows[2]["sequence_number"], 1);

        let open = quotes::run(Some(QuoteStatus::Open));
        let payload = parse_payload(&open.output);
        assert_eq!(payload["message"], "1 open quotes");
        assert_eq!(payload["data"][0]["id"], "quote-demo-001");
    });
}

#[test]
fn dashboard_and_expiry_run_against_seeded_database() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    with_env(&[("QUOTEDESK_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = dashboard::run();
        assert_eq!(result.exit_code, 0, "dashboard failed: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["total"], 3);
        assert_eq!(payload["data"]["by_status"]["accepted"]["count"], 1);
        assert_eq!(payload["data"]["client_count"], 3);

        let sweep = expire::run();
        assert_eq!(sweep.exit_code, 0, "expire failed: {}", sweep.output);
        let payload = parse_payload(&sweep.output);
        assert_eq!(payload["message"], "expired 0 quotes, 0 failures");
    });
}

#[test]
fn installments_follow_configured_schedule() {
    with_env(&[("QUOTEDESK_QUOTES_MAX_INSTALLMENTS", "4")], || {
        let result = installments::run(Decimal::from(10000), Decimal::from(20), &[1, 3]);
        assert_eq!(result.exit_code, 0, "installments failed: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["options"].as_array().map(Vec::len), Some(4));
        assert_eq!(payload["data"]["selected"], serde_json::json!([1, 3]));
    });
}

#[test]
fn installments_reject_unsupported_entry_percent() {
    with_env(&[], || {
        let result = installments::run(Decimal::from(10000), Decimal::from(12), &[]);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "domain_rule");
    });
}

#[test]
fn discount_rejects_negative_totals() {
    let result = discount::run(Decimal::from(-5), Decimal::from(10));
    assert_eq!(result.exit_code, 6);
    assert_eq!(parse_payload(&result.output)["error_class"], "domain_rule");
}

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("quotedesk.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "QUOTEDESK_DATABASE_URL",
        "QUOTEDESK_DATABASE_MAX_CONNECTIONS",
        "QUOTEDESK_DATABASE_TIMEOUT_SECS",
        "QUOTEDESK_QUOTES_VALIDITY_DAYS",
        "QUOTEDESK_QUOTES_MAX_INSTALLMENTS",
        "QUOTEDESK_QUOTES_MIN_INSTALLMENT_VALUE",
        "QUOTEDESK_QUOTES_INTEREST_FREE_THRESHOLD",
        "QUOTEDESK_QUOTES_INTEREST_RATE_PCT",
        "QUOTEDESK_LOGGING_LEVEL",
        "QUOTEDESK_LOGGING_FORMAT",
        "QUOTEDESK_LOG_LEVEL",
        "QUOTEDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
