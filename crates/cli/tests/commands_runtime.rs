use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use oohquote_cli::commands::{demo, migrate, price};
use serde_json::Value;

#[test]
fn migrate_returns_success_against_memory_database() {
    with_env(&[("OOHQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["applied_versions"], serde_json::json!([1]));
    });
}

#[test]
fn migrate_returns_config_failure_with_invalid_settings() {
    with_env(&[("OOHQUOTE_PRICING_VAT_RATE_PCT", "250")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn demo_flow_reaches_submission() {
    with_env(&[], || {
        let result = demo::run();
        assert_eq!(result.exit_code, 0, "expected demo flow to complete");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "demo");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["quote"]["status"], "submitted");
        assert_eq!(payload["data"]["quote"]["items"].as_array().map(Vec::len), Some(2));
    });
}

#[test]
fn price_reports_a_cost_breakdown_from_a_rate_card_file() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rates.toml");
        fs::write(
            &path,
            r#"
[[rates]]
format_id = "48-sheet"
base_rate = "150"
markup_pct = "0"
enabled_periods = [1, 2, 3, 4, 5]
"#,
        )
        .expect("write rate card");

        let result = price::run(price::PriceRequest {
            rate_card: path,
            format: "48-sheet".to_owned(),
            quantity: 2,
            periods: vec![1, 2, 3],
            locations: Vec::new(),
            creative_assets: 0,
            category: None,
        });
        assert_eq!(result.exit_code, 0, "expected pricing to succeed");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "price");
        assert_eq!(payload["status"], "ok");
        // 150 x 2 panels x 3 periods, 10% default discount at 3+ periods.
        assert_eq!(payload["data"]["media_cost"], "900");
        assert_eq!(payload["data"]["discount_pct"], "10");
    });
}

#[test]
fn price_fails_cleanly_for_an_unknown_format() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rates.toml");
        fs::write(&path, "").expect("write empty rate card");

        let result = price::run(price::PriceRequest {
            rate_card: path,
            format: "mega-banner".to_owned(),
            quantity: 1,
            periods: vec![1],
            locations: Vec::new(),
            creative_assets: 0,
            category: None,
        });
        assert_eq!(result.exit_code, 1, "expected pricing failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "pricing");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "OOHQUOTE_DATABASE_URL",
        "OOHQUOTE_DATABASE_MAX_CONNECTIONS",
        "OOHQUOTE_DATABASE_TIMEOUT_SECS",
        "OOHQUOTE_PRICING_VAT_RATE_PCT",
        "OOHQUOTE_PRICING_DEFAULT_CREATIVE_RATE",
        "OOHQUOTE_PRICING_VOLUME_DISCOUNT_MIN_PERIODS",
        "OOHQUOTE_PRICING_VOLUME_DISCOUNT_PCT",
        "OOHQUOTE_LOGGING_LEVEL",
        "OOHQUOTE_LOGGING_FORMAT",
        "OOHQUOTE_LOG_LEVEL",
        "OOHQUOTE_LOG_FORMAT",
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
