use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use oohquote_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: &[(&str, String, Option<&str>)] = &[
        ("database.url", config.database.url.clone(), Some("OOHQUOTE_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("OOHQUOTE_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("OOHQUOTE_DATABASE_TIMEOUT_SECS"),
        ),
        (
            "pricing.vat_rate_pct",
            config.pricing.vat_rate_pct.to_string(),
            Some("OOHQUOTE_PRICING_VAT_RATE_PCT"),
        ),
        (
            "pricing.default_creative_rate",
            config.pricing.default_creative_rate.to_string(),
            Some("OOHQUOTE_PRICING_DEFAULT_CREATIVE_RATE"),
        ),
        (
            "pricing.volume_discount_min_periods",
            config.pricing.volume_discount_min_periods.to_string(),
            Some("OOHQUOTE_PRICING_VOLUME_DISCOUNT_MIN_PERIODS"),
        ),
        (
            "pricing.volume_discount_pct",
            config.pricing.volume_discount_pct.to_string(),
            Some("OOHQUOTE_PRICING_VOLUME_DISCOUNT_PCT"),
        ),
        ("logging.level", config.logging.level.clone(), Some("OOHQUOTE_LOGGING_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("OOHQUOTE_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        lines.push(render_line(
            key,
            value,
            field_source(key, *env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("oohquote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/oohquote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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
