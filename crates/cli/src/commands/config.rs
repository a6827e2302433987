use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hireflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Key path, environment override, rendered value.
type ConfigRow = (&'static str, &'static str, String);

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in rows(&config) {
        let source = field_source(
            key_path,
            env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn rows(config: &AppConfig) -> Vec<ConfigRow> {
    vec![
        ("database.url", "HIREFLOW_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "HIREFLOW_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "HIREFLOW_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("server.bind_address", "HIREFLOW_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "HIREFLOW_SERVER_PORT", config.server.port.to_string()),
        (
            "server.graceful_shutdown_secs",
            "HIREFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        ("ledger.debit_rate", "HIREFLOW_LEDGER_DEBIT_RATE", config.ledger.debit_rate.to_string()),
        ("logging.level", "HIREFLOW_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "HIREFLOW_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("hireflow.toml"), PathBuf::from("config/hireflow.toml")]
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
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source, render_line};

    #[test]
    fn nested_keys_resolve_against_the_file_document() {
        let doc: Value = "[ledger]\ndebit_rate = \"0.25\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "ledger.debit_rate"));
        assert!(!contains_path(&doc, "ledger.missing"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn file_source_is_reported_when_key_is_present() {
        let doc: Value = "[server]\nport = 9000\n".parse().expect("toml");
        let source = field_source(
            "server.port",
            "HIREFLOW_TEST_UNSET_PORT",
            Some(&doc),
            Some(std::path::Path::new("hireflow.toml")),
        );

        assert_eq!(source, "file (hireflow.toml)");
        assert_eq!(
            render_line("server.port", "9000", source),
            "- server.port = 9000 (source: file (hireflow.toml))"
        );
        assert_eq!(
            field_source("server.bind_address", "HIREFLOW_TEST_UNSET_BIND", Some(&doc), None),
            "default"
        );
    }
}
