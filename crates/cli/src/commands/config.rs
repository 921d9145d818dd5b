use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nexure_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use serde_json::{json, Map, Value as JsonValue};
use toml::Value;

use crate::commands::CommandResult;

const COMMAND: &str = "config";

const FIELDS: &[(&str, &[&str])] = &[
    ("api.base_url", &["NEXURE_API_BASE_URL"]),
    ("api.timeout_secs", &["NEXURE_API_TIMEOUT_SECS"]),
    ("api.api_key", &["NEXURE_API_KEY"]),
    ("storefront.base_url", &["NEXURE_STOREFRONT_BASE_URL"]),
    ("chat.max_message_chars", &["NEXURE_CHAT_MAX_MESSAGE_CHARS"]),
    ("chat.flows_path", &["NEXURE_CHAT_FLOWS_PATH"]),
    ("logging.level", &["NEXURE_LOGGING_LEVEL", "NEXURE_LOG_LEVEL"]),
    ("logging.format", &["NEXURE_LOGGING_FORMAT", "NEXURE_LOG_FORMAT"]),
];

/// Effective configuration with secrets redacted and the source of every field
/// (precedence: env > file > default).
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let sources: Map<String, JsonValue> = FIELDS
        .iter()
        .map(|(key_path, env_keys)| {
            let source = field_source(
                key_path,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            );
            (key_path.to_string(), JsonValue::String(source))
        })
        .collect();

    CommandResult::data(
        COMMAND,
        json!({
            "config_file": config_file_path.map(|path| path.display().to_string()),
            "effective": config.redacted(),
            "sources": sources,
        }),
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
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
