use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "nexure.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storefront: StorefrontConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

/// Backend REST API that serves order tracking and chat replies.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub max_message_chars: usize,
    pub flows_path: Option<PathBuf>,
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

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub flows_path: Option<PathBuf>,
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
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api/v1".to_string(),
                timeout_secs: 15,
                api_key: None,
            },
            storefront: StorefrontConfig { base_url: "http://localhost:5173".to_string() },
            chat: ChatConfig { max_message_chars: 1000, flows_path: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Joins a storefront route such as `/shop` onto the storefront base URL.
    pub fn storefront_link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.storefront.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Effective settings as JSON, with the API key reduced to a presence flag.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "api": {
                "base_url": self.api.base_url,
                "timeout_secs": self.api.timeout_secs,
                "api_key": self.api.api_key.as_ref().map(|_| "<redacted>"),
            },
            "storefront": { "base_url": self.storefront.base_url },
            "chat": {
                "max_message_chars": self.chat.max_message_chars,
                "flows_path": self.chat.flows_path.as_ref().map(|path| path.display().to_string()),
            },
            "logging": { "level": self.logging.level, "format": self.logging.format.as_str() },
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(api_key_value) = api.api_key {
                self.api.api_key = Some(secret_value(api_key_value));
            }
        }

        if let Some(storefront) = patch.storefront {
            if let Some(base_url) = storefront.base_url {
                self.storefront.base_url = base_url;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(max_message_chars) = chat.max_message_chars {
                self.chat.max_message_chars = max_message_chars;
            }
            if let Some(flows_path) = chat.flows_path {
                self.chat.flows_path = Some(flows_path);
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
        if let Some(value) = read_env("NEXURE_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("NEXURE_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("NEXURE_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("NEXURE_API_KEY") {
            self.api.api_key = Some(secret_value(value));
        }

        if let Some(value) = read_env("NEXURE_STOREFRONT_BASE_URL") {
            self.storefront.base_url = value;
        }

        if let Some(value) = read_env("NEXURE_CHAT_MAX_MESSAGE_CHARS") {
            self.chat.max_message_chars = parse_usize("NEXURE_CHAT_MAX_MESSAGE_CHARS", &value)?;
        }
        if let Some(value) = read_env("NEXURE_CHAT_FLOWS_PATH") {
            self.chat.flows_path = Some(PathBuf::from(value));
        }

        let log_level = read_env("NEXURE_LOGGING_LEVEL").or_else(|| read_env("NEXURE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("NEXURE_LOGGING_FORMAT").or_else(|| read_env("NEXURE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.api_base_url {
            self.api.base_url = api_base_url;
        }
        if let Some(api_key) = overrides.api_key {
            self.api.api_key = Some(secret_value(api_key));
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(flows_path) = overrides.flows_path {
            self.chat.flows_path = Some(flows_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_storefront(&self.storefront)?;
        validate_chat(&self.chat)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
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

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    if !is_http_url(&api.base_url) {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation("api.timeout_secs must be in range 1..=300".to_string()));
    }

    let blank_key =
        api.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(
            "api.api_key must not be blank when set; remove it to call the API anonymously"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_storefront(storefront: &StorefrontConfig) -> Result<(), ConfigError> {
    if !is_http_url(&storefront.base_url) {
        return Err(ConfigError::Validation(
            "storefront.base_url must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.max_message_chars == 0 || chat.max_message_chars > 4000 {
        return Err(ConfigError::Validation(
            "chat.max_message_chars must be in range 1..=4000".to_string(),
        ));
    }

    if let Some(path) = &chat.flows_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "chat.flows_path must not be empty when set".to_string(),
            ));
        }
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    storefront: Option<StorefrontPatch>,
    chat: Option<ChatPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorefrontPatch {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    max_message_chars: Option<usize>,
    flows_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
