pub mod chat;
pub mod config;
pub mod flows;
pub mod inventory;
pub mod variants;

use nexure_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION: u8 = 2;

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
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(&payload) }
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
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Success payload carrying `data` next to the usual `command` and `status` keys.
    pub fn data(command: &str, data: Value) -> Self {
        let payload = serde_json::json!({
            "command": command,
            "status": "ok",
            "data": data,
        });
        Self { exit_code: EXIT_OK, output: serialize_payload(&payload) }
    }

    pub fn from_error(command: &str, error: impl Into<ApplicationError>) -> Self {
        let interface = error.into().into_interface(format!("cli.{command}"));
        let exit_code = match interface {
            InterfaceError::BadRequest { .. } => EXIT_VALIDATION,
            InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
                EXIT_FAILURE
            }
        };
        let message = match &interface {
            InterfaceError::BadRequest { message, .. }
            | InterfaceError::ServiceUnavailable { message, .. }
            | InterfaceError::Internal { message, .. } => message.clone(),
        };
        Self::failure(command, interface.error_class(), message, exit_code)
    }

    pub fn config_failure(command: &str, error: impl std::fmt::Display) -> Self {
        Self::failure(command, "config_validation", error.to_string(), EXIT_VALIDATION)
    }
}

fn serialize_payload(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
