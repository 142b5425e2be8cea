pub mod config;
pub mod doctor;
pub mod lookup;

use bonusbot_core::ErrorClass;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;

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
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn lookup_failure(command: &str, class: ErrorClass, message: impl Into<String>) -> Self {
        Self::failure(command, class.as_str(), message, exit_code_for(class))
    }
}

/// Stable per-class exit codes; 2 is reserved for configuration failures.
pub fn exit_code_for(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::MalformedInput => 3,
        ErrorClass::NotFound => 4,
        ErrorClass::TransientFetch => 5,
        ErrorClass::DataIntegrity => 6,
        ErrorClass::ProtocolViolation => 7,
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
