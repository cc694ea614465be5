pub mod catalog;
pub mod config;
pub mod doctor;
pub mod entities;
pub mod wizard;

use std::sync::Arc;

use ragdeck_core::config::{AppConfig, LoadOptions};
use ragdeck_core::errors::ApplicationError;
use ragdeck_core::flows::FlowResolver;
use serde::Serialize;
use serde_json::Value;

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
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
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
}

/// Loaded configuration plus a resolver over the configured module catalog.
pub(crate) struct CommandContext {
    pub config: AppConfig,
    pub resolver: FlowResolver,
}

pub(crate) fn load_context(
    command: &str,
    options: &LoadOptions,
) -> Result<CommandContext, CommandResult> {
    let config = AppConfig::load(options.clone()).map_err(|error| {
        configuration_failure(command, "config_validation", format!("configuration issue: {error}"))
    })?;
    let catalog = config.load_catalog().map_err(|error| {
        configuration_failure(command, "catalog", format!("module catalog issue: {error}"))
    })?;

    Ok(CommandContext { config, resolver: FlowResolver::new(Arc::new(catalog)) })
}

fn configuration_failure(command: &str, error_class: &str, message: String) -> CommandResult {
    let interface = ApplicationError::Configuration(message)
        .into_interface(format!("{command}-{}", std::process::id()));
    CommandResult::failure(
        command,
        error_class,
        format!("{} ({interface})", interface.user_message()),
        2,
    )
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
