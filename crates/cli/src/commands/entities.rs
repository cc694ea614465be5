use std::sync::Arc;

use ragdeck_core::config::LoadOptions;
use ragdeck_core::errors::{ApplicationError, DomainError};
use ragdeck_db::{
    EntityKind, EntityStore, JsonDocumentStore, PipelineService, RepositoryError, StatusChange,
};
use serde_json::Value;

use crate::commands::{load_context, runtime, CommandResult};

pub fn list(options: &LoadOptions, kind: &str) -> CommandResult {
    let context = match load_context("entities", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let kind = match kind.parse::<EntityKind>() {
        Ok(kind) => kind,
        Err(message) => return CommandResult::failure("entities", "invalid_input", message, 4),
    };
    let runtime = match runtime("entities") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = JsonDocumentStore::open(context.config.storage.data_dir);
    match runtime.block_on(store.list(kind)) {
        Ok(records) => {
            let count = records.len();
            let data = serde_json::to_value(records).unwrap_or(Value::Null);
            CommandResult::success_with(
                "entities",
                format!("{count} {} stored", kind.plural()),
                Some(data),
            )
        }
        Err(error) => storage_failure("entities", error),
    }
}

pub fn set_pipeline_status(
    options: &LoadOptions,
    id: &str,
    status: Option<String>,
    state: Option<String>,
) -> CommandResult {
    const COMMAND: &str = "set-pipeline-status";

    let change = StatusChange { status, state };
    if change.is_empty() {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            "provide --status, --state, or both",
            4,
        );
    }

    let context = match load_context(COMMAND, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store: Arc<dyn EntityStore> =
        Arc::new(JsonDocumentStore::open(context.config.storage.data_dir));
    let service = PipelineService::new(store, context.resolver);

    match runtime.block_on(service.update_status(id, change)) {
        Ok(record) => CommandResult::success_with(
            COMMAND,
            format!("pipeline `{}` updated", record.id),
            serde_json::to_value(&record).ok(),
        ),
        Err(error) => storage_failure(COMMAND, error),
    }
}

fn storage_failure(command: &str, error: RepositoryError) -> CommandResult {
    let error = ApplicationError::from(error);
    let (error_class, exit_code) = match &error {
        ApplicationError::Domain(DomainError::EntityNotFound { .. }) => ("not_found", 4),
        ApplicationError::Domain(DomainError::InvalidEnumValue { .. }) => ("invalid_value", 4),
        ApplicationError::Domain(_) => ("invalid_input", 4),
        ApplicationError::Persistence(_) | ApplicationError::Completion(_) => ("storage", 5),
        ApplicationError::Configuration(_) => ("config_validation", 2),
    };
    let interface = error.into_interface(format!("{command}-{}", std::process::id()));
    CommandResult::failure(
        command,
        error_class,
        format!("{} ({interface})", interface.user_message()),
        exit_code,
    )
}
