use ragdeck_core::config::LoadOptions;
use ragdeck_core::flows::StepDefinition;
use serde_json::{json, Value};

use crate::commands::{load_context, CommandResult};

pub fn modules(options: &LoadOptions) -> CommandResult {
    let context = match load_context("modules", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let modules = context
        .resolver
        .catalog()
        .modules
        .iter()
        .map(|(name, module)| {
            json!({
                "module": name,
                "label": module.label,
                "flows": module.flows.keys().collect::<Vec<_>>(),
                "statuses": module.statuses.keys().collect::<Vec<_>>(),
                "states": module.states.keys().collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    CommandResult::success_with(
        "modules",
        format!("{} module(s) configured", modules.len()),
        Some(Value::Array(modules)),
    )
}

pub fn flow(options: &LoadOptions, module: &str, flow_type: &str, all: bool) -> CommandResult {
    let context = match load_context("flow", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let resolved = if all {
        context.resolver.resolve_all_steps(module, flow_type)
    } else {
        context.resolver.resolve_flow(module, flow_type)
    };

    match resolved {
        Ok(steps) => CommandResult::success_with(
            "flow",
            format!("{module}/{flow_type}: {} step(s)", steps.len()),
            Some(Value::Array(steps.iter().map(step_json).collect())),
        ),
        Err(error) => CommandResult::failure("flow", "flow_config", error.to_string(), 4),
    }
}

pub fn check_status(options: &LoadOptions, module: &str, status: &str) -> CommandResult {
    check_key("check-status", options, module, status, |context| {
        context.resolver.validate_status(module, status)
    })
}

pub fn check_state(options: &LoadOptions, module: &str, state: &str) -> CommandResult {
    check_key("check-state", options, module, state, |context| {
        context.resolver.validate_state(module, state)
    })
}

fn check_key(
    command: &str,
    options: &LoadOptions,
    module: &str,
    value: &str,
    is_valid: impl FnOnce(&crate::commands::CommandContext) -> bool,
) -> CommandResult {
    let context = match load_context(command, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    if is_valid(&context) {
        CommandResult::success(command, format!("`{value}` is configured for module `{module}`"))
    } else {
        CommandResult::failure(
            command,
            "invalid_value",
            format!("`{value}` is not configured for module `{module}`"),
            4,
        )
    }
}

fn step_json(step: &StepDefinition) -> Value {
    json!({
        "id": step.id,
        "title": step.title,
        "order": step.order,
        "required": step.required,
        "enabled": step.enabled,
    })
}
