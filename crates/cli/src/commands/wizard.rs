use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ragdeck_core::config::LoadOptions;
use ragdeck_core::errors::ApplicationError;
use ragdeck_core::wizard::{require_confirmation, NextOutcome, Wizard, WizardError};
use ragdeck_core::{FormData, StepPayload};
use ragdeck_db::{EntityKind, EntityStore, JsonDocumentStore, PersistOnComplete};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::commands::{load_context, runtime, CommandResult};

const COMMAND: &str = "wizard";
const REVIEW_STEP: &str = "review";

#[derive(Debug, Clone)]
pub struct WizardArgs {
    pub module: String,
    pub flow: String,
    pub script: PathBuf,
    pub kind: String,
    pub status: Option<String>,
    pub state: Option<String>,
}

/// One scripted user interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    Set { step: String, data: StepPayload },
    Next,
    Back,
    GoTo { index: usize },
    Reset,
}

impl ScriptAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Next => "next",
            Self::Back => "back",
            Self::GoTo { .. } => "go_to",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Actions(Vec<ScriptAction>),
    Session {
        #[serde(default)]
        initial: FormData,
        actions: Vec<ScriptAction>,
    },
}

pub fn run(options: &LoadOptions, args: WizardArgs) -> CommandResult {
    let context = match load_context(COMMAND, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let kind = match args.kind.parse::<EntityKind>() {
        Ok(kind) => kind,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, 4),
    };

    let (initial, actions) = match read_script(&args.script) {
        Ok(script) => script,
        Err(error) => {
            return CommandResult::failure(COMMAND, "invalid_input", format!("{error:#}"), 4);
        }
    };

    let mut wizard = match Wizard::mount(&context.resolver, &args.module, &args.flow, initial) {
        Ok(wizard) => wizard,
        Err(error) => return CommandResult::failure(COMMAND, "flow_config", error.to_string(), 4),
    };
    if wizard.steps().iter().any(|step| step.id == REVIEW_STEP) {
        wizard = wizard.with_validator(REVIEW_STEP, require_confirmation());
    }

    let store: Arc<dyn EntityStore> =
        Arc::new(JsonDocumentStore::open(context.config.storage.data_dir.clone()));
    let handler = match PersistOnComplete::new(store, kind, &args.module, &args.flow)
        .with_initial_status(&context.resolver, args.status, args.state)
    {
        Ok(handler) => handler,
        Err(error) => return CommandResult::failure(COMMAND, "invalid_value", error.to_string(), 4),
    };

    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let correlation_id = format!("wizard-{}", std::process::id());
    let replay = runtime.block_on(replay(&mut wizard, &handler, actions));
    let transcript = match replay {
        Ok(transcript) => transcript,
        Err(error) => {
            let interface = ApplicationError::from(error).into_interface(correlation_id);
            return CommandResult::failure(
                COMMAND,
                "wizard_transition",
                format!("{} ({interface})", interface.user_message()),
                4,
            );
        }
    };

    let created = runtime.block_on(handler.created());
    let completed = !created.is_empty();
    info!(
        event_name = "cli.wizard.replayed",
        module = %args.module,
        flow_type = %args.flow,
        actions = transcript.len(),
        completed,
        "wizard script replayed"
    );

    let data = json!({
        "module": args.module,
        "flowType": args.flow,
        "completed": completed,
        "entityIds": created.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(),
        "currentStep": wizard.current_step().map(|step| step.id.as_str()),
        "visited": wizard.visited(),
        "errors": wizard.errors(),
        "indicator": wizard.indicator(),
        "transcript": transcript,
    });
    let message = if completed {
        format!("wizard completed; {} {kind} entity persisted", created.len())
    } else {
        "wizard script replayed without completing".to_string()
    };
    CommandResult::success_with(COMMAND, message, Some(data))
}

/// Applies every action in order. Completion failures are recorded and the
/// session continues; transition errors abort the replay. Once the wizard has
/// completed, actions other than `reset` are recorded as skipped.
async fn replay(
    wizard: &mut Wizard,
    handler: &PersistOnComplete,
    actions: Vec<ScriptAction>,
) -> Result<Vec<Value>, WizardError> {
    let mut transcript = Vec::with_capacity(actions.len());

    for action in actions {
        if wizard.is_completed() && !matches!(action, ScriptAction::Reset) {
            warn!(
                event_name = "cli.wizard.action_skipped",
                action = action.name(),
                "wizard already completed; action skipped"
            );
            transcript.push(json!({ "action": action.name(), "skipped": "already_completed" }));
            continue;
        }
        let entry = match action {
            ScriptAction::Set { step, data } => {
                wizard.set_step_data(step.clone(), data)?;
                json!({ "action": "set", "step": step })
            }
            ScriptAction::Next => match wizard.next(handler).await {
                Ok(outcome) => json!({ "action": "next", "outcome": outcome_json(&outcome) }),
                Err(WizardError::Completion(error)) => json!({
                    "action": "next",
                    "outcome": { "result": "completion_failed", "message": error.to_string() },
                }),
                Err(error) => return Err(error),
            },
            ScriptAction::Back => {
                let index = wizard.back()?;
                json!({ "action": "back", "index": index })
            }
            ScriptAction::GoTo { index } => {
                wizard.go_to_step(index)?;
                json!({ "action": "go_to", "index": index })
            }
            ScriptAction::Reset => {
                wizard.reset();
                json!({ "action": "reset" })
            }
        };
        transcript.push(entry);
    }

    Ok(transcript)
}

fn outcome_json(outcome: &NextOutcome) -> Value {
    match outcome {
        NextOutcome::Advanced { index, step_id } => {
            json!({ "result": "advanced", "index": index, "step": step_id })
        }
        NextOutcome::Blocked { step_id, errors } => {
            json!({ "result": "blocked", "step": step_id, "errors": errors })
        }
        NextOutcome::ReadyToSubmit => json!({ "result": "ready_to_submit" }),
        NextOutcome::Completed => json!({ "result": "completed" }),
        NextOutcome::SubmissionInFlight => json!({ "result": "submission_in_flight" }),
    }
}

fn read_script(path: &Path) -> anyhow::Result<(FormData, Vec<ScriptAction>)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read wizard script `{}`", path.display()))?;
    let script: ScriptFile = serde_json::from_str(&raw)
        .with_context(|| format!("could not parse wizard script `{}`", path.display()))?;

    Ok(match script {
        ScriptFile::Actions(actions) => (FormData::new(), actions),
        ScriptFile::Session { initial, actions } => (initial, actions),
    })
}
