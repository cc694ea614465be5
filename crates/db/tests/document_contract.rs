use std::sync::Arc;

use ragdeck_core::domain::{BasicInfo, ReviewConfirmation, StepPayload};
use ragdeck_core::flows::{FlowResolver, ModuleCatalog};
use ragdeck_core::wizard::{NextOutcome, Wizard};
use ragdeck_core::FormData;
use ragdeck_db::{EntityKind, EntityStore, JsonDocumentStore, PersistOnComplete, PipelineService};
use ragdeck_db::{RepositoryError, StatusChange};
use serde_json::Value;

type ContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn require_array<'a>(value: &'a Value, field_name: &str) -> ContractTestResult<&'a [Value]> {
    value
        .as_array()
        .map(|values| values.as_slice())
        .ok_or_else(|| format!("{field_name} should be an array"))
}

fn require_str<'a>(value: &'a Value, field_name: &str) -> ContractTestResult<&'a str> {
    value
        .get(field_name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{field_name} should be a string"))
}

fn resolver() -> ContractTestResult<FlowResolver> {
    let catalog = ModuleCatalog::builtin().map_err(|error| error.to_string())?;
    Ok(FlowResolver::new(Arc::new(catalog)))
}

fn read_document(store: &JsonDocumentStore, kind: EntityKind) -> ContractTestResult<Value> {
    let raw = std::fs::read_to_string(store.document_path(kind))
        .map_err(|error| format!("read {kind} document: {error}"))?;
    serde_json::from_str(&raw).map_err(|error| format!("parse {kind} document: {error}"))
}

#[tokio::test]
async fn completed_wizard_is_written_as_one_pipeline_document_entry() -> ContractTestResult {
    let temp_dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let resolver = resolver()?;
    let store: Arc<dyn EntityStore> = Arc::new(JsonDocumentStore::open(temp_dir.path()));
    let handler = PersistOnComplete::new(store.clone(), EntityKind::Pipeline, "pipeline", "llm")
        .with_initial_status(&resolver, Some("draft".to_string()), Some("idle".to_string()))
        .map_err(|error| error.to_string())?;

    let mut initial = FormData::new();
    initial.insert(
        "basic".to_string(),
        StepPayload::Basic(BasicInfo { name: "Helpdesk".to_string(), description: None }),
    );
    let mut wizard =
        Wizard::mount(&resolver, "pipeline", "llm", initial).map_err(|error| error.to_string())?;

    let first = wizard.next(&handler).await.map_err(|error| error.to_string())?;
    require!(matches!(first, NextOutcome::Advanced { index: 1, .. }), "basic should advance");

    let blocked = wizard.next(&handler).await.map_err(|error| error.to_string())?;
    require!(matches!(blocked, NextOutcome::Blocked { .. }), "empty llm step should block");

    wizard
        .set_step_data(
            "llm",
            StepPayload::Custom(serde_json::Map::from_iter([(
                "model".to_string(),
                Value::String("small".to_string()),
            )])),
        )
        .map_err(|error| error.to_string())?;
    wizard
        .set_step_data("review", StepPayload::Review(ReviewConfirmation { confirmed: Some(true) }))
        .map_err(|error| error.to_string())?;

    let mut outcome = NextOutcome::SubmissionInFlight;
    while outcome != NextOutcome::Completed {
        outcome = wizard.next(&handler).await.map_err(|error| error.to_string())?;
        require!(!matches!(outcome, NextOutcome::Blocked { .. }), "unexpected block: {outcome:?}");
    }

    let json_store = JsonDocumentStore::open(temp_dir.path());
    let document = read_document(&json_store, EntityKind::Pipeline)?;
    let pipelines = require_array(&document["pipelines"], "pipelines")?;
    require_eq!(pipelines.len(), 1);

    let pipeline = &pipelines[0];
    require!(!require_str(pipeline, "id")?.is_empty());
    require!(pipeline.get("createdAt").is_some(), "createdAt should be present");
    require!(pipeline.get("updatedAt").is_some(), "updatedAt should be present");
    require_eq!(require_str(pipeline, "module")?, "pipeline");
    require_eq!(require_str(pipeline, "flowType")?, "llm");
    require_eq!(require_str(pipeline, "name")?, "Helpdesk");
    require_eq!(require_str(pipeline, "status")?, "draft");
    require_eq!(require_str(&pipeline["steps"]["review"], "kind")?, "review");
    Ok(())
}

#[tokio::test]
async fn guarded_status_update_leaves_document_untouched_on_rejection() -> ContractTestResult {
    let temp_dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let store = Arc::new(JsonDocumentStore::open(temp_dir.path()));
    let service = PipelineService::new(store.clone(), resolver()?);

    let mut payload = serde_json::Map::new();
    payload.insert("name".to_string(), Value::String("Helpdesk".to_string()));
    payload.insert("status".to_string(), Value::String("draft".to_string()));
    let created = service.create("pipeline", payload).await.map_err(|error| error.to_string())?;
    let before = read_document(&store, EntityKind::Pipeline)?;

    let rejected = service
        .update_status(
            &created.id,
            StatusChange { status: Some("shipping".to_string()), state: None },
        )
        .await;
    require!(
        matches!(rejected, Err(RepositoryError::InvalidStatus { .. })),
        "unknown status should be rejected, got {rejected:?}"
    );
    require_eq!(read_document(&store, EntityKind::Pipeline)?, before);

    let updated = service
        .update_status(
            &created.id,
            StatusChange { status: Some("paused".to_string()), state: Some("stopped".to_string()) },
        )
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(updated.field_str("status"), Some("paused"));
    let after = read_document(&store, EntityKind::Pipeline)?;
    require_eq!(require_str(&after["pipelines"][0], "state")?, "stopped");
    Ok(())
}
