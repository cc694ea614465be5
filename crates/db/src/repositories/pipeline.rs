use std::sync::Arc;

use ragdeck_core::flows::FlowResolver;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::entity::{EntityKind, EntityRecord};

use super::{EntityStore, RepositoryError};

/// Module assumed for pipeline records written before the `module` field existed.
pub const DEFAULT_PIPELINE_MODULE: &str = "pipeline";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusChange {
    pub status: Option<String>,
    pub state: Option<String>,
}

impl StatusChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.state.is_none()
    }

    fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(status) = self.status {
            fields.insert("status".to_string(), Value::String(status));
        }
        if let Some(state) = self.state {
            fields.insert("state".to_string(), Value::String(state));
        }
        fields
    }
}

/// Pipeline writes that only accept status and state keys configured for the
/// record's module.
pub struct PipelineService {
    store: Arc<dyn EntityStore>,
    resolver: FlowResolver,
}

impl PipelineService {
    pub fn new(store: Arc<dyn EntityStore>, resolver: FlowResolver) -> Self {
        Self { store, resolver }
    }

    pub async fn create(
        &self,
        module: &str,
        mut payload: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError> {
        let change = StatusChange {
            status: string_field(&payload, "status", module)?,
            state: string_field(&payload, "state", module)?,
        };
        self.check(module, &change)?;

        payload.insert("module".to_string(), Value::String(module.to_string()));
        let record = self.store.create(EntityKind::Pipeline, payload).await?;
        info!(
            event_name = "pipeline.created",
            pipeline_id = %record.id,
            module = module,
            "pipeline created"
        );
        Ok(record)
    }

    pub async fn update_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<EntityRecord, RepositoryError> {
        let current = self.store.get(EntityKind::Pipeline, id).await?;
        let module = current.field_str("module").unwrap_or(DEFAULT_PIPELINE_MODULE).to_string();
        self.check(&module, &change)?;

        if change.is_empty() {
            return Ok(current);
        }
        let record = self.store.update(EntityKind::Pipeline, id, change.into_fields()).await?;
        info!(
            event_name = "pipeline.status_updated",
            pipeline_id = %record.id,
            status = record.field_str("status").unwrap_or_default(),
            state = record.field_str("state").unwrap_or_default(),
            "pipeline status updated"
        );
        Ok(record)
    }

    fn check(&self, module: &str, change: &StatusChange) -> Result<(), RepositoryError> {
        if let Some(status) = change.status.as_deref() {
            if !self.resolver.validate_status(module, status) {
                warn!(
                    event_name = "pipeline.invalid_status",
                    module = module,
                    status = status,
                    "rejected unconfigured pipeline status"
                );
                return Err(RepositoryError::InvalidStatus {
                    module: module.to_string(),
                    value: status.to_string(),
                });
            }
        }
        if let Some(state) = change.state.as_deref() {
            if !self.resolver.validate_state(module, state) {
                warn!(
                    event_name = "pipeline.invalid_state",
                    module = module,
                    state = state,
                    "rejected unconfigured pipeline state"
                );
                return Err(RepositoryError::InvalidState {
                    module: module.to_string(),
                    value: state.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Absent keys are fine; a present key must hold a string.
fn string_field(
    payload: &Map<String, Value>,
    key: &'static str,
    module: &str,
) -> Result<Option<String>, RepositoryError> {
    match payload.get(key) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => {
            warn!(
                event_name = "pipeline.malformed_field",
                module = module,
                field = key,
                value = %other,
                "rejected non-string pipeline field"
            );
            let value = other.to_string();
            let module = module.to_string();
            Err(match key {
                "state" => RepositoryError::InvalidState { module, value },
                _ => RepositoryError::InvalidStatus { module, value },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ragdeck_core::flows::{FlowResolver, ModuleCatalog};
    use serde_json::{json, Map, Value};

    use crate::entity::EntityKind;
    use crate::repositories::pipeline::{PipelineService, StatusChange};
    use crate::repositories::{EntityStore, InMemoryEntityStore, RepositoryError};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn service() -> (Arc<InMemoryEntityStore>, PipelineService) {
        let store = Arc::new(InMemoryEntityStore::default());
        let resolver = FlowResolver::new(Arc::new(ModuleCatalog::builtin().expect("catalog")));
        let service = PipelineService::new(store.clone(), resolver);
        (store, service)
    }

    #[tokio::test]
    async fn configured_status_updates_are_persisted() {
        let (store, service) = service();
        let created = service
            .create("pipeline", object(json!({ "name": "support", "status": "draft" })))
            .await
            .expect("create");
        assert_eq!(created.field_str("module"), Some("pipeline"));

        let updated = service
            .update_status(
                &created.id,
                StatusChange { status: Some("active".into()), state: Some("running".into()) },
            )
            .await
            .expect("update");
        assert_eq!(updated.field_str("status"), Some("active"));
        assert_eq!(updated.field_str("state"), Some("running"));

        let stored = store.get(EntityKind::Pipeline, &created.id).await.expect("get");
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn unconfigured_status_is_rejected_before_writing() {
        let (store, service) = service();
        let created = service
            .create("pipeline", object(json!({ "name": "support", "status": "draft" })))
            .await
            .expect("create");

        let result = service
            .update_status(
                &created.id,
                StatusChange { status: Some("bogus".into()), state: None },
            )
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidStatus { ref value, .. }) if value == "bogus"
        ));

        let stored = store.get(EntityKind::Pipeline, &created.id).await.expect("get");
        assert_eq!(stored.field_str("status"), Some("draft"));
        assert_eq!(stored.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn states_are_checked_against_the_record_module() {
        let (_store, service) = service();
        let ingest = service
            .create("ingest", object(json!({ "name": "manuals", "state": "pending" })))
            .await
            .expect("create ingest pipeline");

        let result = service
            .update_status(&ingest.id, StatusChange { status: None, state: Some("running".into()) })
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidState { ref module, .. }) if module == "ingest"
        ));
    }

    #[tokio::test]
    async fn create_rejects_unconfigured_initial_status() {
        let (store, service) = service();
        let result =
            service.create("pipeline", object(json!({ "name": "x", "status": "queued" }))).await;

        assert!(matches!(result, Err(RepositoryError::InvalidStatus { .. })));
        assert!(store.list(EntityKind::Pipeline).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_rejects_non_string_status_and_state() {
        let (store, service) = service();

        let result = service
            .create("pipeline", object(json!({ "name": "x", "status": 42, "state": ["bogus"] })))
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidStatus { ref value, .. }) if value == "42"
        ));

        let result = service
            .create("pipeline", object(json!({ "name": "x", "status": "draft", "state": null })))
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidState { ref value, .. }) if value == "null"
        ));

        let result = service
            .create("pipeline", object(json!({ "name": "x", "state": { "phase": "idle" } })))
            .await;
        assert!(matches!(result, Err(RepositoryError::InvalidState { .. })));

        assert!(store.list(EntityKind::Pipeline).await.expect("list").is_empty());
    }
}
