use std::sync::Arc;

use async_trait::async_trait;
use ragdeck_core::flows::FlowResolver;
use ragdeck_core::wizard::{CompletionError, CompletionHandler};
use ragdeck_core::FormData;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::entity::{EntityKind, EntityRecord};
use crate::repositories::{EntityStore, RepositoryError};

/// Completion step that stores the finished wizard as a single entity.
pub struct PersistOnComplete {
    store: Arc<dyn EntityStore>,
    kind: EntityKind,
    module: String,
    flow_type: String,
    status: Option<String>,
    state: Option<String>,
    created: Mutex<Vec<EntityRecord>>,
}

impl PersistOnComplete {
    pub fn new(
        store: Arc<dyn EntityStore>,
        kind: EntityKind,
        module: impl Into<String>,
        flow_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            kind,
            module: module.into(),
            flow_type: flow_type.into(),
            status: None,
            state: None,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Status and state stamped on the created entity. Both must be configured
    /// for the module.
    pub fn with_initial_status(
        mut self,
        resolver: &FlowResolver,
        status: Option<String>,
        state: Option<String>,
    ) -> Result<Self, RepositoryError> {
        if let Some(status) = status.as_deref() {
            if !resolver.validate_status(&self.module, status) {
                return Err(RepositoryError::InvalidStatus {
                    module: self.module.clone(),
                    value: status.to_string(),
                });
            }
        }
        if let Some(state) = state.as_deref() {
            if !resolver.validate_state(&self.module, state) {
                return Err(RepositoryError::InvalidState {
                    module: self.module.clone(),
                    value: state.to_string(),
                });
            }
        }
        self.status = status;
        self.state = state;
        Ok(self)
    }

    /// Records written by this handler, oldest first.
    pub async fn created(&self) -> Vec<EntityRecord> {
        self.created.lock().await.clone()
    }

    fn payload(&self, form_data: &FormData) -> Result<Map<String, Value>, CompletionError> {
        let steps = serde_json::to_value(form_data)
            .map_err(|error| CompletionError::Rejected(format!("form data: {error}")))?;

        let mut payload = Map::new();
        payload.insert("module".to_string(), Value::String(self.module.clone()));
        payload.insert("flowType".to_string(), Value::String(self.flow_type.clone()));
        payload.insert("steps".to_string(), steps);
        if let Some(name) = form_data.values().find_map(|payload| payload.display_name()) {
            payload.insert("name".to_string(), Value::String(name.to_string()));
        }
        if let Some(status) = &self.status {
            payload.insert("status".to_string(), Value::String(status.clone()));
        }
        if let Some(state) = &self.state {
            payload.insert("state".to_string(), Value::String(state.clone()));
        }
        Ok(payload)
    }
}

#[async_trait]
impl CompletionHandler for PersistOnComplete {
    async fn complete(&self, form_data: &FormData) -> Result<(), CompletionError> {
        let payload = self.payload(form_data)?;
        let record = self
            .store
            .create(self.kind, payload)
            .await
            .map_err(|error| CompletionError::Persistence(error.to_string()))?;

        info!(
            event_name = "wizard.entity_persisted",
            kind = %self.kind,
            entity_id = %record.id,
            module = %self.module,
            flow_type = %self.flow_type,
            "wizard result persisted"
        );
        self.created.lock().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ragdeck_core::domain::{BasicInfo, CollectionsSelection, ReviewConfirmation, StepPayload};
    use ragdeck_core::flows::{FlowResolver, ModuleCatalog};
    use ragdeck_core::wizard::{CompletionError, CompletionHandler, NextOutcome, Wizard};
    use ragdeck_core::FormData;
    use serde_json::{Map, Value};

    use crate::completion::PersistOnComplete;
    use crate::entity::{EntityKind, EntityRecord};
    use crate::repositories::{EntityStore, InMemoryEntityStore, RepositoryError};

    fn resolver() -> FlowResolver {
        FlowResolver::new(Arc::new(ModuleCatalog::builtin().expect("catalog")))
    }

    fn form() -> FormData {
        let mut data = FormData::new();
        data.insert(
            "basic".to_string(),
            StepPayload::Basic(BasicInfo { name: " Support bot ".to_string(), description: None }),
        );
        data.insert(
            "collections".to_string(),
            StepPayload::Collections(CollectionsSelection {
                collection_ids: vec!["c-1".to_string()],
            }),
        );
        data
    }

    #[tokio::test]
    async fn completion_creates_one_entity_with_module_metadata() {
        let store = Arc::new(InMemoryEntityStore::default());
        let handler = PersistOnComplete::new(store.clone(), EntityKind::Pipeline, "pipeline", "rag")
            .with_initial_status(&resolver(), Some("draft".into()), Some("idle".into()))
            .expect("configured status");

        handler.complete(&form()).await.expect("complete");

        let stored = store.list(EntityKind::Pipeline).await.expect("list");
        assert_eq!(stored.len(), 1);
        let record = &stored[0];
        assert_eq!(record.field_str("module"), Some("pipeline"));
        assert_eq!(record.field_str("flowType"), Some("rag"));
        assert_eq!(record.field_str("name"), Some("Support bot"));
        assert_eq!(record.field_str("status"), Some("draft"));
        assert_eq!(record.field_str("state"), Some("idle"));
        assert_eq!(record.fields["steps"]["collections"]["collection_ids"][0], "c-1");
        assert_eq!(handler.created().await, stored);
    }

    #[test]
    fn unconfigured_initial_status_is_rejected() {
        let store = Arc::new(InMemoryEntityStore::default());
        let result = PersistOnComplete::new(store, EntityKind::Job, "ingest", "document")
            .with_initial_status(&resolver(), Some("draft".into()), None);

        assert!(matches!(result, Err(RepositoryError::InvalidStatus { .. })));
    }

    struct FailingStore;

    #[async_trait]
    impl EntityStore for FailingStore {
        async fn create(
            &self,
            kind: EntityKind,
            _payload: Map<String, Value>,
        ) -> Result<EntityRecord, RepositoryError> {
            Err(RepositoryError::NotFound { kind, id: "unavailable".to_string() })
        }

        async fn get(&self, kind: EntityKind, id: &str) -> Result<EntityRecord, RepositoryError> {
            Err(RepositoryError::NotFound { kind, id: id.to_string() })
        }

        async fn list(&self, _kind: EntityKind) -> Result<Vec<EntityRecord>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn update(
            &self,
            kind: EntityKind,
            id: &str,
            _partial: Map<String, Value>,
        ) -> Result<EntityRecord, RepositoryError> {
            Err(RepositoryError::NotFound { kind, id: id.to_string() })
        }

        async fn delete(&self, _kind: EntityKind, _id: &str) -> Result<bool, RepositoryError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn store_failures_become_persistence_errors() {
        let handler =
            PersistOnComplete::new(Arc::new(FailingStore), EntityKind::Pipeline, "pipeline", "rag");

        let result = handler.complete(&form()).await;
        assert!(matches!(result, Err(CompletionError::Persistence(_))));
        assert!(handler.created().await.is_empty());
    }

    #[tokio::test]
    async fn mounted_wizard_persists_on_final_next() {
        let resolver = resolver();
        let store = Arc::new(InMemoryEntityStore::default());
        let handler =
            PersistOnComplete::new(store.clone(), EntityKind::Pipeline, "pipeline", "llm");
        let mut wizard = Wizard::mount(&resolver, "pipeline", "llm", form()).expect("mount");

        wizard
            .set_step_data(
                "llm",
                StepPayload::Custom(Map::from_iter([(
                    "model".to_string(),
                    Value::String("gpt".to_string()),
                )])),
            )
            .expect("set llm");
        wizard
            .set_step_data(
                "review",
                StepPayload::Review(ReviewConfirmation { confirmed: Some(true) }),
            )
            .expect("set review");

        let mut last = NextOutcome::SubmissionInFlight;
        for _ in 0..wizard.steps().len() {
            last = wizard.next(&handler).await.expect("next");
        }

        assert_eq!(last, NextOutcome::Completed);
        assert_eq!(store.list(EntityKind::Pipeline).await.expect("list").len(), 1);
        assert!(!wizard.is_submitting());
    }
}
