use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::entity::{EntityKind, EntityRecord};

use super::{find, insert_new, merge_into, remove, EntityStore, RepositoryError};

#[derive(Default)]
pub struct InMemoryEntityStore {
    records: RwLock<HashMap<EntityKind, Vec<EntityRecord>>>,
}

#[async_trait::async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create(
        &self,
        kind: EntityKind,
        payload: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError> {
        let mut records = self.records.write().await;
        Ok(insert_new(records.entry(kind).or_default(), payload))
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<EntityRecord, RepositoryError> {
        let records = self.records.read().await;
        find(records.get(&kind).map(Vec::as_slice).unwrap_or_default(), kind, id)
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&kind).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError> {
        let mut records = self.records.write().await;
        merge_into(records.entry(kind).or_default(), kind, id, partial)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(&kind).map(|records| remove(records, id)).unwrap_or(false))
    }
}
