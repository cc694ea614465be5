use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use ragdeck_core::errors::{ApplicationError, DomainError};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::{EntityKind, EntityRecord};

pub mod json;
pub mod memory;
pub mod pipeline;

pub use json::JsonDocumentStore;
pub use memory::InMemoryEntityStore;
pub use pipeline::PipelineService;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("storage io error on `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not decode `{path}`: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not encode {kind} document: {source}")]
    Encode { kind: EntityKind, source: serde_json::Error },
    #[error("status `{value}` is not configured for module `{module}`")]
    InvalidStatus { module: String, value: String },
    #[error("state `{value}` is not configured for module `{module}`")]
    InvalidState { module: String, value: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { kind, id } => {
                Self::Domain(DomainError::EntityNotFound { kind: kind.to_string(), id })
            }
            RepositoryError::InvalidStatus { module, value } => {
                Self::Domain(DomainError::InvalidEnumValue { module, field: "status", value })
            }
            RepositoryError::InvalidState { module, value } => {
                Self::Domain(DomainError::InvalidEnumValue { module, field: "state", value })
            }
            error @ (RepositoryError::Io { .. }
            | RepositoryError::Decode { .. }
            | RepositoryError::Encode { .. }) => Self::Persistence(error.to_string()),
        }
    }
}

/// CRUD over flat per-type entity collections. Ids and timestamps are always
/// assigned by the store.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(
        &self,
        kind: EntityKind,
        payload: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError>;

    async fn get(&self, kind: EntityKind, id: &str) -> Result<EntityRecord, RepositoryError>;

    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, RepositoryError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepositoryError>;
}

pub(crate) fn insert_new(
    records: &mut Vec<EntityRecord>,
    payload: Map<String, Value>,
) -> EntityRecord {
    let record = EntityRecord::new(payload, Utc::now());
    records.push(record.clone());
    record
}

pub(crate) fn find(
    records: &[EntityRecord],
    kind: EntityKind,
    id: &str,
) -> Result<EntityRecord, RepositoryError> {
    records
        .iter()
        .find(|record| record.id == id)
        .cloned()
        .ok_or_else(|| RepositoryError::NotFound { kind, id: id.to_string() })
}

pub(crate) fn merge_into(
    records: &mut [EntityRecord],
    kind: EntityKind,
    id: &str,
    partial: Map<String, Value>,
) -> Result<EntityRecord, RepositoryError> {
    let record = records
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or_else(|| RepositoryError::NotFound { kind, id: id.to_string() })?;
    record.merge(partial, Utc::now());
    Ok(record.clone())
}

pub(crate) fn remove(records: &mut Vec<EntityRecord>, id: &str) -> bool {
    let before = records.len();
    records.retain(|record| record.id != id);
    records.len() != before
}
