use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::entity::{EntityKind, EntityRecord};

use super::{find, insert_new, merge_into, remove, EntityStore, RepositoryError};

/// One JSON document per entity type under `root`, shaped as
/// `{ "<plural>": [ ...records ] }`. Writes go through a temp file and a rename.
pub struct JsonDocumentStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDocumentStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_lock: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, kind: EntityKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.plural()))
    }

    async fn read_all(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, RepositoryError> {
        let path = self.document_path(kind);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(RepositoryError::Io { path, source }),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut document: Map<String, Value> = serde_json::from_str(&raw)
            .map_err(|source| RepositoryError::Decode { path: path.clone(), source })?;
        match document.remove(kind.plural()) {
            Some(records) => serde_json::from_value(records)
                .map_err(|source| RepositoryError::Decode { path, source }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_all(
        &self,
        kind: EntityKind,
        records: &[EntityRecord],
    ) -> Result<(), RepositoryError> {
        let encoded = serde_json::to_value(records)
            .map_err(|source| RepositoryError::Encode { kind, source })?;
        let mut document = Map::new();
        document.insert(kind.plural().to_string(), encoded);
        let body = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|source| RepositoryError::Encode { kind, source })?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| RepositoryError::Io { path: self.root.clone(), source })?;

        let path = self.document_path(kind);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, body)
            .await
            .map_err(|source| RepositoryError::Io { path: staging.clone(), source })?;
        fs::rename(&staging, &path)
            .await
            .map_err(|source| RepositoryError::Io { path: path.clone(), source })?;

        debug!(
            event_name = "store.document_written",
            kind = %kind,
            records = records.len(),
            path = %path.display(),
            "entity document written"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntityStore for JsonDocumentStore {
    async fn create(
        &self,
        kind: EntityKind,
        payload: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all(kind).await?;
        let record = insert_new(&mut records, payload);
        self.write_all(kind, &records).await?;
        Ok(record)
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<EntityRecord, RepositoryError> {
        let records = self.read_all(kind).await?;
        find(&records, kind, id)
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, RepositoryError> {
        self.read_all(kind).await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<EntityRecord, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all(kind).await?;
        let record = merge_into(&mut records, kind, id, partial)?;
        self.write_all(kind, &records).await?;
        Ok(record)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all(kind).await?;
        if !remove(&mut records, id) {
            return Ok(false);
        }
        self.write_all(kind, &records).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    use crate::entity::EntityKind;
    use crate::repositories::{EntityStore, JsonDocumentStore, RepositoryError};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn missing_documents_read_as_empty() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = JsonDocumentStore::open(temp_dir.path().join("data"));

        assert!(store.list(EntityKind::Pipeline).await.expect("list").is_empty());
        assert!(!store.document_path(EntityKind::Pipeline).exists());
    }

    #[tokio::test]
    async fn records_survive_reopening_the_store() {
        let temp_dir = TempDir::new().expect("temp dir");
        let created = {
            let store = JsonDocumentStore::open(temp_dir.path());
            store
                .create(
                    EntityKind::Pipeline,
                    object(json!({ "name": "support", "status": "draft" })),
                )
                .await
                .expect("create")
        };

        let reopened = JsonDocumentStore::open(temp_dir.path());
        let found = reopened.get(EntityKind::Pipeline, &created.id).await.expect("get");
        assert_eq!(found, created);

        let raw = std::fs::read_to_string(reopened.document_path(EntityKind::Pipeline))
            .expect("read document");
        let document: Value = serde_json::from_str(&raw).expect("parse document");
        assert_eq!(document["pipelines"][0]["id"], created.id.as_str());
        assert_eq!(document["pipelines"][0]["name"], "support");
        assert!(!temp_dir.path().join("pipelines.json.tmp").exists());
    }

    #[tokio::test]
    async fn update_and_delete_rewrite_the_document() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = JsonDocumentStore::open(temp_dir.path());
        let first = store
            .create(EntityKind::Collection, object(json!({ "name": "handbook" })))
            .await
            .expect("create first");
        let second = store
            .create(EntityKind::Collection, object(json!({ "name": "faq" })))
            .await
            .expect("create second");

        let updated = store
            .update(EntityKind::Collection, &first.id, object(json!({ "name": "policies" })))
            .await
            .expect("update");
        assert_eq!(updated.field_str("name"), Some("policies"));

        assert!(store.delete(EntityKind::Collection, &second.id).await.expect("delete"));
        let remaining = store.list(EntityKind::Collection).await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].field_str("name"), Some("policies"));

        let missing = store.update(EntityKind::Collection, &second.id, Map::new()).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn corrupt_documents_surface_decode_errors() {
        let temp_dir = TempDir::new().expect("temp dir");
        std::fs::write(temp_dir.path().join("jobs.json"), "{ not json").expect("write");
        let store = JsonDocumentStore::open(temp_dir.path());

        let result = store.list(EntityKind::Job).await;
        assert!(matches!(result, Err(RepositoryError::Decode { .. })));
    }
}
