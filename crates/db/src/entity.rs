use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Keys owned by the store; callers cannot set them through payloads.
pub const RESERVED_KEYS: [&str; 3] = ["id", "createdAt", "updatedAt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Pipeline,
    Job,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Collection, Self::Pipeline, Self::Job];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Pipeline => "pipeline",
            Self::Job => "job",
        }
    }

    /// Key of the array inside the entity type's document.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Collection => "collections",
            Self::Pipeline => "pipelines",
            Self::Job => "jobs",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "collection" | "collections" => Ok(Self::Collection),
            "pipeline" | "pipelines" => Ok(Self::Pipeline),
            "job" | "jobs" => Ok(Self::Job),
            other => {
                Err(format!("unknown entity kind `{other}` (expected collection|pipeline|job)"))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityRecord {
    pub fn new(payload: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            fields: strip_reserved(payload),
        }
    }

    /// Shallow merge of `partial` into the stored fields.
    pub fn merge(&mut self, partial: Map<String, Value>, now: DateTime<Utc>) {
        self.fields.extend(strip_reserved(partial));
        self.updated_at = now;
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

fn strip_reserved(mut payload: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_KEYS {
        payload.remove(key);
    }
    payload
}
