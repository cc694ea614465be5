use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated wizard input keyed by step id.
pub type FormData = BTreeMap<String, StepPayload>;

/// Step-specific form payload.
///
/// Steps without a dedicated shape use `Custom`, which carries an arbitrary JSON
/// object. The wizard treats every variant as opaque apart from `is_empty`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPayload {
    Basic(BasicInfo),
    Collections(CollectionsSelection),
    Retrieval(RetrievalConfig),
    Memory(MemoryConfig),
    Llm(LlmSettings),
    Prompt(PromptTemplate),
    Source(DocumentSource),
    Processing(ProcessingConfig),
    Review(ReviewConfirmation),
    Custom(Map<String, Value>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsSelection {
    #[serde(default)]
    pub collection_ids: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Semantic,
    Keyword,
    Hybrid,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Fixed,
    Sentence,
    Recursive,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfirmation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
}

impl StepPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Collections(_) => "collections",
            Self::Retrieval(_) => "retrieval",
            Self::Memory(_) => "memory",
            Self::Llm(_) => "llm",
            Self::Prompt(_) => "prompt",
            Self::Source(_) => "source",
            Self::Processing(_) => "processing",
            Self::Review(_) => "review",
            Self::Custom(_) => "custom",
        }
    }

    /// True when the payload carries no user input at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Basic(info) => {
                info.name.trim().is_empty() && blank(info.description.as_deref())
            }
            Self::Collections(selection) => selection.collection_ids.is_empty(),
            Self::Retrieval(config) => {
                config.search_type.is_none()
                    && config.top_k.is_none()
                    && config.similarity_threshold.is_none()
                    && config.rerank.is_none()
            }
            Self::Memory(config) => config.enabled.is_none() && config.window.is_none(),
            Self::Llm(settings) => {
                blank(settings.provider.as_deref())
                    && blank(settings.model.as_deref())
                    && settings.temperature.is_none()
                    && settings.max_tokens.is_none()
            }
            Self::Prompt(prompt) => {
                blank(prompt.system_prompt.as_deref()) && blank(prompt.template.as_deref())
            }
            Self::Source(source) => source.files.is_empty() && blank(source.url.as_deref()),
            Self::Processing(config) => {
                config.chunking.is_none()
                    && config.chunk_size.is_none()
                    && config.chunk_overlap.is_none()
            }
            Self::Review(review) => review.confirmed.is_none(),
            Self::Custom(fields) => fields.is_empty(),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Basic(info) if !info.name.trim().is_empty() => Some(info.name.trim()),
            _ => None,
        }
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map(|value| value.trim().is_empty()).unwrap_or(true)
}
