pub mod completion;
pub mod entity;
pub mod repositories;

pub use completion::PersistOnComplete;
pub use entity::{EntityKind, EntityRecord};
pub use repositories::pipeline::{StatusChange, DEFAULT_PIPELINE_MODULE};
pub use repositories::{
    EntityStore, InMemoryEntityStore, JsonDocumentStore, PipelineService, RepositoryError,
};
