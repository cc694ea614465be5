pub mod payload;

pub use payload::{
    BasicInfo, ChunkingStrategy, CollectionsSelection, DocumentSource, FormData, LlmSettings,
    MemoryConfig, ProcessingConfig, PromptTemplate, RetrievalConfig, ReviewConfirmation,
    SearchType, StepPayload,
};
