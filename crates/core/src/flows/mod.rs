pub mod catalog;
pub mod resolver;

pub use catalog::{
    CatalogError, FlowDefinition, ModuleCatalog, ModuleDefinition, StatusConfig, StepDefinition,
};
pub use resolver::{FlowConfigError, FlowResolver};
