pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod indicator;
pub mod wizard;

pub use domain::payload::{FormData, StepPayload};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    CatalogError, FlowConfigError, FlowResolver, ModuleCatalog, StatusConfig, StepDefinition,
};
pub use indicator::{IndicatorEntry, StepDisplay, StepIndicatorView};
pub use wizard::{
    CompletionError, CompletionHandler, NextOutcome, ValidationOutcome, Wizard, WizardError,
    WizardState,
};
