pub mod engine;
pub mod states;
pub mod validation;

pub use engine::{
    CompletionError, CompletionHandler, NextOutcome, StepChange, Wizard, WizardError,
};
pub use states::{reduce, WizardAction, WizardState, WizardTransitionError};
pub use validation::{
    require_confirmation, required_rule, validator, FieldErrors, StepValidator,
    ValidationOutcome, STEP_FIELD,
};
