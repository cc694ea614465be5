use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::payload::StepPayload;
use crate::flows::catalog::StepDefinition;

/// Field name -> message.
pub type FieldErrors = BTreeMap<String, String>;

/// Field key used when a whole step, rather than one field, is invalid.
pub const STEP_FIELD: &str = "step";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: FieldErrors,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self { valid: true, errors: FieldErrors::new() }
    }

    /// An invalid outcome always carries at least one message.
    pub fn invalid(mut errors: FieldErrors) -> Self {
        if errors.is_empty() {
            errors.insert(STEP_FIELD.to_string(), "This step is not complete".to_string());
        }
        Self { valid: false, errors }
    }

    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::invalid(FieldErrors::from([(field.into(), message.into())]))
    }
}

/// Per-step validator. Takes precedence over the required/non-empty rule.
pub type StepValidator = Arc<dyn Fn(Option<&StepPayload>) -> ValidationOutcome + Send + Sync>;

pub fn validator<F>(check: F) -> StepValidator
where
    F: Fn(Option<&StepPayload>) -> ValidationOutcome + Send + Sync + 'static,
{
    Arc::new(check)
}

pub fn required_rule(step: &StepDefinition, payload: Option<&StepPayload>) -> ValidationOutcome {
    if !step.required {
        return ValidationOutcome::valid();
    }

    match payload {
        Some(payload) if !payload.is_empty() => ValidationOutcome::valid(),
        _ => ValidationOutcome::field_error(STEP_FIELD, format!("{} is required", step.title)),
    }
}

/// Review steps pass only once the user explicitly confirmed.
pub fn require_confirmation() -> StepValidator {
    validator(|payload| match payload {
        Some(StepPayload::Review(review)) if review.confirmed == Some(true) => {
            ValidationOutcome::valid()
        }
        _ => ValidationOutcome::field_error("confirmed", "Confirm the configuration to continue"),
    })
}
