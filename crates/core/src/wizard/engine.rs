use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::payload::{FormData, StepPayload};
use crate::flows::catalog::StepDefinition;
use crate::flows::resolver::{FlowConfigError, FlowResolver};
use crate::indicator::{self, StepIndicatorView};
use crate::wizard::states::{reduce, WizardAction, WizardState, WizardTransitionError};
use crate::wizard::validation::{required_rule, FieldErrors, StepValidator, ValidationOutcome};

/// Action run once the last step is confirmed, typically a persistence call.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn complete(&self, form_data: &FormData) -> Result<(), CompletionError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion rejected: {0}")]
    Rejected(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error(transparent)]
    Transition(#[from] WizardTransitionError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextOutcome {
    /// Moved forward to `index`.
    Advanced { index: usize, step_id: String },
    /// Current step failed validation; errors were recorded in state.
    Blocked { step_id: String, errors: FieldErrors },
    /// Last step is valid and the caller may submit. Only returned by `advance`.
    ReadyToSubmit,
    /// Completion handler ran and succeeded. Only returned by `next`.
    Completed,
    /// A submission is already running; nothing was done.
    SubmissionInFlight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepChange {
    pub index: usize,
    pub step_id: String,
}

type StepListener = Box<dyn FnMut(&StepChange) + Send>;

/// One user's pass through a resolved step sequence.
///
/// All transitions go through [`reduce`]; the session adds validation, the
/// completion call and step-change notification on top. The visited-step gate on
/// [`Wizard::go_to_step`] is left to the caller.
pub struct Wizard {
    steps: Vec<StepDefinition>,
    state: WizardState,
    initial_data: FormData,
    validators: HashMap<String, StepValidator>,
    listener: Option<StepListener>,
}

impl Wizard {
    pub fn new(steps: Vec<StepDefinition>, initial_data: FormData) -> Self {
        let state = WizardState::initial(&steps, initial_data.clone());
        Self { steps, state, initial_data, validators: HashMap::new(), listener: None }
    }

    /// Resolves the flow up front so a missing configuration fails before any navigation.
    pub fn mount(
        resolver: &FlowResolver,
        module: &str,
        flow_type: &str,
        initial_data: FormData,
    ) -> Result<Self, FlowConfigError> {
        let steps = resolver.resolve_flow(module, flow_type)?;
        debug!(
            event_name = "wizard.mounted",
            module,
            flow_type,
            step_count = steps.len(),
            "wizard mounted"
        );
        Ok(Self::new(steps, initial_data))
    }

    pub fn with_validator(mut self, step_id: impl Into<String>, validator: StepValidator) -> Self {
        self.validators.insert(step_id.into(), validator);
        self
    }

    pub fn with_step_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&StepChange) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step_index(&self) -> usize {
        self.state.current_step_index
    }

    pub fn current_step(&self) -> Option<&StepDefinition> {
        self.steps.get(self.state.current_step_index)
    }

    pub fn form_data(&self) -> &FormData {
        &self.state.form_data
    }

    pub fn errors(&self) -> &BTreeMap<String, FieldErrors> {
        &self.state.errors
    }

    pub fn visited(&self) -> &[String] {
        &self.state.visited
    }

    pub fn is_submitting(&self) -> bool {
        self.state.is_submitting
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed
    }

    pub fn is_first_step(&self) -> bool {
        !self.steps.is_empty() && self.state.current_step_index == 0
    }

    pub fn is_last_step(&self) -> bool {
        !self.steps.is_empty() && self.state.current_step_index + 1 == self.steps.len()
    }

    pub fn indicator(&self) -> StepIndicatorView {
        indicator::project(&self.steps, self.state.current_step_index, &self.state.visited)
    }

    pub fn set_step_data(
        &mut self,
        step_id: impl Into<String>,
        data: StepPayload,
    ) -> Result<(), WizardTransitionError> {
        self.apply(WizardAction::SetStepData { step_id: step_id.into(), data })
    }

    pub fn go_to_step(&mut self, index: usize) -> Result<(), WizardTransitionError> {
        self.apply(WizardAction::GoToStep { index })?;
        self.notify();
        Ok(())
    }

    /// Steps back one page, staying put on the first one. Returns the new index.
    pub fn back(&mut self) -> Result<usize, WizardTransitionError> {
        let before = self.state.current_step_index;
        self.apply(WizardAction::Retreat)?;
        if self.state.current_step_index != before {
            self.notify();
        }
        Ok(self.state.current_step_index)
    }

    pub fn validate_current_step(&self) -> Result<ValidationOutcome, WizardTransitionError> {
        let step = self.current_step().ok_or(WizardTransitionError::EmptyFlow)?;
        let payload = self.state.form_data.get(&step.id);
        let outcome = match self.validators.get(&step.id) {
            Some(validator) => validator(payload),
            None => required_rule(step, payload),
        };
        Ok(outcome)
    }

    /// Synchronous half of [`Wizard::next`]: validates and moves forward, but
    /// stops at [`NextOutcome::ReadyToSubmit`] on the last step.
    pub fn advance(&mut self) -> Result<NextOutcome, WizardTransitionError> {
        if self.state.is_completed {
            return Err(WizardTransitionError::AlreadyCompleted);
        }
        if self.state.is_submitting {
            return Ok(NextOutcome::SubmissionInFlight);
        }

        let outcome = self.validate_current_step()?;
        let step_id = match self.current_step() {
            Some(step) => step.id.clone(),
            None => return Err(WizardTransitionError::EmptyFlow),
        };

        if !outcome.valid {
            debug!(
                event_name = "wizard.step_blocked",
                step_id = step_id.as_str(),
                error_count = outcome.errors.len(),
                "step validation failed"
            );
            self.apply(WizardAction::RecordErrors {
                step_id: step_id.clone(),
                errors: outcome.errors.clone(),
            })?;
            return Ok(NextOutcome::Blocked { step_id, errors: outcome.errors });
        }

        self.apply(WizardAction::ClearErrors { step_id })?;

        if self.is_last_step() {
            return Ok(NextOutcome::ReadyToSubmit);
        }

        self.apply(WizardAction::Advance)?;
        let change = self.notify();
        Ok(NextOutcome::Advanced { index: change.index, step_id: change.step_id })
    }

    /// Marks the wizard as submitting and hands back the data to submit.
    /// Returns `None` unless the wizard sits on a valid last step with no
    /// submission running and no completion recorded.
    pub fn begin_submit(&mut self) -> Option<FormData> {
        if self.state.is_submitting || self.state.is_completed || !self.is_last_step() {
            return None;
        }
        if !self.validate_current_step().ok()?.valid {
            return None;
        }
        self.state = reduce(&self.state, &self.steps, WizardAction::BeginSubmit).ok()?;
        Some(self.state.form_data.clone())
    }

    /// Ends a submission started by [`Wizard::begin_submit`]. Success marks the
    /// wizard completed; failure only clears the submitting flag so the user can
    /// retry. Without a running submission the state is left alone.
    pub fn finish_submit(
        &mut self,
        result: Result<(), CompletionError>,
    ) -> Result<(), CompletionError> {
        if !self.state.is_submitting {
            return result;
        }
        let action =
            if result.is_ok() { WizardAction::MarkCompleted } else { WizardAction::EndSubmit };
        if let Ok(state) = reduce(&self.state, &self.steps, action) {
            self.state = state;
        }

        match &result {
            Ok(()) => info!(
                event_name = "wizard.completed",
                step_count = self.steps.len(),
                "wizard completion succeeded"
            ),
            Err(error) => warn!(
                event_name = "wizard.completion_failed",
                error = %error,
                "wizard completion failed; state kept for retry"
            ),
        }

        result
    }

    /// Validates the current step and either moves forward or, on the last
    /// step, runs `handler` exactly once. A completed wizard rejects further
    /// calls with [`WizardTransitionError::AlreadyCompleted`] until reset.
    pub async fn next<H>(&mut self, handler: &H) -> Result<NextOutcome, WizardError>
    where
        H: CompletionHandler + ?Sized,
    {
        match self.advance()? {
            NextOutcome::ReadyToSubmit => {
                let Some(form_data) = self.begin_submit() else {
                    return Ok(NextOutcome::SubmissionInFlight);
                };
                let result = handler.complete(&form_data).await;
                self.finish_submit(result)?;
                Ok(NextOutcome::Completed)
            }
            other => Ok(other),
        }
    }

    pub fn reset(&mut self) {
        self.state = WizardState::initial(&self.steps, self.initial_data.clone());
    }

    fn apply(&mut self, action: WizardAction) -> Result<(), WizardTransitionError> {
        self.state = reduce(&self.state, &self.steps, action)?;
        Ok(())
    }

    fn notify(&mut self) -> StepChange {
        let index = self.state.current_step_index;
        let step_id = self.steps.get(index).map(|step| step.id.clone()).unwrap_or_default();
        let change = StepChange { index, step_id };
        if let Some(listener) = self.listener.as_mut() {
            listener(&change);
        }
        change
    }
}

impl fmt::Debug for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wizard")
            .field("steps", &self.steps)
            .field("state", &self.state)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
