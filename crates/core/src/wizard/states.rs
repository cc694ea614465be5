use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::payload::{FormData, StepPayload};
use crate::flows::catalog::StepDefinition;
use crate::wizard::validation::FieldErrors;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step_index: usize,
    pub form_data: FormData,
    pub errors: BTreeMap<String, FieldErrors>,
    /// Step ids in the order they were first reached.
    pub visited: Vec<String>,
    pub is_submitting: bool,
    /// Set once a completion succeeded. Only `Reset` is accepted afterwards.
    #[serde(default)]
    pub is_completed: bool,
}

impl WizardState {
    pub fn initial(steps: &[StepDefinition], initial_data: FormData) -> Self {
        Self {
            current_step_index: 0,
            form_data: initial_data,
            errors: BTreeMap::new(),
            visited: steps.first().map(|step| vec![step.id.clone()]).unwrap_or_default(),
            is_submitting: false,
            is_completed: false,
        }
    }

    pub fn is_visited(&self, step_id: &str) -> bool {
        self.visited.iter().any(|visited| visited == step_id)
    }

    fn mark_visited(&mut self, step_id: &str) {
        if !self.is_visited(step_id) {
            self.visited.push(step_id.to_string());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WizardAction {
    SetStepData { step_id: String, data: StepPayload },
    GoToStep { index: usize },
    Advance,
    Retreat,
    RecordErrors { step_id: String, errors: FieldErrors },
    ClearErrors { step_id: String },
    BeginSubmit,
    EndSubmit,
    MarkCompleted,
    Reset { initial_data: FormData },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardTransitionError {
    #[error("wizard has no steps to navigate")]
    EmptyFlow,
    #[error("step index {index} is out of range for {len} steps")]
    StepOutOfRange { index: usize, len: usize },
    #[error("step `{step_id}` is not part of this wizard")]
    UnknownStep { step_id: String },
    #[error("wizard already completed; reset it to start again")]
    AlreadyCompleted,
}

/// Applies one action to a wizard state. Rejected actions leave `state` untouched.
pub fn reduce(
    state: &WizardState,
    steps: &[StepDefinition],
    action: WizardAction,
) -> Result<WizardState, WizardTransitionError> {
    if state.is_completed && !matches!(action, WizardAction::Reset { .. }) {
        return Err(WizardTransitionError::AlreadyCompleted);
    }
    let mut next = state.clone();

    match action {
        WizardAction::SetStepData { step_id, data } => {
            ensure_known(steps, &step_id)?;
            next.form_data.insert(step_id, data);
        }
        WizardAction::GoToStep { index } => {
            let step = step_at(steps, index)?;
            next.current_step_index = index;
            next.mark_visited(&step.id);
        }
        WizardAction::Advance => {
            let index = state.current_step_index + 1;
            let step = step_at(steps, index)?;
            next.current_step_index = index;
            next.mark_visited(&step.id);
        }
        WizardAction::Retreat => {
            if steps.is_empty() {
                return Err(WizardTransitionError::EmptyFlow);
            }
            next.current_step_index = state.current_step_index.saturating_sub(1);
        }
        WizardAction::RecordErrors { step_id, errors } => {
            ensure_known(steps, &step_id)?;
            next.errors.insert(step_id, errors);
        }
        WizardAction::ClearErrors { step_id } => {
            next.errors.remove(&step_id);
        }
        WizardAction::BeginSubmit => next.is_submitting = true,
        WizardAction::EndSubmit => next.is_submitting = false,
        WizardAction::MarkCompleted => {
            next.is_submitting = false;
            next.is_completed = true;
        }
        WizardAction::Reset { initial_data } => next = WizardState::initial(steps, initial_data),
    }

    Ok(next)
}

fn step_at(
    steps: &[StepDefinition],
    index: usize,
) -> Result<&StepDefinition, WizardTransitionError> {
    if steps.is_empty() {
        return Err(WizardTransitionError::EmptyFlow);
    }
    steps
        .get(index)
        .ok_or(WizardTransitionError::StepOutOfRange { index, len: steps.len() })
}

fn ensure_known(steps: &[StepDefinition], step_id: &str) -> Result<(), WizardTransitionError> {
    if steps.iter().any(|step| step.id == step_id) {
        Ok(())
    } else {
        Err(WizardTransitionError::UnknownStep { step_id: step_id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::payload::{BasicInfo, FormData, StepPayload};
    use crate::flows::catalog::StepDefinition;
    use crate::wizard::validation::FieldErrors;

    use super::{reduce, WizardAction, WizardState, WizardTransitionError};

    fn steps() -> Vec<StepDefinition> {
        vec![
            StepDefinition::new("a", "A", 1).required(),
            StepDefinition::new("b", "B", 2),
            StepDefinition::new("c", "C", 3).required(),
        ]
    }

    fn basic(name: &str) -> StepPayload {
        StepPayload::Basic(BasicInfo { name: name.to_string(), description: None })
    }

    #[test]
    fn initial_state_visits_first_step_only() {
        let state = WizardState::initial(&steps(), FormData::new());

        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.visited, vec!["a".to_string()]);
        assert!(state.errors.is_empty());
        assert!(!state.is_submitting);

        let empty = WizardState::initial(&[], FormData::new());
        assert!(empty.visited.is_empty());
    }

    #[test]
    fn advance_and_retreat_stay_in_bounds() {
        let steps = steps();
        let mut state = WizardState::initial(&steps, FormData::new());

        state = reduce(&state, &steps, WizardAction::Advance).expect("a -> b");
        state = reduce(&state, &steps, WizardAction::Advance).expect("b -> c");
        assert_eq!(state.current_step_index, 2);

        let error = reduce(&state, &steps, WizardAction::Advance).expect_err("past last step");
        assert_eq!(error, WizardTransitionError::StepOutOfRange { index: 3, len: 3 });

        for _ in 0..5 {
            state = reduce(&state, &steps, WizardAction::Retreat).expect("retreat");
        }
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.visited, vec!["a", "b", "c"]);
    }

    #[test]
    fn retreat_at_first_step_is_a_no_op() {
        let steps = steps();
        let before = WizardState::initial(&steps, FormData::new());
        let after = reduce(&before, &steps, WizardAction::Retreat).expect("no-op");
        assert_eq!(before, after);
    }

    #[test]
    fn go_to_step_rejects_out_of_range_index() {
        let steps = steps();
        let state = WizardState::initial(&steps, FormData::new());

        let error =
            reduce(&state, &steps, WizardAction::GoToStep { index: 7 }).expect_err("out of range");
        assert_eq!(error, WizardTransitionError::StepOutOfRange { index: 7, len: 3 });

        let jumped = reduce(&state, &steps, WizardAction::GoToStep { index: 2 }).expect("jump");
        assert_eq!(jumped.current_step_index, 2);
        assert!(jumped.is_visited("c"));
        assert!(!jumped.is_visited("b"));
    }

    #[test]
    fn empty_flow_rejects_navigation() {
        let state = WizardState::initial(&[], FormData::new());

        let actions =
            [WizardAction::Advance, WizardAction::Retreat, WizardAction::GoToStep { index: 0 }];
        for action in actions {
            assert_eq!(reduce(&state, &[], action), Err(WizardTransitionError::EmptyFlow));
        }
    }

    #[test]
    fn step_data_and_errors_are_keyed_by_known_step_ids() {
        let steps = steps();
        let state = WizardState::initial(&steps, FormData::new());

        let with_data = reduce(
            &state,
            &steps,
            WizardAction::SetStepData { step_id: "a".to_string(), data: basic("x") },
        )
        .expect("set data");
        assert_eq!(with_data.form_data.get("a"), Some(&basic("x")));

        let replaced = reduce(
            &with_data,
            &steps,
            WizardAction::SetStepData { step_id: "a".to_string(), data: basic("y") },
        )
        .expect("replace data");
        assert_eq!(replaced.form_data.get("a"), Some(&basic("y")));

        let unknown = reduce(
            &state,
            &steps,
            WizardAction::SetStepData { step_id: "zzz".to_string(), data: basic("x") },
        );
        assert!(matches!(unknown, Err(WizardTransitionError::UnknownStep { .. })));

        let errors = FieldErrors::from([("name".to_string(), "required".to_string())]);
        let with_errors = reduce(
            &replaced,
            &steps,
            WizardAction::RecordErrors { step_id: "a".to_string(), errors: errors.clone() },
        )
        .expect("record errors");
        assert_eq!(with_errors.errors.get("a"), Some(&errors));

        let cleared = reduce(
            &with_errors,
            &steps,
            WizardAction::ClearErrors { step_id: "a".to_string() },
        )
        .expect("clear errors");
        assert!(cleared.errors.is_empty());
        assert_eq!(cleared.form_data.get("a"), Some(&basic("y")));
    }

    #[test]
    fn reset_restores_initial_state() {
        let steps = steps();
        let seed = FormData::from([("a".to_string(), basic("seed"))]);
        let initial = WizardState::initial(&steps, seed.clone());

        let mut state = reduce(&initial, &steps, WizardAction::Advance).expect("advance");
        state = reduce(&state, &steps, WizardAction::BeginSubmit).expect("submit");
        state = reduce(&state, &steps, WizardAction::Reset { initial_data: seed }).expect("reset");

        assert_eq!(state, initial);
    }

    #[test]
    fn completed_state_only_accepts_reset() {
        let steps = steps();
        let initial = WizardState::initial(&steps, FormData::new());
        let mut state = reduce(&initial, &steps, WizardAction::BeginSubmit).expect("submit");
        state = reduce(&state, &steps, WizardAction::MarkCompleted).expect("complete");
        assert!(state.is_completed);
        assert!(!state.is_submitting);

        let actions = [
            WizardAction::Advance,
            WizardAction::Retreat,
            WizardAction::GoToStep { index: 0 },
            WizardAction::BeginSubmit,
            WizardAction::MarkCompleted,
            WizardAction::SetStepData { step_id: "a".to_string(), data: basic("late") },
        ];
        for action in actions {
            assert_eq!(
                reduce(&state, &steps, action),
                Err(WizardTransitionError::AlreadyCompleted)
            );
        }

        let reset = reduce(&state, &steps, WizardAction::Reset { initial_data: FormData::new() })
            .expect("reset");
        assert_eq!(reset, initial);
    }
}
