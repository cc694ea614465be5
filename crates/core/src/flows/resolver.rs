use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::flows::catalog::{
    FlowDefinition, ModuleCatalog, ModuleDefinition, StatusConfig, StepDefinition,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowConfigError {
    #[error("module `{module}` is not configured")]
    ModuleNotFound { module: String },
    #[error("flow `{flow_type}` is not configured for module `{module}`")]
    FlowNotFound { module: String, flow_type: String },
}

/// Resolves declared flows into the step sequences wizards navigate.
///
/// The catalog is injected at construction and never mutated afterwards, so a
/// resolver can be cloned freely across wizard sessions.
#[derive(Clone, Debug)]
pub struct FlowResolver {
    catalog: Arc<ModuleCatalog>,
}

impl FlowResolver {
    pub fn new(catalog: Arc<ModuleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn modules(&self) -> Vec<&str> {
        self.catalog.modules.keys().map(String::as_str).collect()
    }

    pub fn flow_types(&self, module: &str) -> Result<Vec<&str>, FlowConfigError> {
        Ok(self.module(module)?.flows.keys().map(String::as_str).collect())
    }

    /// Enabled steps only, ascending by `order`. Equal orders keep declaration order.
    pub fn resolve_flow(
        &self,
        module: &str,
        flow_type: &str,
    ) -> Result<Vec<StepDefinition>, FlowConfigError> {
        let flow = self.flow(module, flow_type)?;
        let mut steps: Vec<StepDefinition> =
            flow.steps.iter().filter(|step| step.enabled).cloned().collect();
        steps.sort_by_key(|step| step.order);
        Ok(steps)
    }

    pub fn resolve_all_steps(
        &self,
        module: &str,
        flow_type: &str,
    ) -> Result<Vec<StepDefinition>, FlowConfigError> {
        let flow = self.flow(module, flow_type)?;
        let mut steps = flow.steps.clone();
        steps.sort_by_key(|step| step.order);
        Ok(steps)
    }

    pub fn statuses(
        &self,
        module: &str,
    ) -> Result<&BTreeMap<String, StatusConfig>, FlowConfigError> {
        Ok(&self.module(module)?.statuses)
    }

    pub fn states(&self, module: &str) -> Result<&BTreeMap<String, String>, FlowConfigError> {
        Ok(&self.module(module)?.states)
    }

    pub fn validate_status(&self, module: &str, status: &str) -> bool {
        self.catalog
            .modules
            .get(module)
            .map(|definition| definition.statuses.contains_key(status))
            .unwrap_or(false)
    }

    pub fn validate_state(&self, module: &str, state: &str) -> bool {
        self.catalog
            .modules
            .get(module)
            .map(|definition| definition.states.contains_key(state))
            .unwrap_or(false)
    }

    pub fn next_step(
        &self,
        module: &str,
        flow_type: &str,
        current_step_id: &str,
    ) -> Result<Option<StepDefinition>, FlowConfigError> {
        let steps = self.resolve_flow(module, flow_type)?;
        let next = position(&steps, current_step_id)
            .and_then(|index| steps.get(index + 1))
            .cloned();
        Ok(next)
    }

    pub fn previous_step(
        &self,
        module: &str,
        flow_type: &str,
        current_step_id: &str,
    ) -> Result<Option<StepDefinition>, FlowConfigError> {
        let steps = self.resolve_flow(module, flow_type)?;
        let previous = position(&steps, current_step_id)
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| steps.get(index))
            .cloned();
        Ok(previous)
    }

    pub fn is_first_step(
        &self,
        module: &str,
        flow_type: &str,
        step_id: &str,
    ) -> Result<bool, FlowConfigError> {
        let steps = self.resolve_flow(module, flow_type)?;
        Ok(steps.first().is_some_and(|step| step.id == step_id))
    }

    pub fn is_last_step(
        &self,
        module: &str,
        flow_type: &str,
        step_id: &str,
    ) -> Result<bool, FlowConfigError> {
        let steps = self.resolve_flow(module, flow_type)?;
        Ok(steps.last().is_some_and(|step| step.id == step_id))
    }

    fn module(&self, module: &str) -> Result<&ModuleDefinition, FlowConfigError> {
        self.catalog
            .modules
            .get(module)
            .ok_or_else(|| FlowConfigError::ModuleNotFound { module: module.to_string() })
    }

    fn flow(&self, module: &str, flow_type: &str) -> Result<&FlowDefinition, FlowConfigError> {
        self.module(module)?.flows.get(flow_type).ok_or_else(|| FlowConfigError::FlowNotFound {
            module: module.to_string(),
            flow_type: flow_type.to_string(),
        })
    }
}

fn position(steps: &[StepDefinition], step_id: &str) -> Option<usize> {
    steps.iter().position(|step| step.id == step_id)
}
