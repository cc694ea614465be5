use serde::{Deserialize, Serialize};

use crate::flows::catalog::StepDefinition;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDisplay {
    Completed,
    Active,
    Upcoming,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub display: StepDisplay,
    /// Visited steps stay clickable even when they sit after the active one.
    pub clickable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepIndicatorView {
    pub entries: Vec<IndicatorEntry>,
    pub percent: f64,
}

/// Display model for a progress header. Tolerates an empty sequence and an index
/// past the end.
pub fn project(
    steps: &[StepDefinition],
    current_index: usize,
    visited: &[String],
) -> StepIndicatorView {
    let entries = steps
        .iter()
        .enumerate()
        .map(|(index, step)| IndicatorEntry {
            index,
            id: step.id.clone(),
            title: step.title.clone(),
            display: match index.cmp(&current_index) {
                std::cmp::Ordering::Less => StepDisplay::Completed,
                std::cmp::Ordering::Equal => StepDisplay::Active,
                std::cmp::Ordering::Greater => StepDisplay::Upcoming,
            },
            clickable: visited.iter().any(|id| *id == step.id),
        })
        .collect();

    StepIndicatorView { entries, percent: percent(current_index, steps.len()) }
}

fn percent(current_index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (current_index as f64 + 1.0) / total as f64 * 100.0;
    raw.clamp(0.0, 100.0)
}
