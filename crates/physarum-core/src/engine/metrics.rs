use super::Engine;
use crate::field::TrailField;
use serde::{Deserialize, Serialize};

/// Wall-clock cost of each phase of one [`Engine::step`].
#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    pub spawn_us: u64,
    pub agent_pass_us: u64,
    pub field_update_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub agent_count: usize,
    /// Agents reset to the origin during this step.
    pub corner_resets: usize,
    pub lit_cells: usize,
    pub saturated_cells: usize,
    pub trail_mean: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub final_agent_count: usize,
    #[serde(default)]
    pub total_corner_resets: usize,
    pub samples: Vec<StepMetrics>,
}

/// Owned copy of the trail field, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<u8>,
}

impl From<&TrailField> for FieldSnapshot {
    fn from(field: &TrailField) -> Self {
        Self {
            width: field.width(),
            height: field.height(),
            cells: field.as_slice().to_vec(),
        }
    }
}

impl Engine {
    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let cells = (self.field.width() * self.field.height()) as f64;
        StepMetrics {
            step,
            agent_count: self.population.count(),
            corner_resets: self.corner_resets_last_step,
            lit_cells: self.field.lit_cells(),
            saturated_cells: self.field.saturated_cells(),
            trail_mean: self.field.total() as f64 / cells,
        }
    }
}
