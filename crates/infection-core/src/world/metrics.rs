use super::World;
use crate::grid::CellCounts;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub cell_phase_us: u64,
    pub field_phase_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub target_count: usize,
    pub infected_count: usize,
    pub dead_count: usize,
    pub empty_sites: usize,
    pub infections: usize,
    pub deaths: usize,
    /// Infection checks whose raw probability exceeded 1.
    pub saturated_infection_checks: usize,
    pub virus_total: f64,
    pub virus_max: f64,
    pub virus_mean: f64,
    /// Fraction of occupied sites that are infected or dead.
    pub attack_fraction: f64,
}

/// Read-only view of a single tick for visualization consumers.
///
/// `cells` holds -1 for an empty site, 0 target, 1 infected, 2 dead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub step: usize,
    pub width: usize,
    pub height: usize,
    pub cells: Vec<i8>,
    pub virus: Vec<f64>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_counts: CellCounts,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_infections: usize,
    #[serde(default)]
    pub total_deaths: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<StateSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub counts: CellCounts,
    pub total_infections: usize,
    pub total_deaths: usize,
}

impl World {
    pub fn collect_step_metrics(&self) -> StepMetrics {
        let counts = self.grid.counts();
        let field = self.virus.concentration();
        let virus_total = field.total();
        let occupied = counts.occupied();
        StepMetrics {
            step: self.step_index,
            target_count: counts.target,
            infected_count: counts.infected,
            dead_count: counts.dead,
            empty_sites: counts.empty,
            infections: self.infections_last_step,
            deaths: self.deaths_last_step,
            saturated_infection_checks: self.saturated_last_step,
            virus_total,
            virus_max: field.max(),
            virus_mean: if field.is_empty() {
                0.0
            } else {
                virus_total / field.len() as f64
            },
            attack_fraction: if occupied > 0 {
                (counts.infected + counts.dead) as f64 / occupied as f64
            } else {
                0.0
            },
        }
    }
}
