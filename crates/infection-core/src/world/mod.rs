pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::config::{SimConfig, SimConfigError};
use crate::constants::INIT_SEED_OFFSET;
use crate::drug::Drug;
use crate::error::{ConfigurationError, StateInvariantViolation};
use crate::grid::{CellCounts, CellGrid};
use crate::rng::create_rng;
use crate::treatment::Treatment;
use crate::virus::VirusField;
use std::sync::Arc;
use std::{error::Error, fmt};

/// The simulation: a grid of cells, the virus field and the active treatments.
pub struct World {
    pub(crate) grid: CellGrid,
    pub(crate) virus: VirusField,
    pub(crate) drugs: Vec<Arc<Drug>>,
    pub(crate) treatments: Vec<Treatment>,
    pub(crate) config: SimConfig,
    pub(crate) step_index: usize,
    pub(crate) infections_last_step: usize,
    pub(crate) deaths_last_step: usize,
    pub(crate) saturated_last_step: usize,
    pub(crate) total_infections: usize,
    pub(crate) total_deaths: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    Configuration(ConfigurationError),
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::Configuration(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl From<ConfigurationError> for WorldInitError {
    fn from(err: ConfigurationError) -> Self {
        WorldInitError::Configuration(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            WorldInitError::Configuration(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
    Step(StateInvariantViolation),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
            ExperimentError::Step(e) => write!(f, "simulation step failed: {e}"),
        }
    }
}

impl From<StateInvariantViolation> for ExperimentError {
    fn from(err: StateInvariantViolation) -> Self {
        ExperimentError::Step(err)
    }
}

impl Error for ExperimentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExperimentError::Step(e) => Some(e),
            _ => None,
        }
    }
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;

        let drugs = config
            .drugs
            .iter()
            .map(|spec| spec.build().map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let treatments = config
            .treatments
            .iter()
            .map(|spec| spec.resolve(&drugs))
            .collect::<Result<Vec<_>, _>>()?;
        for treatment in &treatments {
            if !treatment.drug().is_active() {
                log::warn!(
                    "treatment with drug `{}` has no effect on any pathway",
                    treatment.drug().name()
                );
            }
        }

        let mut init_rng = create_rng(config.seed.wrapping_add(INIT_SEED_OFFSET));
        let grid = CellGrid::populate(
            config.grid_width,
            config.grid_height,
            config.initial.cell_density,
            &config.initial.infected_positions,
            config.initial.infected_cells,
            &mut init_rng,
        );
        let virus = VirusField::new(
            config.grid_width,
            config.grid_height,
            config.initial.virus_concentration,
            config.virus_kinetics(),
        );

        let counts = grid.counts();
        log::info!(
            "initialized {}x{} grid: {} target, {} infected, {} empty, {} treatment(s)",
            config.grid_width,
            config.grid_height,
            counts.target,
            counts.infected,
            counts.empty,
            treatments.len()
        );

        Ok(Self {
            grid,
            virus,
            drugs,
            treatments,
            config,
            step_index: 0,
            infections_last_step: 0,
            deaths_last_step: 0,
            saturated_last_step: 0,
            total_infections: 0,
            total_deaths: 0,
        })
    }

    /// Build a world around an explicit grid instead of populating one from
    /// `config.initial`. The grid must match the configured dimensions.
    pub fn with_grid(config: SimConfig, grid: CellGrid) -> Result<Self, WorldInitError> {
        if grid.dims() != (config.grid_width, config.grid_height) {
            return Err(WorldInitError::Config(SimConfigError::InvalidGridSize));
        }
        let mut world = Self::try_new(SimConfig {
            initial: crate::config::InitialConditions {
                infected_cells: 0,
                infected_positions: Vec::new(),
                ..config.initial.clone()
            },
            ..config
        })?;
        world.grid = grid;
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace rate constants and scheduling between ticks. Grid dimensions,
    /// drugs and treatments are unaffected.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        config.validate()?;
        if (config.grid_width, config.grid_height) != self.grid.dims() {
            return Err(WorldInitError::Config(SimConfigError::InvalidGridSize));
        }
        self.virus.set_kinetics(config.virus_kinetics());
        self.config = config;
        Ok(())
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn virus(&self) -> &VirusField {
        &self.virus
    }

    pub fn virus_mut(&mut self) -> &mut VirusField {
        &mut self.virus
    }

    pub fn drugs(&self) -> &[Arc<Drug>] {
        &self.drugs
    }

    pub fn drug(&self, name: &str) -> Option<&Arc<Drug>> {
        self.drugs.iter().find(|d| d.name() == name)
    }

    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Mutable access for external dosing between ticks.
    pub fn treatments_mut(&mut self) -> &mut [Treatment] {
        &mut self.treatments
    }

    /// Activate a treatment from the next tick on.
    pub fn add_treatment(&mut self, treatment: Treatment) -> Result<(), ConfigurationError> {
        if let Some(actual) = treatment.field_dims() {
            let expected = self.grid.dims();
            if actual != expected {
                return Err(ConfigurationError::TreatmentFieldMismatch { expected, actual });
            }
        }
        self.treatments.push(treatment);
        Ok(())
    }

    pub fn remove_treatment(&mut self, index: usize) -> Option<Treatment> {
        (index < self.treatments.len()).then(|| self.treatments.remove(index))
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn counts(&self) -> CellCounts {
        self.grid.counts()
    }

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats {
            counts: self.grid.counts(),
            total_infections: self.total_infections,
            total_deaths: self.total_deaths,
        }
    }

    /// Read-only copy of cell states and virus concentrations.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            step: self.step_index,
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.state_codes(),
            virus: self.virus.concentration().data().to_vec(),
        }
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_snapshots(steps, sample_every, &[])
    }

    /// Run an experiment like `try_run_experiment`, but also capture full
    /// state snapshots at the specified steps.
    pub fn try_run_experiment_with_snapshots(
        &mut self,
        steps: usize,
        sample_every: usize,
        snapshot_steps: &[usize],
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let infections_before = self.total_infections;
        let deaths_before = self.total_deaths;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(snapshot_steps.len());
        for step in 1..=steps {
            self.step()?;
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics());
            }
            if snapshot_steps.contains(&step) {
                snapshots.push(self.snapshot());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_counts: self.grid.counts(),
            samples,
            total_infections: self.total_infections - infections_before,
            total_deaths: self.total_deaths - deaths_before,
            snapshots,
        })
    }
}
