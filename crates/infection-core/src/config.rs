use crate::constants::{MAX_GRID_DIM, MAX_SPLITTING_SUBSTEPS, MAX_TOTAL_SITES};
use crate::drug::DrugSpec;
use crate::splitting::SplittingConfig;
use crate::treatment::TreatmentSpec;
use crate::virus::VirusKinetics;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialConditions {
    /// Probability that a grid site holds a cell.
    pub cell_density: f64,
    /// Number of randomly chosen target cells infected at start.
    pub infected_cells: usize,
    /// Sites infected at start, in addition to `infected_cells`.
    pub infected_positions: Vec<[usize; 2]>,
    /// Uniform virus concentration at start.
    pub virus_concentration: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            cell_density: 1.0,
            infected_cells: 10,
            infected_positions: Vec::new(),
            virus_concentration: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Number of sites along x.
    pub grid_width: usize,
    /// Number of sites along y.
    pub grid_height: usize,
    /// Length of one tick in model time.
    pub dt: f64,
    /// Virus released per infected cell per unit time.
    pub virus_production: f64,
    /// Virus diffusion coefficient (sites^2 per unit time).
    pub virus_diffusion_coefficient: f64,
    /// First-order virus clearance rate.
    pub virus_removal_rate: f64,
    /// Death rate of infected cells.
    pub cell_death_rate: f64,
    /// Infection rate of target cells per unit virus concentration.
    pub infection_rate: f64,
    /// How diffusion and reaction are composed each tick.
    pub splitting: SplittingConfig,
    pub initial: InitialConditions,
    pub drugs: Vec<DrugSpec>,
    /// Treatments active from the first tick.
    pub treatments: Vec<TreatmentSpec>,
    /// Evaluate cell transitions on the rayon pool. Results are identical either way.
    pub parallel_cells: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_width: 100,
            grid_height: 100,
            dt: 1.0,
            virus_production: 1.1e-6,
            virus_diffusion_coefficient: 0.2,
            virus_removal_rate: 1.67e-3,
            cell_death_rate: 7.02e-4,
            infection_rate: 1.01e-7,
            splitting: SplittingConfig::default(),
            initial: InitialConditions::default(),
            drugs: Vec::new(),
            treatments: Vec::new(),
            parallel_cells: true,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidGridSize => "grid_width and grid_height must be greater than 0";
    GridTooLarge { max_dim: usize, max_sites: usize } => "grid exceeds supported size (max {} per axis, {} sites)", max_dim, max_sites;
    InvalidDt => "dt must be positive and finite";
    InvalidVirusProduction => "virus_production must be positive and finite";
    InvalidVirusDiffusionCoefficient => "virus_diffusion_coefficient must be positive and finite";
    InvalidVirusRemovalRate => "virus_removal_rate must be positive and finite";
    DiffusionAmountNotFinite => "virus_diffusion_coefficient * dt must be finite";
    InvalidCellDeathRate => "cell_death_rate must be finite and non-negative";
    InvalidInfectionRate => "infection_rate must be finite and non-negative";
    InvalidSplittingSubsteps { max: usize } => "splitting.substeps must be within [1, {}]", max;
    InvalidCellDensity => "initial.cell_density must be finite and within [0,1]";
    InvalidInitialVirusConcentration => "initial.virus_concentration must be finite and non-negative";
    InfectedPositionOutOfBounds { x: usize, y: usize } => "initial.infected_positions entry ({}, {}) is outside the grid", x, y;
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_grid()?;
        self.validate_kinetics()?;
        self.validate_splitting()?;
        self.validate_initial()?;
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), SimConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(SimConfigError::InvalidGridSize);
        }
        let too_large = self.grid_width > MAX_GRID_DIM
            || self.grid_height > MAX_GRID_DIM
            || self
                .grid_width
                .checked_mul(self.grid_height)
                .map(|n| n > MAX_TOTAL_SITES)
                .unwrap_or(true);
        if too_large {
            return Err(SimConfigError::GridTooLarge {
                max_dim: MAX_GRID_DIM,
                max_sites: MAX_TOTAL_SITES,
            });
        }
        Ok(())
    }

    fn validate_kinetics(&self) -> Result<(), SimConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimConfigError::InvalidDt);
        }
        if !(self.virus_production.is_finite() && self.virus_production > 0.0) {
            return Err(SimConfigError::InvalidVirusProduction);
        }
        if !(self.virus_diffusion_coefficient.is_finite() && self.virus_diffusion_coefficient > 0.0)
        {
            return Err(SimConfigError::InvalidVirusDiffusionCoefficient);
        }
        if !(self.virus_diffusion_coefficient * self.dt).is_finite() {
            return Err(SimConfigError::DiffusionAmountNotFinite);
        }
        if !(self.virus_removal_rate.is_finite() && self.virus_removal_rate > 0.0) {
            return Err(SimConfigError::InvalidVirusRemovalRate);
        }
        if !(self.cell_death_rate.is_finite() && self.cell_death_rate >= 0.0) {
            return Err(SimConfigError::InvalidCellDeathRate);
        }
        if !(self.infection_rate.is_finite() && self.infection_rate >= 0.0) {
            return Err(SimConfigError::InvalidInfectionRate);
        }
        Ok(())
    }

    fn validate_splitting(&self) -> Result<(), SimConfigError> {
        if !(1..=MAX_SPLITTING_SUBSTEPS).contains(&self.splitting.substeps) {
            return Err(SimConfigError::InvalidSplittingSubsteps {
                max: MAX_SPLITTING_SUBSTEPS,
            });
        }
        Ok(())
    }

    fn validate_initial(&self) -> Result<(), SimConfigError> {
        let initial = &self.initial;
        if !(initial.cell_density.is_finite() && (0.0..=1.0).contains(&initial.cell_density)) {
            return Err(SimConfigError::InvalidCellDensity);
        }
        if !(initial.virus_concentration.is_finite() && initial.virus_concentration >= 0.0) {
            return Err(SimConfigError::InvalidInitialVirusConcentration);
        }
        if let Some(&[x, y]) = initial
            .infected_positions
            .iter()
            .find(|&&[x, y]| x >= self.grid_width || y >= self.grid_height)
        {
            return Err(SimConfigError::InfectedPositionOutOfBounds { x, y });
        }
        Ok(())
    }

    pub fn virus_kinetics(&self) -> VirusKinetics {
        VirusKinetics {
            production: self.virus_production,
            diffusion_coefficient: self.virus_diffusion_coefficient,
            removal_rate: self.virus_removal_rate,
        }
    }

    /// Area factor of the linear infection probability.
    pub fn grid_area(&self) -> f64 {
        (self.grid_width * self.grid_height) as f64
    }
}
