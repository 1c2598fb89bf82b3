pub mod cell;
pub mod config;
pub mod constants;
pub mod drug;
pub mod efficacy;
pub mod error;
pub mod field;
pub mod grid;
pub mod rate;
pub mod rng;
pub mod splitting;
pub mod treatment;
pub mod virus;
pub mod world;

pub use cell::{Cell, HealthState};
pub use config::SimConfig;
pub use drug::{Drug, Pathway};
pub use efficacy::EfficacyCurve;
pub use error::{ConfigurationError, StateInvariantViolation};
pub use treatment::Treatment;
pub use world::{RunSummary, StateSnapshot, StepMetrics, World};
