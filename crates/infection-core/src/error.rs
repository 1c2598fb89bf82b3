use crate::cell::HealthState;
use crate::drug::Pathway;
use crate::efficacy::EfficacyParamError;
use std::{error::Error, fmt};

/// Fatal problems in drug/treatment definitions, surfaced at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    InvalidEfficacy {
        drug: String,
        pathway: Pathway,
        reason: EfficacyParamError,
    },
    UnknownPathway(String),
    UnknownDrug(String),
    InvalidTreatmentConcentration { drug: String, value: f64 },
    TreatmentFieldMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::InvalidEfficacy {
                drug,
                pathway,
                reason,
            } => write!(f, "drug `{drug}`, pathway `{pathway}`: {reason}"),
            ConfigurationError::UnknownPathway(name) => {
                write!(f, "unrecognized efficacy pathway `{name}`")
            }
            ConfigurationError::UnknownDrug(name) => {
                write!(f, "treatment references unknown drug `{name}`")
            }
            ConfigurationError::InvalidTreatmentConcentration { drug, value } => write!(
                f,
                "treatment concentration for `{drug}` ({value}) must be finite and non-negative"
            ),
            ConfigurationError::TreatmentFieldMismatch { expected, actual } => write!(
                f,
                "treatment field is {}x{} but the grid is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationError::InvalidEfficacy { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// A broken core invariant. Never recoverable; indicates a bug in the caller
/// or in the simulation itself.
#[derive(Debug, Clone, PartialEq)]
pub enum StateInvariantViolation {
    /// A transition check was requested for a cell whose state does not admit it.
    InvalidTransition {
        position: [usize; 2],
        state: HealthState,
    },
    /// A probability that cannot be compared against a uniform draw.
    InvalidProbability { position: [usize; 2], value: f64 },
    MissingCell { position: [usize; 2] },
    /// A field-backed treatment no longer matches the grid.
    TreatmentFieldMismatch {
        treatment: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl fmt::Display for StateInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateInvariantViolation::InvalidTransition { position, state } => write!(
                f,
                "cell at ({}, {}) in state {state:?} cannot take this transition",
                position[0], position[1]
            ),
            StateInvariantViolation::InvalidProbability { position, value } => write!(
                f,
                "transition probability {value} at ({}, {}) is not a valid probability",
                position[0], position[1]
            ),
            StateInvariantViolation::MissingCell { position } => {
                write!(f, "no cell at expected position ({}, {})", position[0], position[1])
            }
            StateInvariantViolation::TreatmentFieldMismatch {
                treatment,
                expected,
                actual,
            } => write!(
                f,
                "treatment {treatment} has a {}x{} field but the grid is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

impl Error for StateInvariantViolation {}
