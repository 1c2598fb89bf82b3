use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Dose-response of a single biological pathway to a local drug concentration.
///
/// Returns a dimensionless effect in `[0, 1)`. A drug that does not act on a
/// pathway carries `NoEffect` for it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum EfficacyCurve {
    #[default]
    NoEffect,
    /// Hill sigmoid `max_effect * c^n / (c^n + ec50^n)`.
    DoseResponse {
        max_effect: f64,
        ec50: f64,
        steepness: f64,
    },
}

impl EfficacyCurve {
    /// Build a dose-response curve, rejecting parameters outside the curve's domain.
    pub fn dose_response(
        max_effect: f64,
        ec50: f64,
        steepness: f64,
    ) -> Result<Self, EfficacyParamError> {
        if !(max_effect.is_finite() && (0.0..1.0).contains(&max_effect)) {
            return Err(EfficacyParamError::InvalidMaxEffect(max_effect));
        }
        if !(ec50.is_finite() && ec50 > 0.0) {
            return Err(EfficacyParamError::InvalidEc50(ec50));
        }
        if !(steepness.is_finite() && steepness > 0.0) {
            return Err(EfficacyParamError::InvalidSteepness(steepness));
        }
        Ok(EfficacyCurve::DoseResponse {
            max_effect,
            ec50,
            steepness,
        })
    }

    pub fn evaluate(&self, concentration: f64) -> f64 {
        match *self {
            EfficacyCurve::NoEffect => 0.0,
            EfficacyCurve::DoseResponse {
                max_effect,
                ec50,
                steepness,
            } => {
                if concentration <= 0.0 {
                    return 0.0;
                }
                // Written as 1 / (1 + (ec50/c)^n) so that huge concentrations
                // saturate instead of overflowing c^n to infinity.
                let ratio = (ec50 / concentration).powf(steepness);
                max_effect / (1.0 + ratio)
            }
        }
    }

    pub fn is_no_effect(&self) -> bool {
        matches!(self, EfficacyCurve::NoEffect)
    }
}

/// Configuration schema for one pathway's dose-response curve.
///
/// Fields are optional at the serde level so that a present pathway key with
/// a missing parameter is reported instead of silently becoming `NoEffect`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EfficacySpec {
    #[serde(alias = "maxEffect", alias = "emax", alias = "Emax")]
    pub max_effect: Option<f64>,
    #[serde(alias = "EC50", alias = "IC50", alias = "ic50")]
    pub ec50: Option<f64>,
    #[serde(alias = "hill", alias = "hillCoefficient", alias = "n")]
    pub steepness: Option<f64>,
}

impl EfficacySpec {
    pub fn new(max_effect: f64, ec50: f64, steepness: f64) -> Self {
        Self {
            max_effect: Some(max_effect),
            ec50: Some(ec50),
            steepness: Some(steepness),
        }
    }

    pub fn build(&self) -> Result<EfficacyCurve, EfficacyParamError> {
        let max_effect = self
            .max_effect
            .ok_or(EfficacyParamError::Missing("max_effect"))?;
        let ec50 = self.ec50.ok_or(EfficacyParamError::Missing("ec50"))?;
        let steepness = self
            .steepness
            .ok_or(EfficacyParamError::Missing("steepness"))?;
        EfficacyCurve::dose_response(max_effect, ec50, steepness)
    }
}

/// Build the curve for an optional pathway entry: absent means no effect.
pub fn curve_from_spec(spec: Option<&EfficacySpec>) -> Result<EfficacyCurve, EfficacyParamError> {
    match spec {
        Some(spec) => spec.build(),
        None => Ok(EfficacyCurve::NoEffect),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EfficacyParamError {
    Missing(&'static str),
    InvalidMaxEffect(f64),
    InvalidEc50(f64),
    InvalidSteepness(f64),
}

impl fmt::Display for EfficacyParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EfficacyParamError::Missing(field) => write!(f, "missing required field `{field}`"),
            EfficacyParamError::InvalidMaxEffect(v) => {
                write!(f, "max_effect ({v}) must be finite and within [0,1)")
            }
            EfficacyParamError::InvalidEc50(v) => {
                write!(f, "ec50 ({v}) must be positive and finite")
            }
            EfficacyParamError::InvalidSteepness(v) => {
                write!(f, "steepness ({v}) must be positive and finite")
            }
        }
    }
}

impl Error for EfficacyParamError {}
