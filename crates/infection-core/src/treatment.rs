use crate::drug::{Drug, Pathway};
use crate::error::ConfigurationError;
use crate::field::ConcentrationGrid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Local drug concentration carried by a treatment.
#[derive(Clone, Debug)]
pub enum Concentration {
    /// Same concentration at every grid site.
    Uniform(f64),
    /// Per-site concentration on the simulation grid.
    Field(ConcentrationGrid),
}

/// An active application of a drug.
///
/// The drug is shared and read-only; the concentration is owned by the
/// treatment and only written by whatever dosing process drives it.
#[derive(Clone, Debug)]
pub struct Treatment {
    drug: Arc<Drug>,
    concentration: Concentration,
}

impl Treatment {
    pub fn uniform(drug: Arc<Drug>, concentration: f64) -> Result<Self, ConfigurationError> {
        check_concentration(&drug, concentration)?;
        Ok(Self {
            drug,
            concentration: Concentration::Uniform(concentration),
        })
    }

    pub fn with_field(drug: Arc<Drug>, field: ConcentrationGrid) -> Self {
        Self {
            drug,
            concentration: Concentration::Field(field),
        }
    }

    pub fn drug(&self) -> &Drug {
        &self.drug
    }

    pub fn drug_handle(&self) -> &Arc<Drug> {
        &self.drug
    }

    pub fn concentration(&self) -> &Concentration {
        &self.concentration
    }

    /// Mutable access for external dosing.
    pub fn concentration_mut(&mut self) -> &mut Concentration {
        &mut self.concentration
    }

    pub fn set_uniform(&mut self, concentration: f64) -> Result<(), ConfigurationError> {
        check_concentration(&self.drug, concentration)?;
        self.concentration = Concentration::Uniform(concentration);
        Ok(())
    }

    pub fn concentration_at(&self, position: [usize; 2]) -> f64 {
        match &self.concentration {
            Concentration::Uniform(c) => *c,
            Concentration::Field(grid) => grid.get(position),
        }
    }

    /// Effect of this treatment on `pathway` at `position`.
    pub fn effect(&self, pathway: Pathway, position: [usize; 2]) -> f64 {
        self.drug
            .efficacy_for(pathway)
            .evaluate(self.concentration_at(position))
    }

    /// Grid dimensions of a field-backed concentration.
    pub fn field_dims(&self) -> Option<(usize, usize)> {
        match &self.concentration {
            Concentration::Uniform(_) => None,
            Concentration::Field(grid) => Some(grid.dims()),
        }
    }
}

fn check_concentration(drug: &Drug, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidTreatmentConcentration {
            drug: drug.name().to_string(),
            value,
        })
    }
}

/// Configuration schema for a uniform-concentration treatment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TreatmentSpec {
    /// Name of a drug declared in the same configuration.
    pub drug: String,
    #[serde(default)]
    pub concentration: f64,
}

impl TreatmentSpec {
    /// Resolve against the built drug list. Drug names need not be unique;
    /// the first match wins.
    pub fn resolve(&self, drugs: &[Arc<Drug>]) -> Result<Treatment, ConfigurationError> {
        let drug = drugs
            .iter()
            .find(|d| d.name() == self.drug)
            .ok_or_else(|| ConfigurationError::UnknownDrug(self.drug.clone()))?;
        Treatment::uniform(Arc::clone(drug), self.concentration)
    }
}
