use crate::efficacy::{curve_from_spec, EfficacyCurve, EfficacySpec};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Biological pathways a drug can act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathway {
    VirusRemoval,
    Cytotoxicity,
    VirusProductionReduction,
    InfectionReduction,
}

/// How a pathway's effect compounds onto its base rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// `rate * (1 - effect)`
    Reduction,
    /// `rate * (1 + effect)`
    Amplification,
}

impl Pathway {
    pub const ALL: [Pathway; 4] = [
        Pathway::VirusRemoval,
        Pathway::Cytotoxicity,
        Pathway::VirusProductionReduction,
        Pathway::InfectionReduction,
    ];

    /// Canonical configuration key.
    pub fn key(self) -> &'static str {
        match self {
            Pathway::VirusRemoval => "virusRemoval",
            Pathway::Cytotoxicity => "cytotoxicity",
            Pathway::VirusProductionReduction => "virusProductionReduction",
            Pathway::InfectionReduction => "infectionReduction",
        }
    }

    /// Virus removal is grouped with the reduction-type efficacies in drug
    /// definitions, but its effect raises the removal rate.
    pub fn direction(self) -> Direction {
        match self {
            Pathway::InfectionReduction | Pathway::VirusProductionReduction => Direction::Reduction,
            Pathway::Cytotoxicity | Pathway::VirusRemoval => Direction::Amplification,
        }
    }

    fn snake_key(self) -> &'static str {
        match self {
            Pathway::VirusRemoval => "virus_removal",
            Pathway::Cytotoxicity => "cytotoxicity",
            Pathway::VirusProductionReduction => "virus_production_reduction",
            Pathway::InfectionReduction => "infection_reduction",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Pathway {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pathway::ALL
            .into_iter()
            .find(|p| p.key() == s || p.snake_key() == s)
            .ok_or_else(|| ConfigurationError::UnknownPathway(s.to_string()))
    }
}

/// A named bundle of one efficacy curve per pathway. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Drug {
    name: String,
    curves: [EfficacyCurve; 4],
}

impl Drug {
    /// Drug with no effect on any pathway.
    pub fn inert(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: [EfficacyCurve::NoEffect; 4],
        }
    }

    pub fn with_curve(mut self, pathway: Pathway, curve: EfficacyCurve) -> Self {
        self.curves[pathway.index()] = curve;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn efficacy_for(&self, pathway: Pathway) -> &EfficacyCurve {
        &self.curves[pathway.index()]
    }

    /// Lookup by configuration key; unknown names are a configuration error.
    pub fn efficacy_for_name(&self, pathway: &str) -> Result<&EfficacyCurve, ConfigurationError> {
        let pathway: Pathway = pathway.parse()?;
        Ok(self.efficacy_for(pathway))
    }

    /// True when at least one pathway carries a dose-response curve.
    pub fn is_active(&self) -> bool {
        self.curves.iter().any(|c| !c.is_no_effect())
    }
}

fn default_drug_name() -> String {
    "drug".to_string()
}

/// Configuration schema for a drug. An absent pathway key means no effect.
/// Unknown keys, including `molarMass`, are rejected.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DrugSpec {
    #[serde(default = "default_drug_name")]
    pub name: String,
    #[serde(default, alias = "virusRemoval", skip_serializing_if = "Option::is_none")]
    pub virus_removal: Option<EfficacySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cytotoxicity: Option<EfficacySpec>,
    #[serde(
        default,
        alias = "virusProductionReduction",
        skip_serializing_if = "Option::is_none"
    )]
    pub virus_production_reduction: Option<EfficacySpec>,
    #[serde(
        default,
        alias = "infectionReduction",
        skip_serializing_if = "Option::is_none"
    )]
    pub infection_reduction: Option<EfficacySpec>,
}

impl Default for DrugSpec {
    fn default() -> Self {
        Self {
            name: default_drug_name(),
            virus_removal: None,
            cytotoxicity: None,
            virus_production_reduction: None,
            infection_reduction: None,
        }
    }
}

impl DrugSpec {
    fn spec_for(&self, pathway: Pathway) -> Option<&EfficacySpec> {
        match pathway {
            Pathway::VirusRemoval => self.virus_removal.as_ref(),
            Pathway::Cytotoxicity => self.cytotoxicity.as_ref(),
            Pathway::VirusProductionReduction => self.virus_production_reduction.as_ref(),
            Pathway::InfectionReduction => self.infection_reduction.as_ref(),
        }
    }

    pub fn build(&self) -> Result<Drug, ConfigurationError> {
        let mut drug = Drug::inert(self.name.clone());
        for pathway in Pathway::ALL {
            let curve = curve_from_spec(self.spec_for(pathway)).map_err(|reason| {
                ConfigurationError::InvalidEfficacy {
                    drug: self.name.clone(),
                    pathway,
                    reason,
                }
            })?;
            drug = drug.with_curve(pathway, curve);
        }
        Ok(drug)
    }
}
