use crate::drug::Pathway;
use crate::error::StateInvariantViolation;
use crate::field::ConcentrationGrid;
use crate::rate::RateModifier;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    #[default]
    Target,
    Infected,
    Dead,
}

impl HealthState {
    /// Snapshot code; empty sites use -1.
    pub fn code(self) -> i8 {
        match self {
            HealthState::Target => 0,
            HealthState::Infected => 1,
            HealthState::Dead => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellEvent {
    Infected,
    Died,
}

/// Result of one transition check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub event: Option<CellEvent>,
    /// The raw infection probability exceeded 1 and was clamped.
    pub probability_saturated: bool,
}

/// Everything a cell reads during a transition check. Built once per tick from
/// the pre-tick field and treatments and shared by all cells.
#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    pub virus: &'a ConcentrationGrid,
    pub rates: RateModifier<'a>,
    pub infection_rate: f64,
    pub cell_death_rate: f64,
    pub dt: f64,
    /// Grid area entering the linear infection probability.
    pub grid_area: f64,
}

/// A grid-resident agent. The position is fixed at placement and the state is
/// only written by the cell's own transition methods.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    position: [usize; 2],
    state: HealthState,
}

impl Cell {
    pub fn new(position: [usize; 2], state: HealthState) -> Self {
        Self { position, state }
    }

    pub fn position(&self) -> [usize; 2] {
        self.position
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Linear infection probability `dt * area * rate * virus`. Not bounded
    /// by 1; callers clamp.
    pub fn infection_probability(&self, ctx: &TransitionContext<'_>) -> f64 {
        let virus = ctx.virus.get(self.position);
        let rate = ctx
            .rates
            .apply(ctx.infection_rate, Pathway::InfectionReduction, self.position);
        ctx.dt * ctx.grid_area * rate * virus
    }

    /// `1 - exp(-rate * dt)` with the death rate amplified by cytotoxicity.
    pub fn death_probability(&self, ctx: &TransitionContext<'_>) -> f64 {
        let rate = ctx
            .rates
            .apply(ctx.cell_death_rate, Pathway::Cytotoxicity, self.position);
        -(-rate * ctx.dt).exp_m1()
    }

    /// Target -> Infected if `draw` falls below the infection probability.
    pub fn try_infect(
        &mut self,
        ctx: &TransitionContext<'_>,
        draw: f64,
    ) -> Result<TransitionOutcome, StateInvariantViolation> {
        if self.state != HealthState::Target {
            return Err(self.invalid_transition());
        }
        let raw = self.infection_probability(ctx);
        let probability = self.checked_probability(raw)?;
        let mut outcome = TransitionOutcome {
            event: None,
            probability_saturated: raw > 1.0,
        };
        if outcome.probability_saturated {
            log::debug!(
                "infection probability {raw} at {:?} clamped to 1",
                self.position
            );
        }
        if draw < probability {
            self.state = HealthState::Infected;
            outcome.event = Some(CellEvent::Infected);
        }
        Ok(outcome)
    }

    /// Infected -> Dead if `draw` falls below the death probability.
    pub fn try_die(
        &mut self,
        ctx: &TransitionContext<'_>,
        draw: f64,
    ) -> Result<TransitionOutcome, StateInvariantViolation> {
        if self.state != HealthState::Infected {
            return Err(self.invalid_transition());
        }
        let probability = self.checked_probability(self.death_probability(ctx))?;
        let mut outcome = TransitionOutcome::default();
        if draw < probability {
            self.state = HealthState::Dead;
            outcome.event = Some(CellEvent::Died);
        }
        Ok(outcome)
    }

    /// The single transition check for this tick, chosen by the current state.
    pub fn stochastic_state_change(
        &mut self,
        ctx: &TransitionContext<'_>,
        draw: f64,
    ) -> Result<TransitionOutcome, StateInvariantViolation> {
        match self.state {
            HealthState::Target => self.try_infect(ctx, draw),
            HealthState::Infected => self.try_die(ctx, draw),
            HealthState::Dead => Ok(TransitionOutcome::default()),
        }
    }

    fn checked_probability(&self, value: f64) -> Result<f64, StateInvariantViolation> {
        if value.is_nan() || value < 0.0 {
            return Err(StateInvariantViolation::InvalidProbability {
                position: self.position,
                value,
            });
        }
        Ok(value.min(1.0))
    }

    fn invalid_transition(&self) -> StateInvariantViolation {
        StateInvariantViolation::InvalidTransition {
            position: self.position,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drug::Drug;
    use crate::efficacy::EfficacyCurve;
    use crate::treatment::Treatment;
    use std::sync::Arc;

    fn context<'a>(
        virus: &'a ConcentrationGrid,
        treatments: &'a [Treatment],
    ) -> TransitionContext<'a> {
        TransitionContext {
            virus,
            rates: RateModifier::new(treatments),
            infection_rate: 0.01,
            cell_death_rate: 0.1,
            dt: 1.0,
            grid_area: 4.0,
        }
    }

    #[test]
    fn zero_virus_never_infects() {
        let virus = ConcentrationGrid::new(2, 2, 0.0);
        let ctx = context(&virus, &[]);
        let mut cell = Cell::new([1, 1], HealthState::Target);
        assert_eq!(cell.infection_probability(&ctx), 0.0);
        for draw in [0.0, 1e-300, 0.5, 0.999_999] {
            let outcome = cell.try_infect(&ctx, draw).unwrap();
            assert_eq!(outcome.event, None);
            assert_eq!(cell.state(), HealthState::Target);
        }
    }

    #[test]
    fn infection_probability_is_linear_in_virus() {
        let mut virus = ConcentrationGrid::new(2, 2, 0.0);
        virus.set([0, 1], 3.0);
        let ctx = context(&virus, &[]);
        let cell = Cell::new([0, 1], HealthState::Target);
        // 1.0 * 4.0 * 0.01 * 3.0
        assert!((cell.infection_probability(&ctx) - 0.12).abs() < 1e-15);
    }

    #[test]
    fn death_probability_matches_closed_form() {
        let virus = ConcentrationGrid::new(1, 1, 0.0);
        let ctx = context(&virus, &[]);
        let cell = Cell::new([0, 0], HealthState::Infected);
        let expected = 1.0 - (-0.1f64).exp();
        assert!((cell.death_probability(&ctx) - expected).abs() < 1e-15);
        assert!((cell.death_probability(&ctx) - 0.095_162_581_964_040_43).abs() < 1e-15);
    }

    #[test]
    fn cytotoxic_treatment_raises_death_probability() {
        let virus = ConcentrationGrid::new(1, 1, 0.0);
        let drug = Drug::inert("tox").with_curve(
            Pathway::Cytotoxicity,
            EfficacyCurve::dose_response(0.5, 1.0, 1.0).unwrap(),
        );
        let treatments = [Treatment::uniform(Arc::new(drug), 1.0).unwrap()];
        let ctx = context(&virus, &treatments);
        let cell = Cell::new([0, 0], HealthState::Infected);
        let expected = 1.0 - (-0.1f64 * 1.25).exp();
        assert!((cell.death_probability(&ctx) - expected).abs() < 1e-15);
    }

    #[test]
    fn saturated_probability_is_clamped_and_flagged() {
        let virus = ConcentrationGrid::new(1, 1, 1000.0);
        let ctx = context(&virus, &[]);
        let mut cell = Cell::new([0, 0], HealthState::Target);
        assert!(cell.infection_probability(&ctx) > 1.0);
        let outcome = cell.try_infect(&ctx, 0.999_999).unwrap();
        assert!(outcome.probability_saturated);
        assert_eq!(outcome.event, Some(CellEvent::Infected));
    }

    #[test]
    fn negative_probability_is_an_invariant_violation() {
        let virus = ConcentrationGrid::new(1, 1, -1.0);
        let ctx = context(&virus, &[]);
        let mut cell = Cell::new([0, 0], HealthState::Target);
        assert!(matches!(
            cell.try_infect(&ctx, 0.5),
            Err(StateInvariantViolation::InvalidProbability { .. })
        ));
    }

    #[test]
    fn dead_cells_never_transition() {
        let virus = ConcentrationGrid::new(1, 1, 1000.0);
        let ctx = context(&virus, &[]);
        let mut cell = Cell::new([0, 0], HealthState::Dead);
        for draw in [0.0, 0.5] {
            assert_eq!(
                cell.stochastic_state_change(&ctx, draw).unwrap(),
                TransitionOutcome::default()
            );
        }
        assert!(matches!(
            cell.try_infect(&ctx, 0.0),
            Err(StateInvariantViolation::InvalidTransition {
                state: HealthState::Dead,
                ..
            })
        ));
        assert!(cell.try_die(&ctx, 0.0).is_err());
        assert_eq!(cell.state(), HealthState::Dead);
    }

    #[test]
    fn target_cannot_skip_to_dead() {
        let virus = ConcentrationGrid::new(1, 1, 0.0);
        let ctx = context(&virus, &[]);
        let mut cell = Cell::new([0, 0], HealthState::Target);
        assert!(cell.try_die(&ctx, 0.0).is_err());
        assert_eq!(cell.state(), HealthState::Target);
    }

    #[test]
    fn one_check_per_call_follows_the_linear_chain() {
        let virus = ConcentrationGrid::new(1, 1, 1000.0);
        let ctx = TransitionContext {
            cell_death_rate: 1000.0,
            ..context(&virus, &[])
        };
        let mut cell = Cell::new([0, 0], HealthState::Target);
        let first = cell.stochastic_state_change(&ctx, 0.0).unwrap();
        assert_eq!(first.event, Some(CellEvent::Infected));
        assert_eq!(cell.state(), HealthState::Infected);
        let second = cell.stochastic_state_change(&ctx, 0.0).unwrap();
        assert_eq!(second.event, Some(CellEvent::Died));
        assert_eq!(cell.state(), HealthState::Dead);
    }
}
