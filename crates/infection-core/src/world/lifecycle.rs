use super::metrics::StepTimings;
use super::World;
use crate::cell::{Cell, CellEvent, TransitionContext, TransitionOutcome};
use crate::error::StateInvariantViolation;
use crate::grid::CellGrid;
use crate::rate::RateModifier;
use crate::rng::CellDraws;
use crate::splitting::SplitOperators;
use crate::virus::VirusField;
use rayon::prelude::*;
use std::time::Instant;

/// Field-phase view handed to the splitting scheduler.
struct FieldOperators<'a> {
    virus: &'a mut VirusField,
    grid: &'a CellGrid,
    rates: RateModifier<'a>,
}

impl SplitOperators for FieldOperators<'_> {
    fn diffuse(&mut self, duration: f64) {
        self.virus.diffuse(duration);
    }

    fn react(&mut self, duration: f64) {
        self.virus
            .decay_and_production(duration, self.grid, &self.rates);
    }
}

impl World {
    /// Run one transition check per cell against the pre-tick field and
    /// treatments. Each cell writes only its own state.
    fn step_cell_phase(&mut self) -> Result<(), StateInvariantViolation> {
        let ctx = TransitionContext {
            virus: self.virus.concentration(),
            rates: RateModifier::new(&self.treatments),
            infection_rate: self.config.infection_rate,
            cell_death_rate: self.config.cell_death_rate,
            dt: self.config.dt,
            grid_area: self.config.grid_area(),
        };
        let draws = CellDraws::new(self.config.seed, self.step_index as u64);

        let evaluate = |(idx, site): (usize, &mut Option<Cell>)| match site {
            Some(cell) => cell.stochastic_state_change(&ctx, draws.uniform(idx)),
            None => Ok(TransitionOutcome::default()),
        };
        let sites = self.grid.sites_mut();
        let outcomes: Result<Vec<TransitionOutcome>, StateInvariantViolation> =
            if self.config.parallel_cells {
                sites.par_iter_mut().enumerate().map(evaluate).collect()
            } else {
                sites.iter_mut().enumerate().map(evaluate).collect()
            };

        for outcome in &outcomes? {
            match outcome.event {
                Some(CellEvent::Infected) => self.infections_last_step += 1,
                Some(CellEvent::Died) => self.deaths_last_step += 1,
                None => {}
            }
            if outcome.probability_saturated {
                self.saturated_last_step += 1;
            }
        }
        if self.saturated_last_step > 0 {
            log::debug!(
                "step {}: {} infection probabilities clamped to 1",
                self.step_index,
                self.saturated_last_step
            );
        }
        self.total_infections += self.infections_last_step;
        self.total_deaths += self.deaths_last_step;
        Ok(())
    }

    /// Advance the virus field through the configured splitting scheme,
    /// using the post-transition cell states.
    fn step_field_phase(&mut self) {
        let mut ops = FieldOperators {
            virus: &mut self.virus,
            grid: &self.grid,
            rates: RateModifier::new(&self.treatments),
        };
        self.config.splitting.advance(self.config.dt, &mut ops);
    }

    /// Field-backed treatments may have been replaced through
    /// `treatments_mut` since they were added.
    fn check_treatment_fields(&self) -> Result<(), StateInvariantViolation> {
        let expected = self.grid.dims();
        for (treatment, t) in self.treatments.iter().enumerate() {
            if let Some(actual) = t.field_dims() {
                if actual != expected {
                    return Err(StateInvariantViolation::TreatmentFieldMismatch {
                        treatment,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn step(&mut self) -> Result<StepTimings, StateInvariantViolation> {
        let total_start = Instant::now();
        self.check_treatment_fields()?;
        self.step_index = self.step_index.saturating_add(1);
        self.infections_last_step = 0;
        self.deaths_last_step = 0;
        self.saturated_last_step = 0;

        let t0 = Instant::now();
        self.step_cell_phase()?;
        let cell_phase_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_field_phase();
        let field_phase_us = t1.elapsed().as_micros() as u64;

        log::debug!(
            "step {}: {} infections, {} deaths, virus total {:.3e}",
            self.step_index,
            self.infections_last_step,
            self.deaths_last_step,
            self.virus.concentration().total()
        );

        Ok(StepTimings {
            cell_phase_us,
            field_phase_us,
            total_us: total_start.elapsed().as_micros() as u64,
        })
    }
}
