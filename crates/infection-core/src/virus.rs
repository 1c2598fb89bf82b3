use crate::cell::HealthState;
use crate::drug::Pathway;
use crate::field::ConcentrationGrid;
use crate::grid::CellGrid;
use crate::rate::RateModifier;

/// Exact solution of `dC/dt = S - k*C` after `duration`, for constant `S`
/// and `k > 0`.
pub fn exact_reaction(concentration: f64, source: f64, removal_rate: f64, duration: f64) -> f64 {
    let steady_state = source / removal_rate;
    (concentration - steady_state) * (-removal_rate * duration).exp() + steady_state
}

/// Rate constants of the virus field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirusKinetics {
    /// Production per infected cell per unit time.
    pub production: f64,
    pub diffusion_coefficient: f64,
    /// First-order removal rate; strictly positive.
    pub removal_rate: f64,
}

/// Continuum virus concentration coupled to the cell grid.
#[derive(Clone, Debug)]
pub struct VirusField {
    concentration: ConcentrationGrid,
    kinetics: VirusKinetics,
}

impl VirusField {
    pub fn new(width: usize, height: usize, initial: f64, kinetics: VirusKinetics) -> Self {
        Self {
            concentration: ConcentrationGrid::new(width, height, initial),
            kinetics,
        }
    }

    pub fn concentration(&self) -> &ConcentrationGrid {
        &self.concentration
    }

    pub fn concentration_mut(&mut self) -> &mut ConcentrationGrid {
        &mut self.concentration
    }

    pub fn kinetics(&self) -> &VirusKinetics {
        &self.kinetics
    }

    pub fn set_kinetics(&mut self, kinetics: VirusKinetics) {
        self.kinetics = kinetics;
    }

    /// Diffusion sub-step over `duration`.
    pub fn diffuse(&mut self, duration: f64) {
        self.concentration
            .diffuse(self.kinetics.diffusion_coefficient * duration);
    }

    /// Local source and removal rates at a site, after treatment effects.
    pub fn local_rates(
        &self,
        position: [usize; 2],
        state: Option<HealthState>,
        rates: &RateModifier<'_>,
    ) -> (f64, f64) {
        let source = if state == Some(HealthState::Infected) {
            rates.apply(
                self.kinetics.production,
                Pathway::VirusProductionReduction,
                position,
            )
        } else {
            0.0
        };
        let removal = rates.apply(self.kinetics.removal_rate, Pathway::VirusRemoval, position);
        (source, removal)
    }

    /// Decay-and-production sub-step over `duration`, solved exactly per site.
    ///
    /// Reads the current cell states and treatment concentrations; every site
    /// decays, only sites holding an infected cell produce.
    pub fn decay_and_production(&mut self, duration: f64, cells: &CellGrid, rates: &RateModifier<'_>) {
        debug_assert_eq!(cells.dims(), self.concentration.dims());
        for (idx, site) in cells.sites().iter().enumerate() {
            let position = cells.position_of(idx);
            let (source, removal) = self.local_rates(position, site.as_ref().map(|c| c.state()), rates);
            let before = self.concentration.get_index(idx);
            let after = exact_reaction(before, source, removal, duration);
            self.concentration.add_index(idx, after - before);
        }
        self.concentration.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::drug::Drug;
    use crate::efficacy::EfficacyCurve;
    use crate::treatment::Treatment;
    use std::sync::Arc;

    const KINETICS: VirusKinetics = VirusKinetics {
        production: 2.0,
        diffusion_coefficient: 0.5,
        removal_rate: 0.4,
    };

    #[test]
    fn reaction_is_time_additive() {
        for (c0, s, k) in [(0.0, 2.0, 0.4), (10.0, 0.0, 1.3), (3.5, 0.7, 0.05)] {
            for (t1, t2) in [(0.1, 0.2), (1.0, 2.5), (0.003, 7.0)] {
                let split = exact_reaction(exact_reaction(c0, s, k, t1), s, k, t2);
                let once = exact_reaction(c0, s, k, t1 + t2);
                assert!((split - once).abs() < 1e-12, "c0={c0} s={s} k={k}");
            }
        }
    }

    #[test]
    fn reaction_relaxes_to_steady_state() {
        let c = exact_reaction(0.0, 2.0, 0.4, 1e3);
        assert!((c - 5.0).abs() < 1e-9);
        assert!((exact_reaction(5.0, 2.0, 0.4, 3.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn only_infected_sites_produce() {
        let mut cells = CellGrid::empty(3, 1);
        cells.place(Cell::new([0, 0], HealthState::Target));
        cells.place(Cell::new([1, 0], HealthState::Infected));
        let mut field = VirusField::new(3, 1, 0.0, KINETICS);
        field.decay_and_production(1.0, &cells, &RateModifier::new(&[]));
        let grid = field.concentration();
        assert_eq!(grid.get([0, 0]), 0.0);
        assert_eq!(grid.get([2, 0]), 0.0);
        let expected = exact_reaction(0.0, 2.0, 0.4, 1.0);
        assert!((grid.get([1, 0]) - expected).abs() < 1e-15);
    }

    #[test]
    fn empty_and_dead_sites_still_decay() {
        let mut cells = CellGrid::empty(2, 1);
        cells.place(Cell::new([1, 0], HealthState::Dead));
        let mut field = VirusField::new(2, 1, 1.0, KINETICS);
        field.decay_and_production(2.0, &cells, &RateModifier::new(&[]));
        let expected = (-0.8f64).exp();
        for x in 0..2 {
            assert!((field.concentration().get([x, 0]) - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn treatments_modulate_source_and_removal() {
        let drug = Drug::inert("combo")
            .with_curve(
                Pathway::VirusProductionReduction,
                EfficacyCurve::dose_response(0.5, 1.0, 1.0).unwrap(),
            )
            .with_curve(
                Pathway::VirusRemoval,
                EfficacyCurve::dose_response(0.5, 1.0, 1.0).unwrap(),
            );
        let treatments = [Treatment::uniform(Arc::new(drug), 1.0).unwrap()];
        let rates = RateModifier::new(&treatments);
        let field = VirusField::new(1, 1, 0.0, KINETICS);
        let (source, removal) = field.local_rates([0, 0], Some(HealthState::Infected), &rates);
        assert!((source - 2.0 * 0.75).abs() < 1e-15);
        assert!((removal - 0.4 * 1.25).abs() < 1e-15);
    }

    #[test]
    fn diffusion_substep_scales_with_coefficient() {
        let mut field = VirusField::new(5, 5, 0.0, KINETICS);
        field.concentration_mut().set([2, 2], 1.0);
        let mut reference = field.concentration().clone();
        field.diffuse(2.0);
        reference.diffuse(1.0);
        for (a, b) in field.concentration().data().iter().zip(reference.data()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
