use crate::drug::{Direction, Pathway};
use crate::treatment::Treatment;

/// Compounds every active treatment's effect onto a base rate.
///
/// Each treatment contributes an independent factor, `(1 - e)` for reduction
/// pathways and `(1 + e)` for amplification pathways, so the result does not
/// depend on treatment order.
#[derive(Clone, Copy, Debug)]
pub struct RateModifier<'a> {
    treatments: &'a [Treatment],
}

impl<'a> RateModifier<'a> {
    pub fn new(treatments: &'a [Treatment]) -> Self {
        Self { treatments }
    }

    pub fn treatments(&self) -> &'a [Treatment] {
        self.treatments
    }

    /// Product of all treatment factors for `pathway` at `position`.
    pub fn multiplier(&self, pathway: Pathway, position: [usize; 2]) -> f64 {
        self.directed_multiplier(pathway, position, pathway.direction())
    }

    fn directed_multiplier(
        &self,
        pathway: Pathway,
        position: [usize; 2],
        direction: Direction,
    ) -> f64 {
        self.treatments.iter().fold(1.0, |acc, treatment| {
            let effect = treatment.effect(pathway, position);
            match direction {
                Direction::Reduction => acc * (1.0 - effect),
                Direction::Amplification => acc * (1.0 + effect),
            }
        })
    }

    pub fn apply(&self, base_rate: f64, pathway: Pathway, position: [usize; 2]) -> f64 {
        base_rate * self.multiplier(pathway, position)
    }

    /// Like [`apply`](Self::apply) but with the compounding direction given
    /// explicitly instead of taken from the pathway.
    pub fn apply_directed(
        &self,
        base_rate: f64,
        pathway: Pathway,
        position: [usize; 2],
        direction: Direction,
    ) -> f64 {
        base_rate * self.directed_multiplier(pathway, position, direction)
    }
}
