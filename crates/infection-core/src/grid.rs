use crate::cell::{Cell, HealthState};
use crate::error::StateInvariantViolation;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Dense row-major grid of sites, each holding at most one cell.
#[derive(Clone, Debug)]
pub struct CellGrid {
    width: usize,
    height: usize,
    sites: Vec<Option<Cell>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCounts {
    pub target: usize,
    pub infected: usize,
    pub dead: usize,
    pub empty: usize,
}

impl CellCounts {
    pub fn occupied(&self) -> usize {
        self.target + self.infected + self.dead
    }
}

impl CellGrid {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            sites: vec![None; width * height],
        }
    }

    /// Every site holds a cell in `state`.
    pub fn filled(width: usize, height: usize, state: HealthState) -> Self {
        let mut grid = Self::empty(width, height);
        for idx in 0..grid.sites.len() {
            let position = grid.position_of(idx);
            grid.sites[idx] = Some(Cell::new(position, state));
        }
        grid
    }

    /// Each site receives a target cell with probability `density`; then
    /// `infected_positions` are infected (placing a cell if needed), then
    /// `infected_count` further random target cells.
    pub fn populate<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        density: f64,
        infected_positions: &[[usize; 2]],
        infected_count: usize,
        rng: &mut R,
    ) -> Self {
        let mut grid = Self::empty(width, height);
        for idx in 0..grid.sites.len() {
            if density >= 1.0 || rng.random::<f64>() < density {
                let position = grid.position_of(idx);
                grid.sites[idx] = Some(Cell::new(position, HealthState::Target));
            }
        }
        for &position in infected_positions {
            grid.place(Cell::new(position, HealthState::Infected));
        }

        let targets: Vec<usize> = grid
            .sites
            .iter()
            .enumerate()
            .filter(|(_, site)| matches!(site, Some(c) if c.state() == HealthState::Target))
            .map(|(idx, _)| idx)
            .collect();
        let amount = infected_count.min(targets.len());
        for pick in sample(rng, targets.len(), amount) {
            let idx = targets[pick];
            let position = grid.position_of(idx);
            grid.sites[idx] = Some(Cell::new(position, HealthState::Infected));
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        (self.width * self.height) as f64
    }

    pub fn index_of(&self, position: [usize; 2]) -> Option<usize> {
        (position[0] < self.width && position[1] < self.height)
            .then(|| position[1] * self.width + position[0])
    }

    pub fn position_of(&self, index: usize) -> [usize; 2] {
        [index % self.width, index / self.width]
    }

    /// Put `cell` at its own position, replacing any occupant.
    pub fn place(&mut self, cell: Cell) {
        if let Some(idx) = self.index_of(cell.position()) {
            self.sites[idx] = Some(cell);
        }
    }

    pub fn cell_at(&self, position: [usize; 2]) -> Option<&Cell> {
        self.index_of(position)
            .and_then(|idx| self.sites[idx].as_ref())
    }

    /// The cell at a position that is expected to be occupied.
    pub fn require_cell(&self, position: [usize; 2]) -> Result<&Cell, StateInvariantViolation> {
        self.cell_at(position)
            .ok_or(StateInvariantViolation::MissingCell { position })
    }

    pub fn sites(&self) -> &[Option<Cell>] {
        &self.sites
    }

    pub(crate) fn sites_mut(&mut self) -> &mut [Option<Cell>] {
        &mut self.sites
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.sites.iter().flatten()
    }

    pub fn counts(&self) -> CellCounts {
        let mut counts = CellCounts::default();
        for site in &self.sites {
            match site.as_ref().map(Cell::state) {
                None => counts.empty += 1,
                Some(HealthState::Target) => counts.target += 1,
                Some(HealthState::Infected) => counts.infected += 1,
                Some(HealthState::Dead) => counts.dead += 1,
            }
        }
        counts
    }

    /// Row-major state codes: -1 empty, otherwise [`HealthState::code`].
    pub fn state_codes(&self) -> Vec<i8> {
        self.sites
            .iter()
            .map(|site| site.as_ref().map_or(-1, |c| c.state().code()))
            .collect()
    }
}
