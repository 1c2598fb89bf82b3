use rustdct::{Dct2, Dct3, DctPlanner, TransformType2And3};
use std::f64::consts::PI;

/// 2D scalar concentration grid on unit-spaced sites.
///
/// Writes through [`ConcentrationGrid::add`] are buffered and only become
/// visible after [`ConcentrationGrid::commit`], so a sweep over all sites
/// always reads the values from before the sweep started.
#[derive(Clone, Debug)]
pub struct ConcentrationGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
    pending: Vec<f64>,
    dirty: bool,
}

impl ConcentrationGrid {
    pub fn new(width: usize, height: usize, initial_value: f64) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        let len = width * height;
        Self {
            width,
            height,
            data: vec![initial_value; len],
            pending: vec![0.0; len],
            dirty: false,
        }
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

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major index of `position = [x, y]`, or `None` when out of bounds.
    pub fn index_of(&self, position: [usize; 2]) -> Option<usize> {
        (position[0] < self.width && position[1] < self.height)
            .then(|| position[1] * self.width + position[0])
    }

    pub fn position_of(&self, index: usize) -> [usize; 2] {
        [index % self.width, index / self.width]
    }

    /// Committed value at `position`. Panics when out of bounds.
    pub fn get(&self, position: [usize; 2]) -> f64 {
        let idx = self
            .index_of(position)
            .unwrap_or_else(|| panic!("position {position:?} outside {}x{}", self.width, self.height));
        self.data[idx]
    }

    pub fn get_index(&self, index: usize) -> f64 {
        self.data[index]
    }

    /// Overwrite the committed value immediately.
    pub fn set(&mut self, position: [usize; 2], value: f64) {
        if let Some(idx) = self.index_of(position) {
            self.data[idx] = value;
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Queue `delta` for `position`; visible after the next `commit`.
    pub fn add(&mut self, position: [usize; 2], delta: f64) {
        if let Some(idx) = self.index_of(position) {
            self.add_index(idx, delta);
        }
    }

    pub fn add_index(&mut self, index: usize, delta: f64) {
        self.pending[index] += delta;
        self.dirty = true;
    }

    /// Apply all queued deltas.
    pub fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        for (value, delta) in self.data.iter_mut().zip(self.pending.iter_mut()) {
            *value += *delta;
            *delta = 0.0;
        }
        self.dirty = false;
    }

    pub fn has_pending(&self) -> bool {
        self.dirty
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Advance the committed field by `exp(coefficient_duration * L)`, where
    /// `L` is the 5-point Laplacian with no-flux boundaries.
    ///
    /// `L` separates into row and column operators whose eigenvectors are the
    /// DCT-II basis, so each line is transformed, every cosine mode `k` is
    /// scaled by `exp(-4 sin^2(pi k / 2n) * coefficient_duration)`, and the
    /// line is transformed back. The result is exact in time: splitting the
    /// duration changes it only by rounding. Mode 0 is untouched, so the
    /// grid total is conserved. Commits pending writes first.
    pub fn diffuse(&mut self, coefficient_duration: f64) {
        debug_assert!(
            coefficient_duration.is_finite() && coefficient_duration >= 0.0,
            "diffusion amount must be finite and non-negative"
        );
        self.commit();
        if coefficient_duration <= 0.0 || self.data.len() < 2 {
            return;
        }
        let (w, h) = (self.width, self.height);
        let mut planner = DctPlanner::new();

        if w > 1 {
            let transform = planner.plan_dct2(w);
            let gains = mode_gains(w, coefficient_duration);
            for row in self.data.chunks_exact_mut(w) {
                propagate_line(row, transform.as_ref(), &gains);
            }
        }
        if h > 1 {
            let transform = planner.plan_dct2(h);
            let gains = mode_gains(h, coefficient_duration);
            let mut column = vec![0.0; h];
            for x in 0..w {
                for (y, value) in column.iter_mut().enumerate() {
                    *value = self.data[y * w + x];
                }
                propagate_line(&mut column, transform.as_ref(), &gains);
                for (y, value) in column.iter().enumerate() {
                    self.data[y * w + x] = *value;
                }
            }
        }

        // The exact operator is positivity preserving; rounding can still
        // leave values around -1e-18 where the field is zero.
        for value in &mut self.data {
            if *value < 0.0 {
                *value = 0.0;
            }
        }
    }
}

/// Per-mode factors for a line of `len` sites, including the `2 / len`
/// that makes DCT-III the inverse of DCT-II.
fn mode_gains(len: usize, coefficient_duration: f64) -> Vec<f64> {
    let norm = 2.0 / len as f64;
    (0..len)
        .map(|k| {
            if k == 0 {
                return norm;
            }
            let s = (PI * k as f64 / (2 * len) as f64).sin();
            norm * (-4.0 * s * s * coefficient_duration).exp()
        })
        .collect()
}

fn propagate_line(line: &mut [f64], transform: &dyn TransformType2And3<f64>, gains: &[f64]) {
    transform.process_dct2(line);
    for (mode, gain) in line.iter_mut().zip(gains) {
        *mode *= gain;
    }
    transform.process_dct3(line);
}

#[cfg(test)]
mod tests {
    use super::ConcentrationGrid;
    use std::f64::consts::PI;

    fn peaked(width: usize, height: usize) -> ConcentrationGrid {
        let mut grid = ConcentrationGrid::new(width, height, 0.0);
        grid.set([width / 2, height / 2], 100.0);
        grid.set([0, 0], 7.0);
        grid
    }

    #[test]
    fn adds_are_invisible_until_commit() {
        let mut grid = ConcentrationGrid::new(4, 3, 1.0);
        grid.add([2, 1], 0.5);
        assert_eq!(grid.get([2, 1]), 1.0);
        assert!(grid.has_pending());
        grid.commit();
        assert_eq!(grid.get([2, 1]), 1.5);
        assert!(!grid.has_pending());
    }

    #[test]
    fn index_and_position_round_trip() {
        let grid = ConcentrationGrid::new(5, 3, 0.0);
        assert_eq!(grid.index_of([4, 2]), Some(14));
        assert_eq!(grid.position_of(14), [4, 2]);
        assert_eq!(grid.index_of([5, 0]), None);
    }

    #[test]
    fn diffusion_conserves_mass_with_no_flux_boundaries() {
        for amount in [0.0, 0.05, 0.2, 1.0, 7.3, 50.0] {
            let mut grid = peaked(9, 6);
            let before = grid.total();
            grid.diffuse(amount);
            assert!(
                (grid.total() - before).abs() < 1e-9 * before,
                "mass drifted for amount={amount}"
            );
        }
    }

    #[test]
    fn diffusion_keeps_field_non_negative_and_spreads_peak() {
        let mut grid = peaked(9, 9);
        grid.diffuse(3.0);
        assert!(grid.data().iter().all(|&v| v >= 0.0));
        assert!(grid.get([4, 4]) < 100.0);
        assert!(grid.get([5, 4]) > 0.0);
    }

    #[test]
    fn uniform_field_is_a_fixed_point() {
        let mut grid = ConcentrationGrid::new(6, 4, 2.5);
        grid.diffuse(4.0);
        assert!(grid.data().iter().all(|&v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn diffusion_is_additive_in_time() {
        for (a, b) in [(0.3, 0.3), (0.17, 0.41), (1.0, 2.0), (0.05, 3.7)] {
            let mut once = peaked(11, 11);
            let mut twice = once.clone();
            once.diffuse(a + b);
            twice.diffuse(a);
            twice.diffuse(b);
            for (x, y) in once.data().iter().zip(twice.data()) {
                assert!((x - y).abs() < 1e-10, "{a} + {b}: {x} vs {y}");
            }
        }
    }

    #[test]
    fn single_cosine_mode_decays_at_its_eigenvalue() {
        let (w, h) = (8, 3);
        let mode = |x: usize| (PI * (x as f64 + 0.5) / w as f64).cos();
        let mut grid = ConcentrationGrid::new(w, h, 0.0);
        for y in 0..h {
            for x in 0..w {
                grid.set([x, y], 1.0 + mode(x));
            }
        }
        let amount = 0.8;
        grid.diffuse(amount);
        let s = (PI / (2 * w) as f64).sin();
        let decay = (-4.0 * s * s * amount).exp();
        for y in 0..h {
            for x in 0..w {
                let expected = 1.0 + decay * mode(x);
                assert!((grid.get([x, y]) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn short_diffusion_matches_five_point_laplacian() {
        let mut grid = ConcentrationGrid::new(11, 11, 0.0);
        grid.set([5, 5], 100.0);
        let tau = 1e-5;
        grid.diffuse(tau);
        assert!((grid.get([5, 5]) - (100.0 - 4.0 * tau * 100.0)).abs() < 1e-6);
        for neighbour in [[4, 5], [6, 5], [5, 4], [5, 6]] {
            assert!((grid.get(neighbour) - tau * 100.0).abs() < 1e-6);
        }
        assert!(grid.get([6, 6]) < 1e-6);
    }

    #[test]
    fn single_row_and_column_grids_diffuse_along_their_axis() {
        for (w, h) in [(9, 1), (1, 9)] {
            let mut grid = peaked(w, h);
            let before = grid.total();
            grid.diffuse(2.0);
            assert!((grid.total() - before).abs() < 1e-9 * before);
            assert!(grid.get([w / 2, h / 2]) < 100.0);
        }
    }
}
