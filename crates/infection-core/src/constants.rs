/// Largest valid grid dimension (sites per axis).
pub const MAX_GRID_DIM: usize = 2048;

/// Upper bound on `grid_width * grid_height`.
pub const MAX_TOTAL_SITES: usize = 1 << 20;

/// Offset added to the base seed for the RNG used during grid initialization,
/// so initial placement does not share a stream with transition draws.
pub const INIT_SEED_OFFSET: u64 = 1;

/// Largest number of operator-splitting sub-intervals per tick.
pub const MAX_SPLITTING_SUBSTEPS: usize = 1024;
