use crate::cell::{Cell, CharismaDistribution};
use crate::grid::Grid;
use crate::random::{RandomSource, RngSource};
use anyhow::Result;
use idea_flow_common::{CellSnapshot, SimParams, SimulationConfig, Snapshot};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Builds a fresh `size` x `size` grid with newly sampled charisma, day 0, an
/// empty idea registry, and `params.initial_ideas` ideas injected.
pub fn reset_simulation<S: RandomSource + ?Sized>(
    size: usize,
    params: &SimParams,
    source: &mut S,
) -> Result<Grid> {
    if size == 0 {
        anyhow::bail!("Grid size must be greater than 0.");
    }
    let charisma = CharismaDistribution::from_params(params)?;
    let Some(num_cells) = size.checked_mul(size) else {
        anyhow::bail!("Grid size {} is too large.", size);
    };
    let cells: Vec<Cell> = (0..num_cells).map(|_| Cell::new(&charisma, source)).collect();
    let mut grid = Grid::from_cells(size, cells);

    for _ in 0..params.initial_ideas {
        inject_new_idea(&mut grid, params, source);
    }
    info!(
        "Reset {}x{} grid with initial ideas {:?}.",
        size, size, grid.existing_ideas()
    );
    Ok(grid)
}

/// Advances the grid by one day.
///
/// Cells are visited row-major (`x` outer, `y` inner); each one influences its
/// neighbors in `Grid::neighbors` order. Influence mutates targets in place,
/// so later cells see the effects of earlier ones within the same day. An
/// idea is injected after influence whenever the new day is a multiple of
/// `params.new_idea_interval`. Returns the injected label, if any.
pub fn step_one_day<S: RandomSource + ?Sized>(
    grid: &mut Grid,
    params: &SimParams,
    source: &mut S,
) -> Option<char> {
    grid.day += 1;

    for idx in 0..grid.cells().len() {
        let (x, y) = grid.coords(idx);
        for (nx, ny) in grid.neighbors(x, y) {
            let neighbor_idx = grid.cell_idx(nx, ny);
            let (cell, neighbor) = grid.pair_mut(idx, neighbor_idx);
            cell.influence(neighbor, params, source);
        }
    }

    if params.new_idea_interval > 0 && grid.day % params.new_idea_interval == 0 {
        inject_new_idea(grid, params, source)
    } else {
        None
    }
}

/// Plants one not-yet-used label from the alphabet at a uniformly random cell
/// with `params.injection_strength`, overwriting any prior strength for that
/// label there. The cell's caps are not enforced until it is next influenced.
/// Returns `None` once the alphabet is exhausted.
pub fn inject_new_idea<S: RandomSource + ?Sized>(
    grid: &mut Grid,
    params: &SimParams,
    source: &mut S,
) -> Option<char> {
    let available: Vec<char> = params
        .alphabet
        .iter()
        .copied()
        .filter(|label| !grid.existing_ideas.contains(label))
        .collect();
    if available.is_empty() {
        debug!("Day {}: idea alphabet exhausted, no injection.", grid.day);
        return None;
    }

    let label = available[source.next_index(available.len())];
    let x = source.next_index(grid.size());
    let y = source.next_index(grid.size());
    grid.cell_at_mut(x, y)?.set_belief(label, params.injection_strength);
    grid.existing_ideas.insert(label);

    debug!("Day {}: injected idea '{}' at ({}, {}).", grid.day, label, x, y);
    Some(label)
}

/// Aggregates a read-only snapshot of the grid.
pub fn snapshot(grid: &Grid, include_cells: bool) -> Snapshot {
    let (counts, undecided, total) = grid
        .cells()
        .par_iter()
        .fold(
            || (BTreeMap::new(), 0u32, 0.0f64),
            |(mut counts, mut undecided, total), cell| {
                match cell.dominant_belief() {
                    Some(label) => *counts.entry(label).or_insert(0u32) += 1,
                    None => undecided += 1,
                }
                (counts, undecided, total + cell.total_strength())
            },
        )
        .reduce(
            || (BTreeMap::new(), 0u32, 0.0f64),
            |(mut a, ua, ta), (b, ub, tb)| {
                for (label, n) in b {
                    *a.entry(label).or_insert(0) += n;
                }
                (a, ua + ub, ta + tb)
            },
        );

    let num_cells = grid.cells().len();
    let cells = include_cells.then(|| {
        grid.cells()
            .par_iter()
            .enumerate()
            .map(|(idx, cell)| {
                let (x, y) = grid.coords(idx);
                CellSnapshot {
                    x,
                    y,
                    charisma: cell.charisma(),
                    beliefs: cell.beliefs().as_slice().to_vec(),
                    dominant: cell.dominant_belief(),
                }
            })
            .collect::<Vec<_>>()
    });

    Snapshot {
        day: grid.day,
        grid_size: grid.size(),
        existing_ideas: grid.existing_ideas.iter().copied().collect(),
        dominant_counts: counts.into_iter().collect(),
        undecided_cells: undecided,
        mean_total_strength: if num_cells > 0 { total / num_cells as f64 } else { 0.0 },
        cells,
    }
}

/// Owns one independent run: configuration, grid, random stream and any
/// snapshots recorded along the way.
pub struct Simulation<S: RandomSource = RngSource<StdRng>> {
    config: SimulationConfig,
    params: SimParams,
    grid: Grid,
    source: S,
    recorded_snapshots: Vec<Snapshot>,
}

impl Simulation {
    /// Creates a simulation using `config.run.seed`, or OS entropy when unset.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let source = match config.run.seed {
            Some(seed) => {
                info!("Seeding simulation RNG with {}.", seed);
                RngSource::seeded(seed)
            }
            None => RngSource::from_os_rng(),
        };
        Self::with_source(config, source)
    }
}

impl<S: RandomSource> Simulation<S> {
    pub fn with_source(config: SimulationConfig, mut source: S) -> Result<Self> {
        config.validate()?;
        let params = config.get_sim_params();
        let grid = reset_simulation(params.grid_size, &params, &mut source)?;
        Ok(Self {
            config,
            params,
            grid,
            source,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Discards all state and starts over with a new grid. Recorded
    /// snapshots belong to the discarded run and are cleared too.
    pub fn reset(&mut self) -> Result<()> {
        self.grid = reset_simulation(self.params.grid_size, &self.params, &mut self.source)?;
        self.recorded_snapshots.clear();
        Ok(())
    }

    /// Advances one day. Returns the label injected this day, if any.
    pub fn step(&mut self) -> Option<char> {
        let injected = step_one_day(&mut self.grid, &self.params, &mut self.source);
        trace!("Day {} complete.", self.grid.day);
        if let Some(label) = injected {
            info!(
                "Day {}: new idea '{}' ({} ideas so far).",
                self.grid.day,
                label,
                self.grid.existing_ideas.len()
            );
        }
        injected
    }

    pub fn take_snapshot(&self) -> Snapshot {
        snapshot(&self.grid, self.config.output.save_cells_in_snapshot)
    }

    pub fn record_snapshot(&mut self) {
        let snap = self.take_snapshot();
        self.recorded_snapshots.push(snap);
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn day(&self) -> u64 {
        self.grid.day()
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
