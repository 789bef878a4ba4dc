use crate::cell::Cell;
use std::collections::BTreeSet;

/// Neighbor offsets in visiting order: up (-x), down (+x), left (-y), right (+y).
pub const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Square grid of cells plus the run's day counter and idea registry.
///
/// Cells are stored row-major in a flat vector, `x` selecting the row.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
    pub(crate) day: u64,
    pub(crate) existing_ideas: BTreeSet<char>,
}

impl Grid {
    /// Builds a grid from `size * size` cells in row-major order.
    pub(crate) fn from_cells(size: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        Self {
            size,
            cells,
            day: 0,
            existing_ideas: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Days simulated since the last reset.
    pub fn day(&self) -> u64 {
        self.day
    }

    /// Every label introduced since the last reset.
    pub fn existing_ideas(&self) -> &BTreeSet<char> {
        &self.existing_ideas
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline(always)]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// Flat index of `(x, y)`. Caller guarantees the coordinate is in bounds.
    #[inline(always)]
    pub fn cell_idx(&self, x: usize, y: usize) -> usize {
        x * self.size + y
    }

    /// Coordinate of a flat index.
    #[inline(always)]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.size, idx % self.size)
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            self.cells.get(self.cell_idx(x, y))
        } else {
            None
        }
    }

    pub fn cell_at_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.cell_idx(x, y);
            self.cells.get_mut(idx)
        } else {
            None
        }
    }

    /// Axis-adjacent coordinates of `(x, y)` that lie on the grid, in
    /// [`NEIGHBOR_OFFSETS`] order. No wraparound. An off-grid query has no
    /// neighbors.
    pub fn neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(NEIGHBOR_OFFSETS.len());
        self.for_each_neighbor(x, y, |nx, ny| out.push((nx, ny)));
        out
    }

    /// Calls `f` for each on-grid axis-adjacent neighbor of `(x, y)`.
    #[inline(always)]
    pub fn for_each_neighbor<F>(&self, x: usize, y: usize, mut f: F)
    where
        F: FnMut(usize, usize),
    {
        if !self.in_bounds(x, y) {
            log::error!("Neighbor query for ({}, {}) outside {}x{} grid.", x, y, self.size, self.size);
            return;
        }
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
                continue;
            };
            if self.in_bounds(nx, ny) {
                f(nx, ny);
            }
        }
    }

    /// Shared reference to cell `a` and mutable reference to cell `b`.
    /// `a` and `b` must differ.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> (&Cell, &mut Cell) {
        debug_assert_ne!(a, b);
        if a < b {
            let (lo, hi) = self.cells.split_at_mut(b);
            (&lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.cells.split_at_mut(a);
            (&hi[0], &mut lo[b])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(size: usize) -> Grid {
        Grid::from_cells(size, (0..size * size).map(|_| Cell::with_charisma(5.0)).collect())
    }

    #[test]
    fn neighbor_counts_by_position() {
        let g = grid(5);
        for (x, y) in [(0, 0), (0, 4), (4, 0), (4, 4)] {
            assert_eq!(g.neighbors(x, y).len(), 2, "corner ({}, {})", x, y);
        }
        for (x, y) in [(0, 2), (4, 1), (3, 0), (2, 4)] {
            assert_eq!(g.neighbors(x, y).len(), 3, "edge ({}, {})", x, y);
        }
        for (x, y) in [(1, 1), (2, 2), (3, 3), (1, 3)] {
            assert_eq!(g.neighbors(x, y).len(), 4, "interior ({}, {})", x, y);
        }
    }

    #[test]
    fn neighbors_are_in_fixed_order() {
        let g = grid(3);
        assert_eq!(g.neighbors(1, 1), vec![(0, 1), (2, 1), (1, 0), (1, 2)]);
        assert_eq!(g.neighbors(0, 0), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn neighbors_never_leave_the_grid() {
        let g = grid(4);
        for x in 0..4 {
            for y in 0..4 {
                for (nx, ny) in g.neighbors(x, y) {
                    assert!(nx < 4 && ny < 4);
                    assert_eq!(nx.abs_diff(x) + ny.abs_diff(y), 1);
                }
            }
        }
    }

    #[test]
    fn off_grid_query_has_no_neighbors() {
        let g = grid(3);
        assert!(g.neighbors(3, 0).is_empty());
        assert!(g.neighbors(0, 7).is_empty());
        assert!(g.cell_at(3, 3).is_none());
    }

    #[test]
    fn single_cell_grid_has_no_neighbors() {
        assert!(grid(1).neighbors(0, 0).is_empty());
    }

    #[test]
    fn accessors_read_day_and_registry() {
        let mut g = grid(2);
        assert_eq!(g.day(), 0);
        assert!(g.existing_ideas().is_empty());
        g.day = 4;
        g.existing_ideas.insert('Q');
        assert_eq!(g.day(), 4);
        assert_eq!(g.existing_ideas().iter().copied().collect::<Vec<_>>(), vec!['Q']);
    }

    #[test]
    fn index_round_trips() {
        let g = grid(6);
        assert_eq!(g.cell_idx(2, 5), 17);
        assert_eq!(g.coords(17), (2, 5));
    }

    #[test]
    fn pair_mut_works_both_directions() {
        let mut g = grid(2);
        g.cell_at_mut(0, 0).unwrap().set_belief('A', 1.0);
        {
            let (src, dst) = g.pair_mut(0, 3);
            assert_eq!(src.dominant_belief(), Some('A'));
            dst.set_belief('B', 2.0);
        }
        let (src, dst) = g.pair_mut(3, 0);
        assert_eq!(src.dominant_belief(), Some('B'));
        assert_eq!(dst.dominant_belief(), Some('A'));
    }
}
