use serde::{Serialize, Deserialize};

/// One label and its strength as held by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefRecord {
    pub label: char,
    pub strength: f64,
}

/// Read-only view of a single cell, handed to rendering collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub x: usize,
    pub y: usize,
    pub charisma: f64,
    pub beliefs: Vec<BeliefRecord>,
    pub dominant: Option<char>,
}

/// A snapshot of the simulation state and metrics at a specific day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The simulation day at which the snapshot was taken.
    pub day: u64,
    pub grid_size: usize,
    /// Every label introduced so far, sorted.
    pub existing_ideas: Vec<char>,
    /// Number of cells whose dominant belief is each label, sorted by label.
    pub dominant_counts: Vec<(char, u32)>,
    /// Cells holding no belief at all.
    pub undecided_cells: u32,
    /// Mean of the per-cell total belief strength.
    pub mean_total_strength: f64,
    /// `Some` only if `config.output.save_cells_in_snapshot` is true. Always
    /// written, since bincode and MessagePack encode fields by position.
    pub cells: Option<Vec<CellSnapshot>>,
}
