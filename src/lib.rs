//! Spatial diffusion of competing ideas across a grid of agents.
//!
//! Rendering and UI drive this crate through [`reset_simulation`],
//! [`step_one_day`] and the read accessors on [`Grid`] and [`Cell`].

pub mod cell;
pub mod grid;
pub mod random;
pub mod simulation;

pub use cell::{Belief, Beliefs, Cell, CharismaDistribution};
pub use grid::Grid;
pub use random::{RandomSource, RngSource, SequenceSource};
pub use simulation::{inject_new_idea, reset_simulation, snapshot, step_one_day, Simulation};
