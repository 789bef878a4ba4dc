pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, GridConfig, TimingConfig, IdeasConfig, CharismaConfig, BeliefsConfig, InfluenceConfig, RunConfig, OutputConfig};
pub use sim_params::SimParams;
pub use snapshot::{Snapshot, CellSnapshot, BeliefRecord};
