use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used during every step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimParams {
    // Grid
    pub grid_size: usize,

    // Ideas
    pub new_idea_interval: u64, // Days between injections
    pub initial_ideas: usize,
    pub alphabet: Vec<char>,
    pub injection_strength: f64,

    // Belief caps
    pub max_labels: usize,
    pub max_total_strength: f64,

    // Influence formula divisors
    pub influence_strength_scale: f64,
    pub influence_charisma_scale: f64,

    // Charisma distribution
    pub charisma_mean: f64,
    pub charisma_std_dev: f64,
    pub charisma_min: f64,
    pub charisma_max: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        crate::config::SimulationConfig::default().get_sim_params()
    }
}
