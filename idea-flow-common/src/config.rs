use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::collections::HashSet;
use std::path::Path;

/// The 26 upper-case Latin letters used as idea labels by default.
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// Configuration for the cell grid
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of the square grid.
    pub size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { size: 20 }
    }
}

// Configuration for timing, in simulated days
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TimingConfig {
    pub total_days: u64,
    pub record_interval_days: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            total_days: 1000,
            record_interval_days: 10,
        }
    }
}

// Idea injection settings
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct IdeasConfig {
    /// Every character of this string is one available idea label.
    pub alphabet: String,
    pub new_idea_interval_days: u64,
    /// Number of ideas injected at reset, before the first day.
    pub initial_ideas: usize,
}

impl Default for IdeasConfig {
    fn default() -> Self {
        IdeasConfig {
            alphabet: DEFAULT_ALPHABET.to_string(),
            new_idea_interval_days: 100,
            initial_ideas: 2,
        }
    }
}

// Charisma distribution, sampled once per cell at reset
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct CharismaConfig {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for CharismaConfig {
    fn default() -> Self {
        CharismaConfig {
            mean: 5.0,
            std_dev: 2.0,
            min: 1.0,
            max: 10.0,
        }
    }
}

// Caps applied to every cell's belief set after influence
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BeliefsConfig {
    pub max_labels: usize,
    pub max_total_strength: f64,
}

impl Default for BeliefsConfig {
    fn default() -> Self {
        BeliefsConfig {
            max_labels: 3,
            max_total_strength: 10.0,
        }
    }
}

// Divisors of the influence formula `(s / strength_scale) * (c / charisma_scale)^2`
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct InfluenceConfig {
    pub strength_scale: f64,
    pub charisma_scale: f64,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        InfluenceConfig {
            strength_scale: 10.0,
            charisma_scale: 10.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for the simulation RNG. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub save_dominant_grid: bool,
    pub save_cells_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_stats: true,
            save_dominant_grid: true,
            save_cells_in_snapshot: false,
            format: None,
        }
    }
}

fn default_base_filename() -> String {
    "idea_flow".to_string()
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub ideas: IdeasConfig,
    #[serde(default)]
    pub charisma: CharismaConfig,
    #[serde(default)]
    pub beliefs: BeliefsConfig,
    #[serde(default)]
    pub influence: InfluenceConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.size == 0 {
            anyhow::bail!("grid.size must be greater than 0.");
        }
        if self.ideas.new_idea_interval_days == 0 {
            anyhow::bail!("ideas.new_idea_interval_days must be greater than 0.");
        }
        if self.ideas.alphabet.is_empty() {
            anyhow::bail!("ideas.alphabet must contain at least one label.");
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.ideas.alphabet.chars().find(|c| !seen.insert(*c)) {
            anyhow::bail!("ideas.alphabet contains duplicate label '{}'.", dup);
        }
        let c = &self.charisma;
        if !c.mean.is_finite() || !c.std_dev.is_finite() || c.std_dev < 0.0 {
            anyhow::bail!("charisma.mean must be finite and charisma.std_dev finite and non-negative.");
        }
        if !(c.min <= c.max) {
            anyhow::bail!("charisma.min ({}) must not exceed charisma.max ({}).", c.min, c.max);
        }
        if self.beliefs.max_labels == 0 {
            anyhow::bail!("beliefs.max_labels must be greater than 0.");
        }
        if !(self.beliefs.max_total_strength > 0.0) {
            anyhow::bail!("beliefs.max_total_strength must be positive.");
        }
        let i = &self.influence;
        if !(i.strength_scale > 0.0 && i.strength_scale.is_finite())
            || !(i.charisma_scale > 0.0 && i.charisma_scale.is_finite())
        {
            anyhow::bail!("influence.strength_scale and influence.charisma_scale must be positive and finite.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            grid_size: self.grid.size,
            new_idea_interval: self.ideas.new_idea_interval_days,
            initial_ideas: self.ideas.initial_ideas,
            alphabet: self.ideas.alphabet.chars().collect(),
            max_labels: self.beliefs.max_labels,
            max_total_strength: self.beliefs.max_total_strength,
            // Injected ideas start saturated
            injection_strength: self.beliefs.max_total_strength,
            influence_strength_scale: self.influence.strength_scale,
            influence_charisma_scale: self.influence.charisma_scale,
            charisma_mean: self.charisma.mean,
            charisma_std_dev: self.charisma.std_dev,
            charisma_min: self.charisma.min,
            charisma_max: self.charisma.max,
        }
    }
}
