use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use strata_chunk::WorldParams;
use strata_runtime::SchedulerOptions;

/// Settings for the headless client: scheduler budgets, the world shape the
/// loopback source announces, and the simulated walk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub scheduler: SchedulerOptions,
    #[serde(default)]
    pub world: WorldParams,
    #[serde(default)]
    pub sim: Sim,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sim {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Voxels walked along +X per tick.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Place a block every N ticks; 0 disables placement.
    #[serde(default = "default_place_every")]
    pub place_every: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Height of the generated ground.
    #[serde(default = "default_surface")]
    pub surface: usize,
    /// Sleep between ticks.
    #[serde(default)]
    pub tick_ms: u64,
}

fn default_ticks() -> u64 {
    600
}
fn default_speed() -> f64 {
    0.25
}
fn default_place_every() -> u64 {
    40
}
fn default_workers() -> usize {
    2
}
fn default_surface() -> usize {
    32
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            speed: default_speed(),
            place_every: default_place_every(),
            workers: default_workers(),
            surface: default_surface(),
            tick_ms: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: Self = toml::from_str(s)?;
        cfg.world.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}
