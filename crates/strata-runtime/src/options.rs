use std::error::Error;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-tick budgets for the streaming scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    /// Chunks requested around the player, in chunk units.
    #[serde(default = "default_render_radius")]
    pub render_radius: u32,
    /// Eviction radius in chunk units; defaults to 1.1 x render radius.
    #[serde(default)]
    pub delete_radius: Option<f64>,
    #[serde(default = "default_max_requests_per_tick")]
    pub max_requests_per_tick: usize,
    #[serde(default = "default_max_processes_per_tick")]
    pub max_processes_per_tick: usize,
    #[serde(default = "default_max_adds_per_tick")]
    pub max_adds_per_tick: usize,
    #[serde(default = "default_max_updates_per_tick")]
    pub max_updates_per_tick: usize,
    #[serde(default = "default_rerequest_ticks")]
    pub rerequest_ticks: u32,
    #[serde(default = "default_update_timeout_ms")]
    pub update_timeout_ms: f64,
    /// Request budget multiplier while the player's own chunk is missing.
    #[serde(default = "default_bootstrap_request_multiplier")]
    pub bootstrap_request_multiplier: usize,
    /// Narrows the view cone while few chunks are loaded: the half-angle is
    /// `loaded_ratio ^ exponent`, never below 0.1 rad.
    #[serde(default = "default_chunk_load_exponent")]
    pub chunk_load_exponent: f64,
}

fn default_render_radius() -> u32 {
    8
}
fn default_max_requests_per_tick() -> usize {
    12
}
fn default_max_processes_per_tick() -> usize {
    8
}
fn default_max_adds_per_tick() -> usize {
    8
}
fn default_max_updates_per_tick() -> usize {
    50
}
fn default_rerequest_ticks() -> u32 {
    300
}
fn default_update_timeout_ms() -> f64 {
    2.0
}
fn default_bootstrap_request_multiplier() -> usize {
    10
}
fn default_chunk_load_exponent() -> f64 {
    8.0
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            render_radius: default_render_radius(),
            delete_radius: None,
            max_requests_per_tick: default_max_requests_per_tick(),
            max_processes_per_tick: default_max_processes_per_tick(),
            max_adds_per_tick: default_max_adds_per_tick(),
            max_updates_per_tick: default_max_updates_per_tick(),
            rerequest_ticks: default_rerequest_ticks(),
            update_timeout_ms: default_update_timeout_ms(),
            bootstrap_request_multiplier: default_bootstrap_request_multiplier(),
            chunk_load_exponent: default_chunk_load_exponent(),
        }
    }
}

impl SchedulerOptions {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    pub fn delete_radius(&self) -> f64 {
        self.delete_radius
            .filter(|r| r.is_finite() && *r >= 0.0)
            .unwrap_or(f64::from(self.render_radius) * 1.1)
    }

    /// Half-angle of the request cone for a given share of loaded chunks.
    pub fn view_angle(&self, loaded_ratio: f64) -> f64 {
        if loaded_ratio >= 1.0 {
            return 3.0 * std::f64::consts::PI / 8.0;
        }
        let exp = if self.chunk_load_exponent.is_finite() {
            self.chunk_load_exponent
        } else {
            default_chunk_load_exponent()
        };
        let angle = loaded_ratio.max(0.0).powf(exp);
        if angle.is_nan() { 0.1 } else { angle.max(0.1) }
    }

    /// Wall-clock budget per tick; invalid values mean no time at all.
    pub fn update_timeout(&self) -> Duration {
        if self.update_timeout_ms.is_finite() && self.update_timeout_ms > 0.0 {
            Duration::from_secs_f64(self.update_timeout_ms / 1000.0)
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fills_defaults() {
        let o = SchedulerOptions::from_toml_str("render_radius = 4\nmax_requests_per_tick = 3\n").unwrap();
        assert_eq!(o.render_radius, 4);
        assert_eq!(o.max_requests_per_tick, 3);
        assert_eq!(o.max_processes_per_tick, 8);
        assert_eq!(o.rerequest_ticks, 300);
        assert!((o.delete_radius() - 4.4).abs() < 1e-12);
    }

    #[test]
    fn timeout_conversion() {
        let mut o = SchedulerOptions::default();
        assert_eq!(o.update_timeout(), Duration::from_millis(2));
        o.update_timeout_ms = f64::NAN;
        assert_eq!(o.update_timeout(), Duration::ZERO);
    }

    #[test]
    fn view_angle_widens_as_chunks_load() {
        let o = SchedulerOptions::default();
        assert_eq!(o.view_angle(0.0), 0.1);
        assert_eq!(o.view_angle(0.5), 0.1);
        assert!((o.view_angle(0.9) - 0.9f64.powi(8)).abs() < 1e-12);
        assert!((o.view_angle(1.0) - 3.0 * std::f64::consts::PI / 8.0).abs() < 1e-12);
    }
}
