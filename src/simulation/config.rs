//! Scheduler configuration

use anyhow::Result;

use super::types::{Cell, DEFAULT_SPAWN_INTERVAL, STALL_THRESHOLD};

/// Tunables for a [`Simulation`](super::Simulation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Spawn on the first tick and then every this many ticks
    pub spawn_interval: u64,
    /// A vehicle re-routes once its stall counter exceeds this
    pub stall_threshold: u32,
    /// Entry points; `None` uses the grid's default corners
    pub spawn_points: Option<Vec<Cell>>,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            stall_threshold: STALL_THRESHOLD,
            spawn_points: None,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_spawn_points(mut self, spawn_points: Vec<Cell>) -> Self {
        self.spawn_points = Some(spawn_points);
        self
    }

    pub fn with_spawn_interval(mut self, spawn_interval: u64) -> Self {
        self.spawn_interval = spawn_interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.spawn_interval == 0 {
            anyhow::bail!("Spawn interval must be at least one tick");
        }
        Ok(())
    }
}

/// The corners vehicles enter from: bottom-left, bottom-right, and the
/// second row from the top on both sides.
pub fn default_spawn_points(width: i32, height: i32) -> Vec<Cell> {
    vec![
        Cell::new(0, 0),
        Cell::new(width - 1, 0),
        Cell::new(0, height - 2),
        Cell::new(width - 1, height - 2),
    ]
}
