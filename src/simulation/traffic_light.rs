//! Traffic light logic for the traffic simulation
//!
//! A light toggles between open and closed on a fixed period and never
//! looks at the vehicles around it.

use anyhow::Result;

use super::types::LightId;

/// A traffic light occupying one grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficLight {
    pub id: LightId,
    /// `true` lets vehicles through
    pub open: bool,
    /// Ticks between toggles
    pub period: u32,
}

impl TrafficLight {
    pub fn new(id: LightId, open: bool, period: u32) -> Result<Self> {
        if period == 0 {
            anyhow::bail!("Traffic light {:?} needs a period of at least one tick", id);
        }
        Ok(Self { id, open, period })
    }

    /// Advance the light for the given (1-based) tick number.
    /// The light flips on every tick that is a multiple of its period.
    pub fn step(&mut self, tick: u64) {
        if tick % u64::from(self.period) == 0 {
            self.open = !self.open;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
