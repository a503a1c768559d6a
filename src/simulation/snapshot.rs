//! Read-only projections of the world for a presentation layer
//!
//! Positions use the `{id, x, y, z}` layout a 3D client expects: the grid
//! lies on the ground plane, so `y` is always 0 and `z` is the grid row.

use serde::Serialize;

use super::grid::{Grid, Occupant};
use super::types::Cell;

/// Position of a single agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentPosition {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl AgentPosition {
    pub fn new(id: String, cell: Cell) -> Self {
        Self {
            id,
            x: cell.x,
            y: 0,
            z: cell.y,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.z)
    }
}

/// Position and state of a traffic light
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightStatus {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// `true` when open
    pub state: bool,
}

/// Everything a client needs to draw one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub completed: usize,
    pub vehicles: Vec<AgentPosition>,
    pub traffic_lights: Vec<LightStatus>,
    pub obstacles: Vec<AgentPosition>,
    pub destinations: Vec<AgentPosition>,
    pub roads: Vec<AgentPosition>,
}

/// Static occupants have no id of their own; name them after their cell
fn cell_id(prefix: &str, grid: &Grid, cell: Cell) -> String {
    format!("{}_{}", prefix, cell.y * grid.width() + cell.x)
}

fn positions_where<F>(grid: &Grid, prefix: &str, mut matches: F) -> Vec<AgentPosition>
where
    F: FnMut(&Occupant) -> bool,
{
    grid.iter()
        .filter(|(_, occupants)| occupants.iter().any(&mut matches))
        .map(|(cell, _)| AgentPosition::new(cell_id(prefix, grid, cell), cell))
        .collect()
}

/// Vehicle positions, ordered by vehicle id
pub fn vehicle_positions(grid: &Grid) -> Vec<AgentPosition> {
    let mut vehicles: Vec<_> = grid
        .iter()
        .flat_map(|(cell, occupants)| {
            occupants.iter().filter_map(move |occupant| match occupant {
                Occupant::Vehicle(id) => Some((*id, cell)),
                _ => None,
            })
        })
        .collect();
    vehicles.sort();

    vehicles
        .into_iter()
        .map(|(id, cell)| AgentPosition::new(format!("car_{}", id.0 .0), cell))
        .collect()
}

pub fn traffic_light_states(grid: &Grid) -> Vec<LightStatus> {
    grid.traffic_lights()
        .map(|(cell, light)| LightStatus {
            id: format!("tl_{}", light.id.0 .0),
            x: cell.x,
            y: 0,
            z: cell.y,
            state: light.is_open(),
        })
        .collect()
}

pub fn obstacle_positions(grid: &Grid) -> Vec<AgentPosition> {
    positions_where(grid, "ob", |o| matches!(o, Occupant::Obstacle))
}

pub fn destination_positions(grid: &Grid) -> Vec<AgentPosition> {
    positions_where(grid, "d", |o| matches!(o, Occupant::Destination))
}

pub fn road_positions(grid: &Grid) -> Vec<AgentPosition> {
    positions_where(grid, "r", |o| matches!(o, Occupant::Road(_)))
}

/// Capture every projection at once
pub fn capture(grid: &Grid, tick: u64, completed: usize) -> WorldSnapshot {
    WorldSnapshot {
        tick,
        completed,
        vehicles: vehicle_positions(grid),
        traffic_lights: traffic_light_states(grid),
        obstacles: obstacle_positions(grid),
        destinations: destination_positions(grid),
        roads: road_positions(grid),
    }
}
