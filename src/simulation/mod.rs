//! Standalone traffic simulation module
//!
//! Grid, pathfinding, traffic lights, vehicles and the tick scheduler.
//! Everything here runs headless and can be driven from tests or the CLI.

mod city;
mod config;
mod grid;
mod pathfinder;
mod snapshot;
mod traffic_light;
mod types;
mod vehicle;
mod vehicle_manager;
mod world;

// Re-export public types for external use
pub use city::{build_demo_city, MIN_CITY_SIZE};
pub use config::{default_spawn_points, SimConfig};
pub use grid::{Grid, Occupant};
pub use pathfinder::{can_enter, find_path, find_route, Path, Traversal};
pub use snapshot::{AgentPosition, LightStatus, WorldSnapshot};
pub use traffic_light::TrafficLight;
pub use types::{
    Cell, Direction, LightId, SimId, VehicleId, DEFAULT_LIGHT_PERIOD, DEFAULT_SPAWN_INTERVAL,
    DISREGARD_ROLL_RANGE, MAX_AGGRESSIVENESS, STALL_THRESHOLD,
};
pub use vehicle::{SimVehicle, VehicleUpdateResult};
pub use world::Simulation;
