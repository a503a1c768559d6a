//! Main simulation world that ties everything together
//!
//! The `Simulation` owns the grid and every live vehicle and drives them
//! one tick at a time: lights first, then spawns, then vehicles, then
//! despawns.

use anyhow::Result;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::HashMap;

use super::city::build_demo_city;
use super::config::{default_spawn_points, SimConfig};
use super::grid::{Grid, Occupant};
use super::snapshot::{self, AgentPosition, LightStatus, WorldSnapshot};
use super::types::{Cell, SimId, VehicleId};
use super::vehicle::{SimVehicle, VehicleUpdateResult};
use super::vehicle_manager;

/// The main simulation world
pub struct Simulation {
    grid: Grid,

    /// All live vehicles
    vehicles: HashMap<VehicleId, SimVehicle>,

    config: SimConfig,

    /// Entry points resolved from the config
    spawn_points: Vec<Cell>,

    /// Number of completed ticks
    tick: u64,

    /// Next ID to assign
    next_id: usize,

    total_spawned: usize,
    total_completed: usize,

    rng: StdRng,
}

impl Simulation {
    /// Build a simulation over a populated grid.
    /// Vehicle numbering starts after `vehicle_count_hint`.
    pub fn with_grid(grid: Grid, config: SimConfig, vehicle_count_hint: usize) -> Result<Self> {
        config.validate()?;

        let spawn_points = config
            .spawn_points
            .clone()
            .unwrap_or_else(|| default_spawn_points(grid.width(), grid.height()));

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            grid,
            vehicles: HashMap::with_capacity(vehicle_count_hint),
            config,
            spawn_points,
            tick: 0,
            next_id: vehicle_count_hint,
            total_spawned: 0,
            total_completed: 0,
            rng,
        })
    }

    /// Create the demo city of the given size with default settings
    pub fn initialize(vehicle_count_hint: usize, width: i32, height: i32) -> Result<Self> {
        Self::initialize_with_config(vehicle_count_hint, width, height, SimConfig::default())
    }

    pub fn initialize_with_config(
        vehicle_count_hint: usize,
        width: i32,
        height: i32,
        config: SimConfig,
    ) -> Result<Self> {
        let grid = build_demo_city(width, height)?;
        Self::with_grid(grid, config, vehicle_count_hint)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn vehicles(&self) -> &HashMap<VehicleId, SimVehicle> {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.get(&vehicle_id)
    }

    pub fn spawn_points(&self) -> &[Cell] {
        &self.spawn_points
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn total_spawned(&self) -> usize {
        self.total_spawned
    }

    pub fn total_completed(&self) -> usize {
        self.total_completed
    }

    /// Place a vehicle heading for a chosen destination.
    /// Fails if the cell is outside the grid or already holds a vehicle.
    pub fn spawn_vehicle(&mut self, at: Cell, destination: Option<Cell>) -> Result<VehicleId> {
        let id = VehicleId(SimId(self.next_id + 1));
        let vehicle =
            vehicle_manager::spawn_vehicle(id, at, destination, &mut self.grid, &mut self.rng)?;
        self.next_id += 1;

        debug!(
            "Spawned vehicle {:?} at {:?} heading for {:?} ({} hops)",
            id,
            at,
            destination,
            vehicle.path.len()
        );

        self.vehicles.insert(id, vehicle);
        self.total_spawned += 1;
        Ok(id)
    }

    /// Try to put one vehicle on each free spawn point
    fn spawn_at_entry_points(&mut self) -> Result<Vec<VehicleId>> {
        let destinations = self.grid.destinations();
        let mut spawned = Vec::new();

        for at in self.spawn_points.clone() {
            if !self.grid.contains(at) {
                warn!("Spawn point {:?} is outside the grid, skipping", at);
                continue;
            }
            if self.grid.has_vehicle(at) {
                debug!("Spawn point {:?} is occupied, skipping this tick", at);
                continue;
            }

            let destination = destinations.choose(&mut self.rng).copied();
            spawned.push(self.spawn_vehicle(at, destination)?);
        }

        Ok(spawned)
    }

    fn update_traffic_lights(&mut self) {
        let tick = self.tick;
        for light in self.grid.traffic_lights_mut() {
            light.step(tick);
        }
    }

    fn is_spawn_tick(&self) -> bool {
        self.tick == 1 || self.tick % self.config.spawn_interval == 0
    }

    /// Remove a vehicle and free its cell
    fn despawn_vehicle(&mut self, vehicle_id: VehicleId) -> Result<()> {
        vehicle_manager::despawn_vehicle(vehicle_id, &mut self.vehicles, &mut self.grid)?;
        Ok(())
    }

    /// Advance the simulation by one tick and return the new tick number.
    /// An error means the grid and the vehicle set disagree.
    pub fn step(&mut self) -> Result<u64> {
        self.tick += 1;

        self.update_traffic_lights();

        if self.is_spawn_tick() {
            self.spawn_at_entry_points()?;
        }

        let results = vehicle_manager::update_vehicles(
            &mut self.vehicles,
            &mut self.grid,
            &mut self.rng,
            self.config.stall_threshold,
        )?;

        for (vehicle_id, result) in results {
            if let VehicleUpdateResult::ArrivedAtDestination(dest) = result {
                debug!("Vehicle {:?} arrived at {:?}", vehicle_id, dest);
                self.despawn_vehicle(vehicle_id)?;
                self.total_completed += 1;
            }
        }

        Ok(self.tick)
    }

    /// Run `ticks` ticks, returning the last tick number
    pub fn run(&mut self, ticks: u64) -> Result<u64> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(self.tick)
    }

    pub fn vehicle_positions(&self) -> Vec<AgentPosition> {
        snapshot::vehicle_positions(&self.grid)
    }

    pub fn obstacle_positions(&self) -> Vec<AgentPosition> {
        snapshot::obstacle_positions(&self.grid)
    }

    pub fn traffic_light_states(&self) -> Vec<LightStatus> {
        snapshot::traffic_light_states(&self.grid)
    }

    pub fn destination_positions(&self) -> Vec<AgentPosition> {
        snapshot::destination_positions(&self.grid)
    }

    pub fn road_positions(&self) -> Vec<AgentPosition> {
        snapshot::road_positions(&self.grid)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        snapshot::capture(&self.grid, self.tick, self.total_completed)
    }

    /// Share of spawned vehicles that reached their destination, in percent
    pub fn success_rate(&self) -> f32 {
        if self.total_spawned > 0 {
            (self.total_completed as f32 / self.total_spawned as f32) * 100.0
        } else {
            0.0
        }
    }

    /// Log the final statistics block
    pub fn log_statistics(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks run: {}", self.tick);
        info!("Total vehicles spawned: {}", self.total_spawned);
        info!("Total vehicles completed: {}", self.total_completed);
        info!("Active vehicles: {}", self.vehicles.len());
        info!("Traffic lights: {}", self.grid.traffic_lights().count());
        info!("Success rate: {:.1}%", self.success_rate());
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Tick: {}", self.tick);
        println!("Grid: {}x{}", self.grid.width(), self.grid.height());
        println!(
            "Vehicles: {} active, {} spawned, {} completed",
            self.vehicles.len(),
            self.total_spawned,
            self.total_completed
        );

        let lights: Vec<_> = self.grid.traffic_lights().collect();
        let open = lights.iter().filter(|(_, light)| light.is_open()).count();
        println!("Traffic lights: {} open / {} total", open, lights.len());

        if !self.vehicles.is_empty() {
            println!("--- Active Vehicles ---");
            let mut vehicles: Vec<_> = self.vehicles.values().collect();
            vehicles.sort_by_key(|vehicle| vehicle.id);
            for vehicle in vehicles {
                println!(
                    "  Vehicle {:?}: position=({}, {}), destination={:?}, path_remaining={}, stalls={}",
                    vehicle.id.0 .0,
                    vehicle.position.x,
                    vehicle.position.y,
                    vehicle.destination.map(|d| (d.x, d.y)),
                    vehicle.path.cells_from(vehicle.position).len().saturating_sub(1),
                    vehicle.stall_count
                );
            }
        }
    }

    /// Draw a visual map of the world in the terminal, top row first
    pub fn draw_map(&self) {
        println!("\n=== World Map ===");
        println!("Legend: ><^v=Road, #=Obstacle, D=Destination, G/R=Open/Closed light, C=Vehicle");
        println!();
        for y in (0..self.grid.height()).rev() {
            let line: String = (0..self.grid.width())
                .map(|x| map_symbol(self.grid.get(Cell::new(x, y)).unwrap_or(&[])))
                .collect();
            println!("{}", line);
        }
        println!();
    }
}

/// Vehicles are drawn over everything else, then lights, destinations,
/// obstacles and roads
fn map_symbol(occupants: &[Occupant]) -> char {
    let mut symbol = ' ';
    let mut rank = 0;
    for occupant in occupants {
        let (candidate, candidate_rank) = match occupant {
            Occupant::Vehicle(_) => ('C', 5),
            Occupant::TrafficLight(light) if light.is_open() => ('G', 4),
            Occupant::TrafficLight(_) => ('R', 4),
            Occupant::Destination => ('D', 3),
            Occupant::Obstacle => ('#', 2),
            Occupant::Road(direction) => (direction.arrow(), 1),
        };
        if candidate_rank > rank {
            symbol = candidate;
            rank = candidate_rank;
        }
    }
    symbol
}
