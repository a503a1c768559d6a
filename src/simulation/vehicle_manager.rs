//! Vehicle spawning and management for the traffic simulation
//!
//! This module contains functions for spawning, despawning, and updating vehicles.
//! It separates vehicle bookkeeping from the scheduler in `world`.

use anyhow::{Context, Result};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use super::grid::Grid;
use super::pathfinder::{find_route, Path, Traversal};
use super::types::{Cell, VehicleId, MAX_AGGRESSIVENESS};
use super::vehicle::{SimVehicle, VehicleUpdateResult};

/// Spawn a vehicle at a cell heading for an optional destination
///
/// # Arguments
/// * `vehicle_id` - The pre-generated vehicle ID
/// * `at` - The spawn cell, which must not already hold a vehicle
/// * `destination` - Where the vehicle is going; `None` spawns it without a route
/// * `grid` - The grid to place the vehicle on and plan the route over
/// * `rng` - Source for the vehicle's aggressiveness
///
/// Returns the new vehicle if successful
pub fn spawn_vehicle<R: Rng>(
    vehicle_id: VehicleId,
    at: Cell,
    destination: Option<Cell>,
    grid: &mut Grid,
    rng: &mut R,
) -> Result<SimVehicle> {
    grid.cell_index(at).context("Spawn point outside the grid")?;
    if grid.has_vehicle(at) {
        anyhow::bail!("Spawn point {:?} is already occupied by a vehicle", at);
    }

    let path = match destination {
        Some(goal) => find_route(grid, at, goal, Traversal::Planning).unwrap_or_else(|| {
            debug!("No route from {:?} to {:?}, vehicle {:?} will wait", at, goal, vehicle_id);
            Path::default()
        }),
        None => {
            debug!("No destinations on the map, vehicle {:?} spawns without a route", vehicle_id);
            Path::default()
        }
    };

    let aggressiveness = rng.random_range(0..=MAX_AGGRESSIVENESS);
    grid.place_vehicle(at, vehicle_id)?;

    Ok(SimVehicle::new(vehicle_id, at, destination, path, aggressiveness))
}

/// Despawn a vehicle and free its grid cell
///
/// Returns the removed vehicle, or `None` if it was not live
pub fn despawn_vehicle(
    vehicle_id: VehicleId,
    vehicles: &mut HashMap<VehicleId, SimVehicle>,
    grid: &mut Grid,
) -> Result<Option<SimVehicle>> {
    let Some(vehicle) = vehicles.remove(&vehicle_id) else {
        return Ok(None);
    };
    grid.remove_vehicle(vehicle.position, vehicle_id)?;
    Ok(Some(vehicle))
}

/// Update all vehicles in the simulation, each exactly once, in a shuffled order
///
/// Returns a list of (vehicle_id, result) tuples for vehicles that need special handling
pub fn update_vehicles<R: Rng>(
    vehicles: &mut HashMap<VehicleId, SimVehicle>,
    grid: &mut Grid,
    rng: &mut R,
    stall_threshold: u32,
) -> Result<Vec<(VehicleId, VehicleUpdateResult)>> {
    let mut results = Vec::new();

    // Sort before shuffling so a seeded RNG gives a reproducible order
    let mut vehicle_ids: Vec<VehicleId> = vehicles.keys().copied().collect();
    vehicle_ids.sort();
    vehicle_ids.shuffle(rng);

    for vehicle_id in vehicle_ids {
        let vehicle = vehicles
            .get_mut(&vehicle_id)
            .context("Vehicle vanished during update")?;

        let result = vehicle.update(grid, rng, stall_threshold)?;
        if let VehicleUpdateResult::ArrivedAtDestination(_) = result {
            results.push((vehicle_id, result));
        }
    }

    Ok(results)
}
