//! Vehicle movement logic for the traffic simulation
//!
//! Each tick a vehicle looks one hop ahead on its route and decides whether
//! to advance, wait, cut across a lane, or plan a new route around a jam.

use anyhow::{Context, Result};
use log::debug;
use rand::Rng;

use super::grid::Grid;
use super::pathfinder::{find_route, Path, Traversal};
use super::types::{Cell, Direction, VehicleId, DISREGARD_ROLL_RANGE};

/// Result of a vehicle update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    /// No route to follow, nothing happened
    Idle,
    /// Held in place by a vehicle or a red light
    Waiting,
    /// Moved to a new cell
    Moved(Cell),
    /// Reached its destination and should be despawned
    ArrivedAtDestination(Cell),
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub position: Cell,
    pub spawn: Cell,
    /// Chosen at spawn; `None` when the map has no destinations
    pub destination: Option<Cell>,
    pub path: Path,
    /// Weight in `0..=100` for ignoring red lights and cutting across lanes
    pub aggressiveness: u32,
    /// Ticks spent without moving since the last re-route attempt
    pub stall_count: u32,
    /// Heading after the last move
    pub facing: Option<Direction>,
    /// Number of re-route attempts made so far
    pub reroutes: u32,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        spawn: Cell,
        destination: Option<Cell>,
        path: Path,
        aggressiveness: u32,
    ) -> Self {
        Self {
            id,
            position: spawn,
            spawn,
            destination,
            path,
            aggressiveness,
            stall_count: 0,
            facing: None,
            reroutes: 0,
        }
    }

    /// Whether this vehicle ignores the rules on this tick
    fn roll_disregard<R: Rng>(&self, rng: &mut R) -> bool {
        rng.random_range(0..DISREGARD_ROLL_RANGE) < self.aggressiveness
    }

    /// Advance the vehicle by one tick.
    /// Returns VehicleUpdateResult indicating what action should be taken with the vehicle
    pub fn update<R: Rng>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        stall_threshold: u32,
    ) -> Result<VehicleUpdateResult> {
        let position = self.position;
        let Some(planned) = self.path.next(position) else {
            return Ok(VehicleUpdateResult::Idle);
        };

        let disregard = self.roll_disregard(rng);

        let mut next = planned;
        if grid.has_vehicle(planned) || (grid.has_closed_light(planned) && !disregard) {
            next = position;
        }

        if !disregard {
            if let Some(after) = self.path.next(next) {
                if should_change_lane(grid, position, after) {
                    debug!("Vehicle {:?} changing lanes {:?} -> {:?}", self.id, position, after);
                    next = after;
                }
            }
        }

        if next == position {
            self.stall_count += 1;
        }

        if self.stall_count > stall_threshold {
            self.reroute(grid);
        }

        if next != position {
            grid.move_vehicle(self.id, position, next)
                .context("Failed to move vehicle on the grid")?;
        }
        self.facing = Direction::from_step(position, next);
        self.position = next;

        if Some(next) == self.destination {
            return Ok(VehicleUpdateResult::ArrivedAtDestination(next));
        }

        if next == position {
            Ok(VehicleUpdateResult::Waiting)
        } else {
            Ok(VehicleUpdateResult::Moved(next))
        }
    }

    /// Plan a fresh route that steers around other vehicles.
    /// The stall counter resets whether or not a route was found.
    fn reroute(&mut self, grid: &Grid) {
        self.reroutes += 1;
        self.stall_count = 0;

        let Some(destination) = self.destination else {
            return;
        };

        match find_route(grid, self.position, destination, Traversal::AvoidVehicles) {
            Some(path) if !path.is_empty() => {
                debug!(
                    "Vehicle {:?} re-routed from {:?} ({} hops)",
                    self.id,
                    self.position,
                    path.len()
                );
                self.path = path;
            }
            _ => {
                debug!(
                    "Vehicle {:?} stuck at {:?}, no alternative route to {:?}",
                    self.id, self.position, destination
                );
            }
        }
    }
}

/// A lane change skips the next hop and lands on the one after it. It is
/// taken when the road at the current cell runs the same way as the road at
/// the landing cell (or the vehicle is off-road, e.g. just spawned) and the
/// landing cell is sideways from that direction. An occupied landing cell
/// never qualifies.
fn should_change_lane(grid: &Grid, from: Cell, to: Cell) -> bool {
    if grid.has_vehicle(to) {
        return false;
    }

    let target_direction = grid.road_direction(to);
    let aligned = match grid.road_direction(from) {
        None => true,
        Some(direction) => Some(direction) == target_direction,
    };

    aligned && is_sideways(from, to, target_direction)
}

fn is_sideways(from: Cell, to: Cell, direction: Option<Direction>) -> bool {
    match direction {
        Some(direction) if direction.is_vertical() => to.x != from.x,
        Some(_) => to.y != from.y,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{SimId, MAX_AGGRESSIVENESS, STALL_THRESHOLD as STALL_LIMIT};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BLOCKER: VehicleId = VehicleId(SimId(99));

    /// 5x5 grid with eastbound lanes on the given rows and a destination at the east end of each
    fn lanes(rows: &[i32]) -> Grid {
        let mut grid = Grid::new(5, 5).unwrap();
        for &y in rows {
            for x in 0..5 {
                grid.place_road(Cell::new(x, y), Direction::Right).unwrap();
            }
            grid.place_destination(Cell::new(4, y)).unwrap();
        }
        grid
    }

    fn vehicle_with(
        grid: &mut Grid,
        at: Cell,
        destination: Cell,
        path: Path,
        aggressiveness: u32,
    ) -> SimVehicle {
        let id = VehicleId(SimId(1));
        grid.place_vehicle(at, id).unwrap();
        SimVehicle::new(id, at, Some(destination), path, aggressiveness)
    }

    fn calm_vehicle(grid: &mut Grid, at: Cell, destination: Cell, path: Path) -> SimVehicle {
        vehicle_with(grid, at, destination, path, 0)
    }

    /// The disregard roll is the first draw of an update, so a clone of the
    /// rng tells us what the next update will decide
    fn will_disregard(rng: &StdRng, aggressiveness: u32) -> bool {
        let mut peek = rng.clone();
        peek.random_range(0..DISREGARD_ROLL_RANGE) < aggressiveness
    }

    /// Eastbound row at y=2 with a light at (2,2) that stays red
    fn red_light_row() -> Grid {
        let mut grid = Grid::new(5, 5).unwrap();
        for x in [0, 1, 3, 4] {
            grid.place_road(Cell::new(x, 2), Direction::Right).unwrap();
        }
        grid.place_traffic_light(Cell::new(2, 2), false, 1000).unwrap();
        grid.place_destination(Cell::new(4, 2)).unwrap();
        grid
    }

    fn lane_change_path() -> Path {
        Path::from_cells(&[
            Cell::new(0, 1),
            Cell::new(1, 1),
            Cell::new(1, 2),
            Cell::new(2, 2),
        ])
    }

    fn row(y: i32, xs: std::ops::RangeInclusive<i32>) -> Vec<Cell> {
        xs.map(|x| Cell::new(x, y)).collect()
    }

    #[test]
    fn test_vehicle_advances_one_cell() {
        let mut grid = lanes(&[2]);
        let path = Path::from_cells(&row(2, 0..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 2), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(1);

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

        assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(1, 2)));
        assert_eq!(vehicle.position, Cell::new(1, 2));
        assert_eq!(vehicle.facing, Some(Direction::Right));
        assert!(grid.has_vehicle(Cell::new(1, 2)));
        assert!(!grid.has_vehicle(Cell::new(0, 2)));
    }

    #[test]
    fn test_vehicle_waits_behind_another_vehicle() {
        let mut grid = lanes(&[2]);
        grid.place_vehicle(Cell::new(1, 2), BLOCKER).unwrap();
        let path = Path::from_cells(&row(2, 0..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 2), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(2);

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

        assert_eq!(result, VehicleUpdateResult::Waiting);
        assert_eq!(vehicle.position, Cell::new(0, 2));
        assert_eq!(vehicle.stall_count, 1);
        assert_eq!(vehicle.facing, None);
    }

    #[test]
    fn test_vehicle_stops_at_red_light_until_it_opens() {
        let mut grid = red_light_row();
        let path = Path::from_cells(&row(2, 1..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(1, 2), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..3 {
            let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
            assert_eq!(result, VehicleUpdateResult::Waiting);
        }
        assert_eq!(vehicle.stall_count, 3);

        for light in grid.traffic_lights_mut() {
            light.open = true;
        }

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
        assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(2, 2)));
        // Moving does not clear the stall counter; only a re-route does
        assert_eq!(vehicle.stall_count, 3);
    }

    #[test]
    fn test_stall_triggers_single_reroute_around_blocker() {
        let mut grid = lanes(&[1, 2]);
        grid.place_vehicle(Cell::new(1, 2), BLOCKER).unwrap();
        let path = Path::from_cells(&row(2, 0..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 2), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(4);

        for expected in 1..=STALL_LIMIT {
            vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
            assert_eq!(vehicle.stall_count, expected);
            assert_eq!(vehicle.reroutes, 0);
        }

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
        assert_eq!(result, VehicleUpdateResult::Waiting);
        assert_eq!(vehicle.reroutes, 1);
        assert_eq!(vehicle.stall_count, 0);
        assert!(!vehicle.path.contains(Cell::new(1, 2)));
        assert_eq!(vehicle.path.next(Cell::new(0, 2)), Some(Cell::new(0, 1)));

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
        assert!(matches!(result, VehicleUpdateResult::Moved(_)));
        assert_ne!(vehicle.position, Cell::new(0, 2));
    }

    #[test]
    fn test_failed_reroute_keeps_path_and_resets_counter() {
        let mut grid = lanes(&[2]);
        grid.place_vehicle(Cell::new(1, 2), BLOCKER).unwrap();
        let path = Path::from_cells(&row(2, 0..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 2), Cell::new(4, 2), path.clone());
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..=STALL_LIMIT {
            vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
        }

        assert_eq!(vehicle.reroutes, 1);
        assert_eq!(vehicle.stall_count, 0);
        assert_eq!(vehicle.path, path);
        assert_eq!(vehicle.position, Cell::new(0, 2));
    }

    #[test]
    fn test_aggressive_vehicle_runs_red_light_only_when_disregarding() {
        let mut grid = red_light_row();
        let path = Path::from_cells(&row(2, 1..=4));
        let mut vehicle =
            vehicle_with(&mut grid, Cell::new(1, 2), Cell::new(4, 2), path, MAX_AGGRESSIVENESS);
        let mut rng = StdRng::seed_from_u64(11);

        let mut passed = false;
        for _ in 0..64 {
            let disregard = will_disregard(&rng, vehicle.aggressiveness);
            let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
            if disregard {
                assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(2, 2)));
                passed = true;
                break;
            }
            assert_eq!(result, VehicleUpdateResult::Waiting);
        }

        assert!(passed);
        assert_eq!(vehicle.position, Cell::new(2, 2));
        assert!(grid.has_closed_light(Cell::new(2, 2)));
    }

    #[test]
    fn test_aggressive_vehicle_still_waits_behind_vehicle() {
        let mut grid = lanes(&[2]);
        grid.place_vehicle(Cell::new(1, 2), BLOCKER).unwrap();
        let path = Path::from_cells(&row(2, 0..=4));
        let mut vehicle =
            vehicle_with(&mut grid, Cell::new(0, 2), Cell::new(4, 2), path, MAX_AGGRESSIVENESS);
        let mut rng = StdRng::seed_from_u64(12);

        let mut disregarding_ticks = 0;
        for _ in 0..24 {
            if will_disregard(&rng, vehicle.aggressiveness) {
                disregarding_ticks += 1;
            }
            let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
            assert_eq!(result, VehicleUpdateResult::Waiting);
            assert_eq!(vehicle.position, Cell::new(0, 2));
        }

        assert!(disregarding_ticks > 0);
        assert_eq!(grid.vehicle_count(Cell::new(1, 2)), 1);
    }

    #[test]
    fn test_disregarding_vehicle_skips_lane_change() {
        let mut plain_hops = 0;
        let mut lane_changes = 0;

        for seed in 0..32 {
            let mut grid = lanes(&[1, 2]);
            let mut vehicle = vehicle_with(
                &mut grid,
                Cell::new(0, 1),
                Cell::new(4, 2),
                lane_change_path(),
                MAX_AGGRESSIVENESS,
            );
            let mut rng = StdRng::seed_from_u64(seed);

            let disregard = will_disregard(&rng, vehicle.aggressiveness);
            let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

            if disregard {
                assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(1, 1)));
                plain_hops += 1;
            } else {
                assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(1, 2)));
                lane_changes += 1;
            }
        }

        assert!(plain_hops > 0);
        assert!(lane_changes > 0);
    }

    #[test]
    fn test_disregard_rate_follows_aggressiveness() {
        let mut rng = StdRng::seed_from_u64(13);
        let rolls = 20_000;

        for (aggressiveness, low, high) in [(0, 0.0, 0.0), (50, 0.23, 0.27), (100, 0.48, 0.52)] {
            let vehicle = SimVehicle::new(
                VehicleId(SimId(1)),
                Cell::new(0, 0),
                None,
                Path::default(),
                aggressiveness,
            );
            let hits = (0..rolls).filter(|_| vehicle.roll_disregard(&mut rng)).count();
            let rate = hits as f64 / rolls as f64;
            assert!(
                (low..=high).contains(&rate),
                "aggressiveness {} disregarded at rate {}",
                aggressiveness,
                rate
            );
        }
    }

    #[test]
    fn test_lane_change_skips_to_adjacent_lane() {
        let mut grid = lanes(&[1, 2]);
        let path = lane_change_path();
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 1), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(6);

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

        assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(1, 2)));
        assert_eq!(vehicle.facing, Some(Direction::Right));
    }

    #[test]
    fn test_lane_change_suppressed_when_target_occupied() {
        let mut grid = lanes(&[1, 2]);
        grid.place_vehicle(Cell::new(1, 2), BLOCKER).unwrap();
        let path = lane_change_path();
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 1), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(7);

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

        assert_eq!(result, VehicleUpdateResult::Moved(Cell::new(1, 1)));
    }

    #[test]
    fn test_arrival_reported_on_reaching_destination() {
        let mut grid = lanes(&[2]);
        let path = Path::from_cells(&row(2, 3..=4));
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(3, 2), Cell::new(4, 2), path);
        let mut rng = StdRng::seed_from_u64(8);

        let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();

        assert_eq!(result, VehicleUpdateResult::ArrivedAtDestination(Cell::new(4, 2)));
    }

    #[test]
    fn test_vehicle_without_route_is_idle() {
        let mut grid = lanes(&[2]);
        let mut vehicle = calm_vehicle(&mut grid, Cell::new(0, 2), Cell::new(4, 2), Path::default());
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..10 {
            let result = vehicle.update(&mut grid, &mut rng, STALL_LIMIT).unwrap();
            assert_eq!(result, VehicleUpdateResult::Idle);
        }
        assert_eq!(vehicle.stall_count, 0);
        assert_eq!(vehicle.reroutes, 0);
    }
}
