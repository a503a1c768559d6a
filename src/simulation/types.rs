//! Core types for the traffic simulation
//!
//! Identifiers, grid coordinates and lane directions shared by every
//! other simulation module.

use serde::Serialize;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub SimId);

/// A wrapper type for traffic light IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LightId(pub SimId);

/// A cell coordinate on the city grid.
///
/// `x` grows to the right and `y` grows upwards. Whether a cell is inside
/// the grid is decided by [`Grid::contains`](super::Grid::contains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance on the 4-connected grid
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Cell {
        Cell::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in a fixed order (up, down, left, right).
    /// Neighbours may lie outside the grid; callers filter them.
    pub fn neighbors(&self) -> [Cell; 4] {
        [
            self.offset(0, 1),
            self.offset(0, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
        ]
    }

    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.manhattan(other) == 1
    }
}

/// Direction of travel allowed on a road segment, also used as the
/// heading of a vehicle after it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Whether stepping from `from` to `to` is allowed on a road with this direction.
    /// Only a step straight against the flow is forbidden.
    pub fn permits(self, from: Cell, to: Cell) -> bool {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        match self {
            Direction::Right => dx != -1,
            Direction::Left => dx != 1,
            Direction::Up => dy != -1,
            Direction::Down => dy != 1,
        }
    }

    /// Heading derived from a displacement. Horizontal movement wins for
    /// diagonal (lane change) moves; no movement has no heading.
    pub fn from_step(from: Cell, to: Cell) -> Option<Direction> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx > 0 {
            Some(Direction::Right)
        } else if dx < 0 {
            Some(Direction::Left)
        } else if dy > 0 {
            Some(Direction::Up)
        } else if dy < 0 {
            Some(Direction::Down)
        } else {
            None
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn arrow(self) -> char {
        match self {
            Direction::Up => '^',
            Direction::Down => 'v',
            Direction::Left => '<',
            Direction::Right => '>',
        }
    }
}

/// Consecutive non-advancing ticks a vehicle tolerates before re-routing
pub const STALL_THRESHOLD: u32 = 3;

/// Vehicles are spawned on the first tick and then every this many ticks
pub const DEFAULT_SPAWN_INTERVAL: u64 = 10;

/// Upper bound (inclusive) of a vehicle's aggressiveness score
pub const MAX_AGGRESSIVENESS: u32 = 100;

/// Aggressiveness is compared against a roll in `0..DISREGARD_ROLL_RANGE`,
/// so the most aggressive vehicle ignores the rules half of the time.
pub const DISREGARD_ROLL_RANGE: u32 = 200;

/// Ticks between toggles for traffic lights in the demo city
pub const DEFAULT_LIGHT_PERIOD: u32 = 10;
