//! The city grid
//!
//! A bounded, non-wrapping 2D space where every cell holds an ordered list
//! of occupants: road segments, traffic lights, obstacles, destinations
//! and vehicles.

use anyhow::{Context, Result};

use super::traffic_light::TrafficLight;
use super::types::{Cell, Direction, LightId, SimId, VehicleId};

/// Anything that can sit in a grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    Road(Direction),
    TrafficLight(TrafficLight),
    Obstacle,
    Destination,
    Vehicle(VehicleId),
}

/// Bounded multi-occupancy grid
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    /// Row-major, indexed by `y * width + x`
    cells: Vec<Vec<Occupant>>,
    next_light_id: usize,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            anyhow::bail!("Grid dimensions must be positive, got {}x{}", width, height);
        }
        let size = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![Vec::new(); size],
            next_light_id: 0,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some((cell.y * self.width + cell.x) as usize)
        } else {
            None
        }
    }

    /// Linear index of a cell, used for stable ids of static occupants.
    /// Errors on an out-of-bounds cell.
    pub fn cell_index(&self, cell: Cell) -> Result<usize> {
        self.index(cell)
            .with_context(|| format!("Cell {:?} is outside the {}x{} grid", cell, self.width, self.height))
    }

    /// Occupants of a cell, or `None` when the cell is outside the grid
    pub fn get(&self, cell: Cell) -> Option<&[Occupant]> {
        self.index(cell).map(|idx| self.cells[idx].as_slice())
    }

    fn cell_mut(&mut self, cell: Cell) -> Result<&mut Vec<Occupant>> {
        let idx = self.cell_index(cell)?;
        Ok(&mut self.cells[idx])
    }

    fn place(&mut self, cell: Cell, occupant: Occupant) -> Result<()> {
        self.cell_mut(cell)?.push(occupant);
        Ok(())
    }

    pub fn place_road(&mut self, cell: Cell, direction: Direction) -> Result<()> {
        self.place(cell, Occupant::Road(direction))
    }

    pub fn place_obstacle(&mut self, cell: Cell) -> Result<()> {
        self.place(cell, Occupant::Obstacle)
    }

    pub fn place_destination(&mut self, cell: Cell) -> Result<()> {
        self.place(cell, Occupant::Destination)
    }

    /// Add a traffic light with its initial state and toggle period
    pub fn place_traffic_light(&mut self, cell: Cell, open: bool, period: u32) -> Result<LightId> {
        let id = LightId(SimId(self.next_light_id));
        let light = TrafficLight::new(id, open, period)?;
        self.place(cell, Occupant::TrafficLight(light))?;
        self.next_light_id += 1;
        Ok(id)
    }

    pub(crate) fn place_vehicle(&mut self, cell: Cell, vehicle_id: VehicleId) -> Result<()> {
        if self.has_vehicle(cell) {
            anyhow::bail!("Cell {:?} already holds a vehicle", cell);
        }
        self.place(cell, Occupant::Vehicle(vehicle_id))
    }

    pub(crate) fn remove_vehicle(&mut self, cell: Cell, vehicle_id: VehicleId) -> Result<()> {
        let occupants = self.cell_mut(cell)?;
        let slot = occupants
            .iter()
            .position(|occupant| *occupant == Occupant::Vehicle(vehicle_id))
            .with_context(|| format!("Vehicle {:?} not found at {:?}", vehicle_id, cell))?;
        occupants.remove(slot);
        Ok(())
    }

    pub(crate) fn move_vehicle(&mut self, vehicle_id: VehicleId, from: Cell, to: Cell) -> Result<()> {
        if from == to {
            return Ok(());
        }
        self.cell_index(to)?;
        self.remove_vehicle(from, vehicle_id)?;
        self.place_vehicle(to, vehicle_id)
    }

    pub fn has_vehicle(&self, cell: Cell) -> bool {
        self.get(cell)
            .is_some_and(|occupants| occupants.iter().any(|o| matches!(o, Occupant::Vehicle(_))))
    }

    pub fn vehicle_count(&self, cell: Cell) -> usize {
        self.get(cell).map_or(0, |occupants| {
            occupants
                .iter()
                .filter(|o| matches!(o, Occupant::Vehicle(_)))
                .count()
        })
    }

    pub fn has_obstacle(&self, cell: Cell) -> bool {
        self.get(cell)
            .is_some_and(|occupants| occupants.contains(&Occupant::Obstacle))
    }

    /// Direction of the first road segment in the cell, if any
    pub fn road_direction(&self, cell: Cell) -> Option<Direction> {
        self.get(cell)?.iter().find_map(|occupant| match occupant {
            Occupant::Road(direction) => Some(*direction),
            _ => None,
        })
    }

    pub fn traffic_light(&self, cell: Cell) -> Option<&TrafficLight> {
        self.get(cell)?.iter().find_map(|occupant| match occupant {
            Occupant::TrafficLight(light) => Some(light),
            _ => None,
        })
    }

    pub fn has_closed_light(&self, cell: Cell) -> bool {
        self.traffic_light(cell).is_some_and(|light| !light.is_open())
    }

    /// Whether the cell carries anything a vehicle can drive on
    pub fn is_drivable(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(|occupants| {
            occupants.iter().any(|o| {
                matches!(
                    o,
                    Occupant::Road(_) | Occupant::TrafficLight(_) | Occupant::Destination
                )
            })
        })
    }

    /// All destination cells in row-major order
    pub fn destinations(&self) -> Vec<Cell> {
        self.iter()
            .filter(|(_, occupants)| occupants.contains(&Occupant::Destination))
            .map(|(cell, _)| cell)
            .collect()
    }

    pub fn traffic_lights(&self) -> impl Iterator<Item = (Cell, &TrafficLight)> {
        self.iter().flat_map(|(cell, occupants)| {
            occupants.iter().filter_map(move |occupant| match occupant {
                Occupant::TrafficLight(light) => Some((cell, light)),
                _ => None,
            })
        })
    }

    pub fn traffic_lights_mut(&mut self) -> impl Iterator<Item = &mut TrafficLight> {
        self.cells.iter_mut().flatten().filter_map(|occupant| match occupant {
            Occupant::TrafficLight(light) => Some(light),
            _ => None,
        })
    }

    /// Every cell with its occupants, in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &[Occupant])> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(idx, occupants)| {
            let idx = idx as i32;
            (Cell::new(idx % width, idx / width), occupants.as_slice())
        })
    }
}
