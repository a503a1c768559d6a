//! Grid pathfinding
//!
//! A* over the 4-connected grid with unit edge costs and a Manhattan
//! heuristic. The traversable part of the grid is collected into a petgraph
//! graph map first, so the search itself is petgraph's `astar`.

use petgraph::algo::astar;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

use super::grid::{Grid, Occupant};
use super::types::Cell;

/// A route as a map from each cell to the cell that follows it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    hops: HashMap<Cell, Cell>,
}

impl Path {
    /// Build a path from an ordered list of cells, start first
    pub fn from_cells(cells: &[Cell]) -> Self {
        let hops = cells.windows(2).map(|pair| (pair[0], pair[1])).collect();
        Self { hops }
    }

    /// The cell after `cell` on this route
    pub fn next(&self, cell: Cell) -> Option<Cell> {
        self.hops.get(&cell).copied()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.hops.contains_key(&cell)
    }

    /// Number of hops
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// All `(from, to)` hops, in no particular order
    pub fn hops(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        self.hops.iter().map(|(from, to)| (*from, *to))
    }

    /// Walk the route from `start`, returning every visited cell including `start`
    pub fn cells_from(&self, start: Cell) -> Vec<Cell> {
        let mut cells = vec![start];
        let mut current = start;
        while let Some(next) = self.next(current) {
            // hops never repeat a cell, but guard against hand-built cycles
            if cells.len() > self.hops.len() {
                break;
            }
            cells.push(next);
            current = next;
        }
        cells
    }
}

/// Which traversal rules a search uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Route planning at spawn time: vehicles are ignored
    Planning,
    /// Re-route around a stall: cells holding a vehicle are impassable
    AvoidVehicles,
}

/// Whether a vehicle may step from `from` into `to`.
///
/// Roads only forbid steps against their direction. Lights and destinations
/// without a road are always enterable. Obstacles and empty cells never are.
pub fn can_enter(grid: &Grid, from: Cell, to: Cell, traversal: Traversal) -> bool {
    let Some(occupants) = grid.get(to) else {
        return false;
    };

    if occupants.contains(&Occupant::Obstacle) {
        return false;
    }

    if traversal == Traversal::AvoidVehicles
        && occupants.iter().any(|o| matches!(o, Occupant::Vehicle(_)))
    {
        return false;
    }

    if let Some(direction) = grid.road_direction(to) {
        return direction.permits(from, to);
    }

    // no road here, so only a light or a destination makes the cell drivable
    grid.is_drivable(to)
}

/// Find a route from `start` to `goal`.
///
/// Returns `None` when the goal cannot be reached and an empty path when
/// `start == goal`. Every call runs a fresh search.
pub fn find_path<F>(grid: &Grid, start: Cell, goal: Cell, mut can_traverse: F) -> Option<Path>
where
    F: FnMut(Cell, Cell) -> bool,
{
    if !grid.contains(start) || !grid.contains(goal) {
        return None;
    }

    let graph = reachable_graph(grid, start, &mut can_traverse);

    let (_, cells) = astar(
        &graph,
        start,
        |cell| cell == goal,
        |edge| *edge.weight(),
        |cell| cell.manhattan(&goal),
    )?;

    Some(Path::from_cells(&cells))
}

/// Find a route using the standard traversal rules
pub fn find_route(grid: &Grid, start: Cell, goal: Cell, traversal: Traversal) -> Option<Path> {
    find_path(grid, start, goal, |from, to| can_enter(grid, from, to, traversal))
}

/// Breadth-first collection of every edge reachable from `start`.
/// Cells and edges are inserted in a fixed order so searches are reproducible.
fn reachable_graph<F>(grid: &Grid, start: Cell, can_traverse: &mut F) -> DiGraphMap<Cell, u32>
where
    F: FnMut(Cell, Cell) -> bool,
{
    let mut graph = DiGraphMap::new();
    graph.add_node(start);

    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for neighbor in current.neighbors() {
            if !grid.contains(neighbor) || !can_traverse(current, neighbor) {
                continue;
            }
            if !graph.contains_node(neighbor) {
                graph.add_node(neighbor);
                queue.push_back(neighbor);
            }
            graph.add_edge(current, neighbor, 1);
        }
    }

    graph
}
