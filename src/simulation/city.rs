//! Built-in demo city
//!
//! Map files are loaded elsewhere; this lays out a small city in code so the
//! headless driver and tests have something to run on.
//!
//! Layout: a one-way counter-clockwise ring road along the border, a
//! two-lane avenue across the middle in each axis, traffic lights on the
//! avenue approaches to the central crossing, four destinations tucked into
//! the blocks and obstacles (buildings) everywhere else.

use anyhow::Result;

use super::grid::Grid;
use super::types::{Cell, Direction, DEFAULT_LIGHT_PERIOD};

/// Smallest side length that leaves room for blocks between the roads
pub const MIN_CITY_SIZE: i32 = 8;

pub fn build_demo_city(width: i32, height: i32) -> Result<Grid> {
    if width < MIN_CITY_SIZE || height < MIN_CITY_SIZE {
        anyhow::bail!(
            "Demo city needs at least {}x{} cells, got {}x{}",
            MIN_CITY_SIZE,
            MIN_CITY_SIZE,
            width,
            height
        );
    }

    let mut grid = Grid::new(width, height)?;
    let mid_x = width / 2;
    let mid_y = height / 2;

    // Lights sit on the four avenue cells leading into the central crossing
    let lights = [
        (Cell::new(mid_x - 1, mid_y), false),
        (Cell::new(mid_x + 2, mid_y + 1), false),
        (Cell::new(mid_x + 1, mid_y - 1), true),
        (Cell::new(mid_x, mid_y + 2), true),
    ];

    let destinations = [
        Cell::new(mid_x / 2, 1),
        Cell::new(width - 2, mid_y / 2),
        Cell::new(mid_x + 1 + (width - mid_x - 2) / 2, height - 2),
        Cell::new(1, mid_y + 1 + (height - mid_y - 2) / 2),
    ];

    for y in 0..height {
        for x in 0..width {
            let cell = Cell::new(x, y);

            if let Some((_, open)) = lights.iter().find(|(light, _)| *light == cell) {
                grid.place_traffic_light(cell, *open, DEFAULT_LIGHT_PERIOD)?;
            } else if let Some(direction) = road_at(cell, width, height) {
                grid.place_road(cell, direction)?;
            } else if destinations.contains(&cell) {
                grid.place_destination(cell)?;
            } else {
                grid.place_obstacle(cell)?;
            }
        }
    }

    Ok(grid)
}

/// Road direction for a cell of the demo layout, `None` for block cells
fn road_at(cell: Cell, width: i32, height: i32) -> Option<Direction> {
    let (x, y) = (cell.x, cell.y);
    let mid_x = width / 2;
    let mid_y = height / 2;

    // Ring road, counter-clockwise
    if y == 0 && x < width - 1 {
        return Some(Direction::Right);
    }
    if x == width - 1 && y < height - 1 {
        return Some(Direction::Up);
    }
    if y == height - 1 && x > 0 {
        return Some(Direction::Left);
    }
    if x == 0 {
        return Some(Direction::Down);
    }

    // Horizontal avenue, eastbound below westbound
    if y == mid_y {
        return Some(Direction::Right);
    }
    if y == mid_y + 1 {
        return Some(Direction::Left);
    }

    // Vertical avenue, southbound left of northbound
    if x == mid_x {
        return Some(Direction::Down);
    }
    if x == mid_x + 1 {
        return Some(Direction::Up);
    }

    None
}
