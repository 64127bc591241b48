//! Grid network: the square street lattice every taxi and passenger lives on.
//!
//! Logical positions are integer lattice indices. World coordinates are
//! `index * cell_size`, which is what a renderer consumes. Distance is
//! Manhattan and paths are axis-aligned, x axis first.

use std::fmt;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::error::GridError;

/// Tolerance used when checking that a world coordinate sits on a lattice line.
const WORLD_EPSILON: f64 = 1e-6;

/// Largest combined x and y span of a lattice. Keeps every Manhattan distance,
/// width and height well inside `u32`.
pub const MAX_GRID_SPAN: u64 = (u32::MAX / 2) as u64;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True when `other` is exactly one cardinal step away.
    pub fn is_adjacent(self, other: GridPosition) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Resource)]
pub struct GridNetwork {
    cell_size: f64,
    min: GridPosition,
    max: GridPosition,
}

impl GridNetwork {
    pub fn new(cell_size: f64, min: GridPosition, max: GridPosition) -> Result<Self, GridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        if min.x > max.x || min.y > max.y {
            return Err(GridError::InvalidBounds { min, max });
        }
        let span = u64::from(min.x.abs_diff(max.x)) + u64::from(min.y.abs_diff(max.y));
        if span > MAX_GRID_SPAN {
            return Err(GridError::TooLarge {
                span,
                limit: MAX_GRID_SPAN,
            });
        }
        Ok(Self { cell_size, min, max })
    }

    pub fn from_config(config: &GridConfig) -> Result<Self, GridError> {
        Self::new(config.cell_size, config.min(), config.max())
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn min(&self) -> GridPosition {
        self.min
    }

    pub fn max(&self) -> GridPosition {
        self.max
    }

    pub fn width(&self) -> u32 {
        self.min.x.abs_diff(self.max.x) + 1
    }

    pub fn height(&self) -> u32 {
        self.min.y.abs_diff(self.max.y) + 1
    }

    pub fn intersection_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        (self.min.x..=self.max.x).contains(&position.x)
            && (self.min.y..=self.max.y).contains(&position.y)
    }

    pub fn distance(&self, a: GridPosition, b: GridPosition) -> u32 {
        a.manhattan(b)
    }

    /// Axis-aligned path from `from` to `to`, both endpoints included.
    ///
    /// The x axis is walked first, then y, so the result always has
    /// `distance(from, to) + 1` nodes and consecutive nodes are adjacent.
    pub fn path(&self, from: GridPosition, to: GridPosition) -> Result<Vec<GridPosition>, GridError> {
        for endpoint in [from, to] {
            if !self.contains(endpoint) {
                return Err(GridError::OutOfBounds(endpoint));
            }
        }

        let mut path = Vec::with_capacity(from.manhattan(to) as usize + 1);
        let mut current = from;
        path.push(current);
        let step_x = (to.x - from.x).signum();
        while current.x != to.x {
            current.x += step_x;
            path.push(current);
        }
        let step_y = (to.y - from.y).signum();
        while current.y != to.y {
            current.y += step_y;
            path.push(current);
        }
        Ok(path)
    }

    /// In-bounds cardinal neighbors in east, west, north, south order.
    pub fn neighbors(&self, position: GridPosition) -> Vec<GridPosition> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .map(|(dx, dy)| GridPosition::new(position.x + dx, position.y + dy))
            .filter(|candidate| self.contains(*candidate))
            .collect()
    }

    pub fn random_valid_position<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPosition {
        GridPosition::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
        )
    }

    /// Nearest lattice point to a world coordinate, clamped into bounds.
    ///
    /// Non-finite input collapses to the lattice origin before clamping.
    pub fn snap(&self, world_x: f64, world_y: f64) -> GridPosition {
        let index = |value: f64| -> i64 {
            let scaled = (value / self.cell_size).round();
            if scaled.is_finite() {
                scaled as i64
            } else {
                0
            }
        };
        GridPosition::new(
            index(world_x).clamp(i64::from(self.min.x), i64::from(self.max.x)) as i32,
            index(world_y).clamp(i64::from(self.min.y), i64::from(self.max.y)) as i32,
        )
    }

    /// Nearest in-bounds lattice point to an arbitrary lattice index.
    pub fn clamp(&self, position: GridPosition) -> GridPosition {
        GridPosition::new(
            position.x.clamp(self.min.x, self.max.x),
            position.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn to_world(&self, position: GridPosition) -> (f64, f64) {
        (
            f64::from(position.x) * self.cell_size,
            f64::from(position.y) * self.cell_size,
        )
    }

    /// A world coordinate is valid when both components are integer
    /// multiples of the cell size inside the lattice bounds.
    pub fn is_valid_world(&self, world_x: f64, world_y: f64) -> bool {
        let lattice_index = |value: f64| -> Option<i32> {
            let scaled = value / self.cell_size;
            if !scaled.is_finite() || (scaled - scaled.round()).abs() > WORLD_EPSILON {
                return None;
            }
            i32::try_from(scaled.round() as i64).ok()
        };
        match (lattice_index(world_x), lattice_index(world_y)) {
            (Some(x), Some(y)) => self.contains(GridPosition::new(x, y)),
            _ => false,
        }
    }
}

impl Default for GridNetwork {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            min: GridPosition::new(-5, -5),
            max: GridPosition::new(5, 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid() -> GridNetwork {
        GridNetwork::new(20.0, GridPosition::new(-5, -5), GridPosition::new(5, 5))
            .expect("valid grid")
    }

    #[test]
    fn path_walks_x_then_y_with_inclusive_endpoints() {
        let grid = grid();
        let from = GridPosition::new(-2, 3);
        let to = GridPosition::new(1, -1);
        let path = grid.path(from, to).expect("path");

        assert_eq!(path.len(), grid.distance(from, to) as usize + 1);
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert_eq!(path[3], GridPosition::new(1, 3));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn path_to_self_is_single_node() {
        let grid = grid();
        let p = GridPosition::new(0, 0);
        assert_eq!(grid.path(p, p).expect("path"), vec![p]);
    }

    #[test]
    fn path_rejects_off_lattice_endpoints() {
        let grid = grid();
        let outside = GridPosition::new(6, 0);
        assert_eq!(
            grid.path(GridPosition::new(0, 0), outside),
            Err(GridError::OutOfBounds(outside))
        );
    }

    #[test]
    fn snap_rounds_and_clamps() {
        let grid = grid();
        assert_eq!(grid.snap(29.0, -11.0), GridPosition::new(1, -1));
        assert_eq!(grid.snap(31.0, 0.0), GridPosition::new(2, 0));
        assert_eq!(grid.snap(10_000.0, -10_000.0), GridPosition::new(5, -5));
        assert_eq!(grid.snap(f64::NAN, f64::INFINITY), GridPosition::new(0, 0));
        assert_eq!(grid.clamp(GridPosition::new(9, -2)), GridPosition::new(5, -2));
    }

    #[test]
    fn world_validity_requires_lattice_multiples() {
        let grid = grid();
        assert!(grid.is_valid_world(40.0, -100.0));
        assert!(!grid.is_valid_world(41.0, 0.0));
        assert!(!grid.is_valid_world(120.0, 0.0));
        assert_eq!(grid.to_world(GridPosition::new(2, -3)), (40.0, -60.0));
    }

    #[test]
    fn corner_has_two_neighbors() {
        let grid = grid();
        let corner = GridPosition::new(5, 5);
        let neighbors = grid.neighbors(corner);
        assert_eq!(
            neighbors,
            vec![GridPosition::new(4, 5), GridPosition::new(5, 4)]
        );
        assert_eq!(grid.neighbors(GridPosition::new(0, 0)).len(), 4);
    }

    #[test]
    fn random_positions_stay_in_bounds() {
        let grid = grid();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(grid.contains(grid.random_valid_position(&mut rng)));
        }
    }

    #[test]
    fn rejects_lattices_whose_distances_overflow() {
        let err = GridNetwork::new(
            1.0,
            GridPosition::new(i32::MIN, i32::MIN),
            GridPosition::new(i32::MAX, i32::MAX),
        )
        .expect_err("span exceeds u32");
        assert!(matches!(err, GridError::TooLarge { limit: MAX_GRID_SPAN, .. }));

        let half = (MAX_GRID_SPAN / 2) as i32;
        let widest = GridNetwork::new(1.0, GridPosition::new(-half, 0), GridPosition::new(half, 0))
            .expect("span at the limit");
        assert_eq!(
            widest.distance(widest.min(), widest.max()) as u64,
            2 * half as u64
        );
    }

    #[test]
    fn rejects_inverted_bounds_and_bad_cell_size() {
        assert!(matches!(
            GridNetwork::new(20.0, GridPosition::new(1, 0), GridPosition::new(0, 0)),
            Err(GridError::InvalidBounds { .. })
        ));
        assert!(matches!(
            GridNetwork::new(0.0, GridPosition::new(0, 0), GridPosition::new(1, 1)),
            Err(GridError::InvalidCellSize(_))
        ));
    }
}
