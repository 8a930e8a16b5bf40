#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Walkability grid and A* pathfinder used to validate tower placement.
//!
//! Routes cost one per cardinal step and are searched with a Manhattan
//! heuristic. Failure to find a route is an ordinary `None`, never a panic.

use gridguard_core::CellCoord;
use pathfinding::prelude::astar;

/// Dense walkable/blocked flags over a fixed-size tile map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl Grid {
    /// Creates a grid where every cell is walkable.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let cells = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(width, height)| width.checked_mul(height))
            .unwrap_or(0);
        Self {
            width,
            height,
            walkable: vec![true; cells],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Reports whether the cell can be walked on. Cells outside the grid never can.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    /// Updates the walkable flag, returning the previous value.
    ///
    /// Cells outside the grid are ignored and report `None`.
    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) -> Option<bool> {
        let index = self.index(cell)?;
        let slot = self.walkable.get_mut(index)?;
        Some(std::mem::replace(slot, walkable))
    }

    /// Walkable cardinal neighbours of `cell`, in north, east, south, west order.
    pub fn walkable_neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        neighbors(cell, self.width, self.height).filter(move |neighbor| self.is_walkable(*neighbor))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// A* search over a [`Grid`] with an established spawn and goal.
#[derive(Clone, Debug)]
pub struct Pathfinder {
    grid: Grid,
    spawn: CellCoord,
    goal: CellCoord,
}

impl Pathfinder {
    /// Creates a pathfinder over `grid` guarding the route from `spawn` to `goal`.
    #[must_use]
    pub fn new(grid: Grid, spawn: CellCoord, goal: CellCoord) -> Self {
        Self { grid, spawn, goal }
    }

    /// Read-only access to the walkability grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Updates the walkable flag of a cell, returning the previous value.
    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) -> Option<bool> {
        self.grid.set_walkable(cell, walkable)
    }

    /// Established spawn cell.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        self.spawn
    }

    /// Established goal cell.
    #[must_use]
    pub const fn goal(&self) -> CellCoord {
        self.goal
    }

    /// Lowest-cost walkable route from `start` to `end`, both inclusive.
    ///
    /// Returns `None` when either endpoint is blocked or no route exists.
    #[must_use]
    pub fn find_path(&self, start: CellCoord, end: CellCoord) -> Option<Vec<CellCoord>> {
        if !self.grid.is_walkable(start) || !self.grid.is_walkable(end) {
            return None;
        }

        astar(
            &start,
            |cell| {
                self.grid
                    .walkable_neighbors(*cell)
                    .map(|neighbor| (neighbor, 1u32))
            },
            |cell| cell.manhattan_distance(end),
            |cell| *cell == end,
        )
        .map(|(path, _cost)| path)
    }

    /// Reports whether the spawn still reaches the goal.
    #[must_use]
    pub fn path_exists(&self) -> bool {
        self.find_path(self.spawn, self.goal).is_some()
    }

    /// Reports whether blocking `cell` keeps the spawn connected to the goal.
    ///
    /// The cell is blocked provisionally and restored before returning, so the
    /// grid is unchanged afterwards whatever the outcome.
    pub fn can_place_tower(&mut self, cell: CellCoord) -> bool {
        let Some(previous) = self.grid.set_walkable(cell, false) else {
            return false;
        };
        let connected = self.path_exists();
        let _ = self.grid.set_walkable(cell, previous);
        connected
    }
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
