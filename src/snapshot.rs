use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{
    grid::Grid,
    platform::{self, Cell, Platform},
    simulator::Lookback,
};

/// Until we know how long the run is, don't reserve room for more snapshots than this.
const INITIAL_RESERVE: usize = 64;

/// Fingerprint a layout's cells.
///
/// Equal layouts always share a fingerprint; unequal layouts almost never do.
fn fingerprint(cells: &[Cell]) -> u64 {
    let mut hasher = DefaultHasher::new();
    cells.hash(&mut hasher);
    hasher.finish()
}

/// An immutable copy of a platform's layout at one point in time.
///
/// Snapshots compare by value: two are equal when every cell matches.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot(Grid<Cell>);

impl Snapshot {
    pub(crate) fn new(grid: Grid<Cell>) -> Self {
        Self(grid)
    }

    pub(crate) fn into_grid(self) -> Grid<Cell> {
        self.0
    }

    pub fn width(&self) -> usize {
        self.0.width()
    }

    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.0.get(x, y).copied()
    }

    pub fn north_load(&self) -> u64 {
        platform::north_load(&self.0)
    }

    pub fn fingerprint(&self) -> u64 {
        fingerprint(self.0.as_slice())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A bounded, append-only record of layouts, one per completed cycle.
///
/// All entries live back to back in a single buffer; entry `k` occupies
/// `cells[k * area..(k + 1) * area]`.
#[derive(Debug, Clone)]
pub struct History {
    width: usize,
    height: usize,
    capacity: usize,
    cells: Vec<Cell>,
    fingerprints: Vec<u64>,
}

impl History {
    /// Make room for up to `capacity` layouts of `width * height` cells.
    pub fn new(width: usize, height: usize, capacity: usize) -> Self {
        let reserve = capacity.min(INITIAL_RESERVE);
        Self {
            width,
            height,
            capacity,
            cells: Vec::with_capacity(reserve * width * height),
            fingerprints: Vec::with_capacity(reserve),
        }
    }

    fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Record the platform's current layout, returning its index.
    ///
    /// Returns `None` without recording anything if the history is full or the
    /// platform's dimensions don't match.
    pub fn push(&mut self, platform: &Platform) -> Option<usize> {
        if self.is_full() || platform.width() != self.width || platform.height() != self.height {
            return None;
        }
        let cells = platform.cells();
        self.cells.extend_from_slice(cells);
        self.fingerprints.push(fingerprint(cells));
        Some(self.len() - 1)
    }

    fn cells(&self, index: usize) -> &[Cell] {
        let area = self.area();
        &self.cells[index * area..(index + 1) * area]
    }

    /// Copy the layout at `index` out of the history.
    ///
    /// # Panics
    ///
    /// If `index` is not less than [`len`][Self::len].
    pub fn snapshot(&self, index: usize) -> Snapshot {
        let cells = self.cells(index).to_vec();
        let grid = Grid::from_cells(self.width, self.height, cells)
            .expect("every history entry holds exactly one layout");
        Snapshot::new(grid)
    }
}

impl Lookback for History {
    fn len(&self) -> usize {
        self.fingerprints.len()
    }

    fn fingerprint(&self, index: usize) -> u64 {
        self.fingerprints[index]
    }

    fn same(&self, a: usize, b: usize) -> bool {
        self.cells(a) == self.cells(b)
    }
}
