use std::{fmt, str::FromStr};

use crate::{grid::Grid, snapshot::Snapshot};

/// The contents of a single position on the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    /// A rounded rock (`O`), which rolls when the platform is tilted.
    Movable,
    /// A cube-shaped rock (`#`), which never moves and stops anything rolling into it.
    Fixed,
    /// Nothing at all (`.`).
    #[default]
    Empty,
}

impl TryFrom<char> for Cell {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'O' => Ok(Cell::Movable),
            '#' => Ok(Cell::Fixed),
            '.' => Ok(Cell::Empty),
            other => Err(other),
        }
    }
}

impl From<Cell> for char {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Movable => 'O',
            Cell::Fixed => '#',
            Cell::Empty => '.',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    West,
    South,
    East,
}

impl Direction {
    /// The tilts making up one spin cycle, in order.
    pub const CYCLE: [Direction; 4] = [
        Direction::North,
        Direction::West,
        Direction::South,
        Direction::East,
    ];

    /// `(lane count, cells per lane)` when compacting in this direction.
    fn lanes(self, width: usize, height: usize) -> (usize, usize) {
        match self {
            Direction::North | Direction::South => (width, height),
            Direction::West | Direction::East => (height, width),
        }
    }

    /// Coordinates of the cell `step` positions away from the edge this direction
    /// compacts towards, within `lane`.
    fn position(self, lane: usize, step: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Direction::North => (lane, step),
            Direction::South => (lane, height - 1 - step),
            Direction::West => (step, lane),
            Direction::East => (width - 1 - step, lane),
        }
    }
}

/// A rectangular platform of rocks.
///
/// The dimensions are fixed when the platform is parsed and never change;
/// tilting only rearranges the movable rocks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Platform {
    grid: Grid<Cell>,
}

impl Platform {
    /// Build a platform from rows of text, one character per cell.
    ///
    /// Every row must be as wide as the first, and at least one cell must exist.
    pub fn from_rows<Rows, Row>(rows: Rows) -> Result<Self, Error>
    where
        Rows: IntoIterator<Item = Row>,
        Row: AsRef<str>,
    {
        let mut width = None;
        let mut height = 0;
        let mut cells = Vec::new();

        for (row, line) in rows.into_iter().enumerate() {
            let start = cells.len();
            for (column, ch) in line.as_ref().chars().enumerate() {
                let cell =
                    Cell::try_from(ch).map_err(|found| Error::UnknownCell { row, column, found })?;
                cells.push(cell);
            }

            let found = cells.len() - start;
            let expected = *width.get_or_insert(found);
            if found != expected {
                return Err(Error::Jagged {
                    row,
                    expected,
                    found,
                });
            }
            height += 1;
        }

        let width = width.unwrap_or_default();
        if width == 0 || height == 0 {
            return Err(Error::Empty);
        }
        let grid = Grid::from_cells(width, height, cells).ok_or(Error::Empty)?;
        Ok(Self { grid })
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.grid.get(x, y).copied()
    }

    /// How many cells hold `kind`.
    pub fn count(&self, kind: Cell) -> usize {
        self.grid.as_slice().iter().filter(|&&cell| cell == kind).count()
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        self.grid.as_slice()
    }

    /// Tilt the platform so every movable rock rolls as far as it can towards `direction`.
    ///
    /// This is a single pass over the platform. Each lane keeps a count of the empty
    /// cells seen since its start or its most recent fixed rock; a movable rock is
    /// moved back by exactly that count. Moving a rock leaves an empty cell behind it,
    /// so the count is unchanged by the move.
    pub fn compact(&mut self, direction: Direction) {
        let (width, height) = (self.width(), self.height());
        let (lanes, length) = direction.lanes(width, height);
        let mut spaces = vec![0_usize; lanes];

        for step in 0..length {
            for (lane, space) in spaces.iter_mut().enumerate() {
                let here = direction.position(lane, step, width, height);
                match self.grid[here] {
                    Cell::Fixed => *space = 0,
                    Cell::Empty => *space += 1,
                    Cell::Movable => {
                        if *space != 0 {
                            let there = direction.position(lane, step - *space, width, height);
                            self.grid[there] = Cell::Movable;
                            self.grid[here] = Cell::Empty;
                        }
                    }
                }
            }
        }
    }

    /// Run one spin cycle: tilt north, then west, then south, then east.
    pub fn cycle(&mut self) {
        for direction in Direction::CYCLE {
            self.compact(direction);
        }
    }

    /// The total load on the north support beams in the current layout.
    pub fn north_load(&self) -> u64 {
        north_load(&self.grid)
    }

    /// The north load this platform would have after a single northward tilt.
    ///
    /// Computed without moving anything.
    pub fn north_load_after_tilt(&self) -> u64 {
        let height = self.height();
        let mut spaces = vec![0_usize; self.width()];
        let mut load = 0;

        for (y, row) in self.grid.rows().enumerate() {
            for (space, cell) in spaces.iter_mut().zip(row) {
                match cell {
                    Cell::Movable => load += (height - (y - *space)) as u64,
                    Cell::Fixed => *space = 0,
                    Cell::Empty => *space += 1,
                }
            }
        }

        load
    }

    /// Take an independent copy of the current layout.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.grid.clone())
    }
}

impl From<Snapshot> for Platform {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            grid: snapshot.into_grid(),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<&str> = s.lines().collect();
        while rows.last().is_some_and(|row| row.trim().is_empty()) {
            rows.pop();
        }
        Self::from_rows(rows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.grid, f)
    }
}

/// Each movable rock weighs as many rows as lie between it and the south edge, its own included.
pub(crate) fn north_load(grid: &Grid<Cell>) -> u64 {
    grid.iter()
        .filter(|&(_, &cell)| cell == Cell::Movable)
        .map(|((_, y), _)| (grid.height() - y) as u64)
        .sum()
}

impl fmt::Display for Grid<Cell> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows().enumerate() {
            if y != 0 {
                writeln!(f)?;
            }
            for &cell in row {
                write!(f, "{}", char::from(cell))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("the platform has no cells")]
    Empty,
    #[error("row {row} is {found} cells wide, but the platform is {expected} cells wide")]
    Jagged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell {found:?} at `({column}, {row})`")]
    UnknownCell {
        row: usize,
        column: usize,
        found: char,
    },
}
