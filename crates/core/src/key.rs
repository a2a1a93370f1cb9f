//! Cell identity and grid extent.
//!
//! A `CellKey` addresses one cell as (row, column, table). A `Shape` holds the
//! number of rows, columns and tables currently available.

use serde::{Deserialize, Serialize};

/// Number of grid dimensions (row, column, table).
pub const AXES: usize = 3;

/// Unique identifier for a cell in a grid.
///
/// Ordering is lexicographic on (row, col, table). Search order uses
/// `reversed()`, which compares table first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
    pub table: usize,
}

impl CellKey {
    #[inline]
    pub fn new(row: usize, col: usize, table: usize) -> Self {
        Self { row, col, table }
    }

    pub fn as_array(&self) -> [usize; AXES] {
        [self.row, self.col, self.table]
    }

    /// Component along `axis` (0 = row, 1 = col, 2 = table).
    pub fn get(&self, axis: usize) -> Option<usize> {
        self.as_array().get(axis).copied()
    }

    /// Copy of this key with the `axis` component replaced.
    pub fn with(&self, axis: usize, value: usize) -> Option<Self> {
        let mut parts = self.as_array();
        *parts.get_mut(axis)? = value;
        Some(Self::from(parts))
    }

    /// Key as (table, col, row), the order used when walking the grid for find.
    pub fn reversed(&self) -> (usize, usize, usize) {
        (self.table, self.col, self.row)
    }
}

impl From<[usize; AXES]> for CellKey {
    fn from(parts: [usize; AXES]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl From<(usize, usize, usize)> for CellKey {
    fn from((row, col, table): (usize, usize, usize)) -> Self {
        Self::new(row, col, table)
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.row, self.col, self.table)
    }
}

/// Extent of a grid: rows x columns x tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
    pub tables: usize,
}

impl Shape {
    #[inline]
    pub fn new(rows: usize, cols: usize, tables: usize) -> Self {
        Self { rows, cols, tables }
    }

    pub fn as_array(&self) -> [usize; AXES] {
        [self.rows, self.cols, self.tables]
    }

    /// Extent along `axis`, or None for an axis beyond the third.
    pub fn extent(&self, axis: usize) -> Option<usize> {
        self.as_array().get(axis).copied()
    }

    /// Copy of this shape with the `axis` extent replaced.
    pub fn with_extent(&self, axis: usize, extent: usize) -> Option<Self> {
        let mut parts = self.as_array();
        *parts.get_mut(axis)? = extent;
        Some(Self::from(parts))
    }

    /// Check if every component of `key` lies inside this shape.
    pub fn contains(&self, key: &CellKey) -> bool {
        key.row < self.rows && key.col < self.cols && key.table < self.tables
    }

    /// Check if any extent is smaller than the corresponding extent in `other`.
    pub fn shrinks_from(&self, other: &Shape) -> bool {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .any(|(new, old)| new < old)
    }

    /// Resolve a possibly negative index on `axis`.
    ///
    /// `-1` is the last row/col/table. Returns None if the index lies outside
    /// `[-extent, extent)`.
    pub fn normalize(&self, axis: usize, index: i64) -> Option<usize> {
        let extent = self.extent(axis)? as i64;
        let resolved = if index < 0 { index + extent } else { index };
        if (0..extent).contains(&resolved) {
            Some(resolved as usize)
        } else {
            None
        }
    }
}

impl From<[usize; AXES]> for Shape {
    fn from(parts: [usize; AXES]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((rows, cols, tables): (usize, usize, usize)) -> Self {
        Self::new(rows, cols, tables)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.rows, self.cols, self.tables)
    }
}
