//! Sparse cell storage.
//!
//! `DictGrid` maps a `CellKey` to the source expression of that cell. Missing
//! keys are empty cells. Besides the cell map it owns everything that gets
//! persisted with a grid: its shape, the attribute log, the macro text and the
//! row heights / column widths.

use cubesheet_core::{CellKey, Shape};
use rustc_hash::FxHashMap;

use crate::attributes::CellAttributes;
use crate::error::GridError;

#[derive(Debug, Clone)]
pub struct DictGrid {
    cells: FxHashMap<CellKey, String>,
    shape: Shape,
    pub cell_attributes: CellAttributes,
    pub macros: String,
    /// Keyed by (row, table)
    pub row_heights: FxHashMap<(usize, usize), f64>,
    /// Keyed by (col, table)
    pub col_widths: FxHashMap<(usize, usize), f64>,
}

impl DictGrid {
    pub fn new(shape: Shape, cell_attributes: CellAttributes) -> Self {
        Self {
            cells: FxHashMap::default(),
            shape,
            cell_attributes,
            macros: String::new(),
            row_heights: FxHashMap::default(),
            col_widths: FxHashMap::default(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Replace the shape without touching stored cells.
    ///
    /// Callers that shrink the grid must purge out-of-bounds cells first.
    pub(crate) fn set_shape_unchecked(&mut self, shape: Shape) {
        self.shape = shape;
    }

    fn check_bounds(&self, key: &CellKey) -> Result<(), GridError> {
        if self.shape.contains(key) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds { key: *key, shape: self.shape })
        }
    }

    /// Source expression of a cell, or None for an empty cell.
    pub fn get(&self, key: &CellKey) -> Result<Option<&str>, GridError> {
        self.check_bounds(key)?;
        Ok(self.cells.get(key).map(String::as_str))
    }

    /// Store `code` at `key`. None or an empty string deletes the cell.
    pub fn set(&mut self, key: CellKey, code: Option<String>) -> Result<(), GridError> {
        self.check_bounds(&key)?;
        match code {
            Some(code) if !code.is_empty() => {
                self.cells.insert(key, code);
            }
            _ => {
                self.cells.remove(&key);
            }
        }
        Ok(())
    }

    /// Remove a cell, returning its source expression if there was one.
    pub fn remove(&mut self, key: &CellKey) -> Option<String> {
        self.cells.remove(key)
    }

    pub fn contains_key(&self, key: &CellKey) -> bool {
        self.cells.contains_key(key)
    }

    /// Keys of all non-empty cells, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &CellKey> + '_ {
        self.cells.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &String)> + '_ {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row height for (row, table), if one was set.
    pub fn row_height(&self, row: usize, table: usize) -> Option<f64> {
        self.row_heights.get(&(row, table)).copied()
    }

    /// Column width for (col, table), if one was set.
    pub fn col_width(&self, col: usize, table: usize) -> Option<f64> {
        self.col_widths.get(&(col, table)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> DictGrid {
        DictGrid::new(Shape::new(10, 10, 2), CellAttributes::default())
    }

    #[test]
    fn test_missing_is_none() {
        let g = grid();
        assert_eq!(g.get(&CellKey::new(1, 2, 1)).unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let mut g = grid();
        g.set(CellKey::new(1, 2, 1), Some("7".to_string())).unwrap();
        assert_eq!(g.get(&CellKey::new(1, 2, 1)).unwrap(), Some("7"));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_empty_value_deletes() {
        let mut g = grid();
        let key = CellKey::new(0, 0, 0);
        g.set(key, Some("1".to_string())).unwrap();
        g.set(key, Some(String::new())).unwrap();
        assert!(!g.contains_key(&key));
        g.set(key, Some("1".to_string())).unwrap();
        g.set(key, None).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn test_out_of_bounds_read_and_write() {
        let mut g = grid();
        let key = CellKey::new(10, 0, 0);
        assert_eq!(
            g.get(&key),
            Err(GridError::OutOfBounds { key, shape: Shape::new(10, 10, 2) })
        );
        assert!(g.set(CellKey::new(0, 0, 2), Some("1".to_string())).is_err());
    }

    #[test]
    fn test_row_heights_and_col_widths() {
        let mut g = grid();
        g.row_heights.insert((3, 0), 40.0);
        g.col_widths.insert((1, 1), 99.5);
        assert_eq!(g.row_height(3, 0), Some(40.0));
        assert_eq!(g.row_height(3, 1), None);
        assert_eq!(g.col_width(1, 1), Some(99.5));
    }
}
