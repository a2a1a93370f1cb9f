//! Slicing, shape changes and undo wiring on top of `DictGrid`.
//!
//! Every mutation here records an inverse operation in the undo/redo log and
//! closes it with a mark, so one call is one undo step. Shape changes that
//! drop or move cells go through `pop` and `set`, which means each moved or
//! purged cell is its own undo step.

use cubesheet_core::{slice_range, AxisIndex, CellKey, GridIndex, Selection, Shape, AXES};
use rustc_hash::FxHashMap;

use crate::attributes::{AttributeEntry, Attributes, CellAttributes};
use crate::error::GridError;
use crate::options::GridOptions;
use crate::store::DictGrid;
use crate::unredo::{Operation, UnRedo};

/// Values laid out like a sliced subscript: one list level per sliced axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Item(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Leaves in depth-first order.
    pub fn flatten(self) -> Vec<T> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<T>) {
        match self {
            Nested::Item(item) => out.push(item),
            Nested::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

/// Cell keys addressed by a resolved `GridIndex`.
///
/// Only the per-axis index lists are stored. Values are produced afresh on
/// each `map` call, so the same array can be walked any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellArray {
    axes: [Vec<usize>; AXES],
    sliced: [bool; AXES],
}

impl CellArray {
    pub fn is_slice(&self) -> bool {
        self.sliced.iter().any(|s| *s)
    }

    /// Lengths of the sliced axes, outermost first.
    pub fn dims(&self) -> Vec<usize> {
        self.axes
            .iter()
            .zip(self.sliced.iter())
            .filter(|(_, sliced)| **sliced)
            .map(|(indices, _)| indices.len())
            .collect()
    }

    /// Number of addressed cells.
    pub fn len(&self) -> usize {
        self.axes.iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All addressed keys, row-major.
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        let [rows, cols, tables] = &self.axes;
        rows.iter().flat_map(move |&row| {
            cols.iter().flat_map(move |&col| {
                tables.iter().map(move |&table| CellKey::new(row, col, table))
            })
        })
    }

    /// Apply `f` to every key, nesting the results like the subscript.
    pub fn map<T, F>(&self, mut f: F) -> Nested<T>
    where
        F: FnMut(CellKey) -> T,
    {
        self.nest(0, [0; AXES], &mut f)
    }

    fn nest<T, F>(&self, axis: usize, mut key: [usize; AXES], f: &mut F) -> Nested<T>
    where
        F: FnMut(CellKey) -> T,
    {
        if axis == AXES {
            return Nested::Item(f(CellKey::from(key)));
        }

        if self.sliced[axis] {
            let mut items = Vec::with_capacity(self.axes[axis].len());
            for &index in &self.axes[axis] {
                key[axis] = index;
                items.push(self.nest(axis + 1, key, f));
            }
            Nested::List(items)
        } else {
            // Unsliced axes always resolve to exactly one index.
            key[axis] = self.axes[axis][0];
            self.nest(axis + 1, key, f)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataArray {
    dict_grid: DictGrid,
    unredo: UnRedo,
}

impl DataArray {
    pub fn new(shape: Shape, options: &GridOptions) -> Self {
        Self {
            dict_grid: DictGrid::new(
                shape,
                CellAttributes::new(options.default_attributes.clone()),
            ),
            unredo: UnRedo::new(options.max_unredo),
        }
    }

    pub fn dict_grid(&self) -> &DictGrid {
        &self.dict_grid
    }

    pub fn unredo(&self) -> &UnRedo {
        &self.unredo
    }

    pub fn unredo_mut(&mut self) -> &mut UnRedo {
        &mut self.unredo
    }

    pub fn shape(&self) -> Shape {
        self.dict_grid.shape()
    }

    /// Keys of all non-empty cells, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &CellKey> + '_ {
        self.dict_grid.keys()
    }

    pub fn len(&self) -> usize {
        self.dict_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_grid.is_empty()
    }

    pub fn cell_attributes(&self) -> &CellAttributes {
        &self.dict_grid.cell_attributes
    }

    pub fn macros(&self) -> &str {
        &self.dict_grid.macros
    }

    pub fn set_macros(&mut self, macros: impl Into<String>) {
        self.dict_grid.macros = macros.into();
    }

    pub fn row_heights(&self) -> &FxHashMap<(usize, usize), f64> {
        &self.dict_grid.row_heights
    }

    pub fn col_widths(&self) -> &FxHashMap<(usize, usize), f64> {
        &self.dict_grid.col_widths
    }

    pub fn set_row_height(&mut self, row: usize, table: usize, height: f64) {
        self.dict_grid.row_heights.insert((row, table), height);
    }

    pub fn set_col_width(&mut self, col: usize, table: usize, width: f64) {
        self.dict_grid.col_widths.insert((col, table), width);
    }

    /// Resolve negative indices and slices against the current shape.
    pub fn resolve(&self, index: &GridIndex) -> Result<CellArray, GridError> {
        let shape = self.shape();
        let extents = shape.as_array();
        let mut axes: [Vec<usize>; AXES] = Default::default();
        let mut sliced = [false; AXES];

        for (axis, part) in index.axes().into_iter().enumerate() {
            match part {
                AxisIndex::At(i) => {
                    let resolved = shape
                        .normalize(axis, i)
                        .ok_or(GridError::IndexOutOfRange { axis, index: i, shape })?;
                    axes[axis] = vec![resolved];
                }
                AxisIndex::Slice { start, stop, step } => {
                    let range = slice_range(start, stop, step, extents[axis])
                        .ok_or(GridError::ZeroStep)?;
                    axes[axis] = range.collect();
                    sliced[axis] = true;
                }
            }
        }

        Ok(CellArray { axes, sliced })
    }

    /// Source expression of one cell.
    pub fn code(&self, key: &CellKey) -> Result<Option<&str>, GridError> {
        self.dict_grid.get(key)
    }

    /// Source expressions addressed by `index`.
    pub fn get(&self, index: impl Into<GridIndex>) -> Result<Nested<Option<String>>, GridError> {
        let cells = self.resolve(&index.into())?;
        Ok(cells.map(|key| self.dict_grid.get(&key).ok().flatten().map(str::to_string)))
    }

    /// Write `code` to every cell addressed by `index`. Empty code deletes.
    ///
    /// All changed cells go into one undo step. Cells that already hold
    /// `code` are left out; if nothing changes nothing is logged.
    pub fn set(&mut self, index: impl Into<GridIndex>, code: &str) -> Result<(), GridError> {
        let cells = self.resolve(&index.into())?;
        let new = (!code.is_empty()).then(|| code.to_string());

        let mut undo = Vec::new();
        let mut redo = Vec::new();
        for key in cells.keys() {
            let old = self.dict_grid.get(&key)?.map(str::to_string);
            if old != new {
                undo.push((key, old));
                redo.push((key, new.clone()));
            }
        }
        if redo.is_empty() {
            return Ok(());
        }

        self.unredo
            .append(Operation::SetCells(undo), Operation::SetCells(redo.clone()))?;
        for (key, code) in redo {
            self.dict_grid.set(key, code)?;
        }
        self.unredo.mark();
        Ok(())
    }

    /// Remove one cell as its own undo step. Absent cells are not logged.
    pub fn pop(&mut self, key: &CellKey) -> Result<Option<String>, GridError> {
        let Some(old) = self.dict_grid.get(key)?.map(str::to_string) else {
            return Ok(None);
        };

        self.unredo.append(
            Operation::SetCells(vec![(*key, Some(old))]),
            Operation::SetCells(vec![(*key, None)]),
        )?;
        self.unredo.mark();
        Ok(self.dict_grid.remove(key))
    }

    /// Change the shape, purging cells that fall outside it first.
    pub fn set_shape(&mut self, shape: Shape) -> Result<(), GridError> {
        let old_shape = self.shape();

        if shape.shrinks_from(&old_shape) {
            let outside = self.pop_where(|key| !shape.contains(key))?;
            if !outside.is_empty() {
                log::debug!("shape {} purged {} cell(s)", shape, outside.len());
            }
        }

        self.dict_grid.set_shape_unchecked(shape);
        self.unredo
            .append(Operation::SetShape(old_shape), Operation::SetShape(shape))?;
        self.unredo.mark();
        Ok(())
    }

    /// Insert `count` rows/cols/tables before `point` on `axis`.
    ///
    /// `point` may be anywhere in `[-extent, extent]`; `extent` appends.
    pub fn insert(&mut self, point: i64, count: i64, axis: usize) -> Result<(), GridError> {
        let shape = self.shape();
        let extent = shape.extent(axis).ok_or(GridError::InvalidAxis(axis))?;
        if count < 0 {
            return Err(GridError::NegativeCount(count));
        }
        let signed_extent = extent as i64;
        if point < -signed_extent || point > signed_extent {
            return Err(GridError::InsertionPoint { point, axis, shape });
        }

        let point = if point < 0 { point + signed_extent } else { point } as usize;
        let count = count as usize;

        let moved = self.pop_where(|key| key.as_array()[axis] >= point)?;

        let grown = shape
            .with_extent(axis, extent.saturating_add(count))
            .ok_or(GridError::InvalidAxis(axis))?;
        self.set_shape(grown)?;

        for (key, code) in &moved {
            let target = key
                .with(axis, key.as_array()[axis] + count)
                .ok_or(GridError::InvalidAxis(axis))?;
            self.set(target, code)?;
        }

        log::debug!(
            "inserted {} along axis {} at {}, moved {} cell(s)",
            count,
            axis,
            point,
            moved.len()
        );
        Ok(())
    }

    /// Delete `count` rows/cols/tables starting at `point` on `axis`.
    ///
    /// A window reaching past the end is clipped to the end.
    pub fn delete(&mut self, point: i64, count: i64, axis: usize) -> Result<(), GridError> {
        if count < 0 {
            return Err(GridError::NegativeCount(count));
        }
        let shape = self.shape();
        let extent = shape.extent(axis).ok_or(GridError::InvalidAxis(axis))?;
        let signed_extent = extent as i64;
        if point < -signed_extent || point >= signed_extent {
            return Err(GridError::DeletionPoint { point, axis, shape });
        }

        let point = if point < 0 { point + signed_extent } else { point } as usize;
        let count = (count as usize).min(extent - point);
        let end = point + count;

        let affected = self.pop_where(|key| key.as_array()[axis] >= point)?;

        let mut shifted = 0;
        for (key, code) in &affected {
            let coord = key.as_array()[axis];
            if coord < end {
                continue;
            }
            let target = key.with(axis, coord - count).ok_or(GridError::InvalidAxis(axis))?;
            self.set(target, code)?;
            shifted += 1;
        }

        let shrunk = shape
            .with_extent(axis, extent - count)
            .ok_or(GridError::InvalidAxis(axis))?;
        self.set_shape(shrunk)?;

        log::debug!(
            "deleted {} along axis {} at {}, dropped {} and shifted {} cell(s)",
            count,
            axis,
            point,
            affected.len() - shifted,
            shifted
        );
        Ok(())
    }

    /// Append an attribute log entry as one undo step.
    pub fn append_attributes(
        &mut self,
        selection: Selection,
        table: usize,
        changes: Attributes,
    ) -> Result<(), GridError> {
        let entry = AttributeEntry::new(selection, table, changes);
        self.unredo
            .append(Operation::PopAttributes, Operation::AppendAttributes(entry.clone()))?;
        self.dict_grid.cell_attributes.push(entry);
        self.unredo.mark();
        Ok(())
    }

    /// Revert the last undo step. Returns the number of operations replayed.
    pub fn undo(&mut self) -> Result<usize, GridError> {
        let Self { dict_grid, unredo } = self;
        unredo.undo(|op| apply(dict_grid, op))
    }

    /// Reapply the last undone step.
    pub fn redo(&mut self) -> Result<usize, GridError> {
        let Self { dict_grid, unredo } = self;
        unredo.redo(|op| apply(dict_grid, op))
    }

    /// Pop every cell matching `pred`, in key order.
    fn pop_where<P>(&mut self, pred: P) -> Result<Vec<(CellKey, String)>, GridError>
    where
        P: Fn(&CellKey) -> bool,
    {
        let mut keys: Vec<CellKey> = self.dict_grid.keys().filter(|k| pred(k)).copied().collect();
        keys.sort();

        let mut popped = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(code) = self.pop(&key)? {
                popped.push((key, code));
            }
        }
        Ok(popped)
    }
}

fn apply(dict_grid: &mut DictGrid, op: &Operation) -> Result<(), GridError> {
    match op {
        Operation::SetCells(cells) => {
            for (key, code) in cells {
                dict_grid.set(*key, code.clone())?;
            }
        }
        Operation::SetShape(shape) => dict_grid.set_shape_unchecked(*shape),
        Operation::AppendAttributes(entry) => dict_grid.cell_attributes.push(entry.clone()),
        Operation::PopAttributes => {
            dict_grid.cell_attributes.pop();
        }
    }
    Ok(())
}
