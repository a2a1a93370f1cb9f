//! Per-axis subscripts and slice resolution.
//!
//! Slices follow the usual `start:stop:step` rules: negative bounds count from
//! the end, out-of-range bounds are clipped, a negative step walks backwards.

use crate::key::{CellKey, AXES};

/// What a subscript holds on one axis: a single index or a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisIndex {
    At(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
}

impl AxisIndex {
    /// The whole axis (`:`).
    pub fn full() -> Self {
        AxisIndex::Slice { start: None, stop: None, step: None }
    }

    /// `start:stop` with unit step.
    pub fn span(start: i64, stop: i64) -> Self {
        AxisIndex::Slice { start: Some(start), stop: Some(stop), step: None }
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, AxisIndex::Slice { .. })
    }
}

impl From<i64> for AxisIndex {
    fn from(index: i64) -> Self {
        AxisIndex::At(index)
    }
}

impl From<usize> for AxisIndex {
    fn from(index: usize) -> Self {
        AxisIndex::At(index as i64)
    }
}

impl From<std::ops::Range<usize>> for AxisIndex {
    fn from(range: std::ops::Range<usize>) -> Self {
        AxisIndex::span(range.start as i64, range.end as i64)
    }
}

impl From<std::ops::RangeFull> for AxisIndex {
    fn from(_: std::ops::RangeFull) -> Self {
        AxisIndex::full()
    }
}

/// A full grid subscript: one `AxisIndex` per axis (row, col, table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndex {
    pub row: AxisIndex,
    pub col: AxisIndex,
    pub table: AxisIndex,
}

impl GridIndex {
    pub fn new(row: AxisIndex, col: AxisIndex, table: AxisIndex) -> Self {
        Self { row, col, table }
    }

    pub fn axes(&self) -> [AxisIndex; AXES] {
        [self.row, self.col, self.table]
    }

    /// True if any axis is sliced.
    pub fn has_slice(&self) -> bool {
        self.axes().iter().any(AxisIndex::is_slice)
    }
}

impl From<CellKey> for GridIndex {
    fn from(key: CellKey) -> Self {
        Self::new(key.row.into(), key.col.into(), key.table.into())
    }
}

impl From<[AxisIndex; AXES]> for GridIndex {
    fn from([row, col, table]: [AxisIndex; AXES]) -> Self {
        Self::new(row, col, table)
    }
}

/// Concrete indices selected by a slice on an axis of known length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRange {
    next: i64,
    stop: i64,
    step: i64,
}

impl Iterator for SliceRange {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let more = if self.step > 0 { self.next < self.stop } else { self.next > self.stop };
        if !more {
            return None;
        }
        let current = self.next;
        self.next += self.step;
        Some(current as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.step > 0 && self.stop > self.next {
            (self.stop - self.next + self.step - 1) / self.step
        } else if self.step < 0 && self.next > self.stop {
            (self.next - self.stop - self.step - 1) / -self.step
        } else {
            0
        };
        (remaining as usize, Some(remaining as usize))
    }
}

impl ExactSizeIterator for SliceRange {}

/// Resolve `start:stop:step` against an axis of `length` elements.
///
/// Returns None for a zero step.
pub fn slice_range(start: Option<i64>, stop: Option<i64>, step: Option<i64>, length: usize) -> Option<SliceRange> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return None;
    }
    let length = length as i64;

    let clip = |bound: i64| {
        if bound < 0 {
            let shifted = bound + length;
            if shifted < 0 {
                if step < 0 { -1 } else { 0 }
            } else {
                shifted
            }
        } else if bound >= length {
            if step < 0 { length - 1 } else { length }
        } else {
            bound
        }
    };

    let start = match start {
        Some(s) => clip(s),
        None if step < 0 => length - 1,
        None => 0,
    };
    let stop = match stop {
        Some(s) => clip(s),
        None if step < 0 => -1,
        None => length,
    };

    Some(SliceRange { next: start, stop, step })
}
