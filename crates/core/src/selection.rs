use serde::{Deserialize, Serialize};

/// A rectangular range of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl Range {
    /// Create a new range, automatically normalizing so start <= end.
    pub fn new(r1: usize, c1: usize, r2: usize, c2: usize) -> Self {
        Self {
            start_row: r1.min(r2),
            start_col: c1.min(c2),
            end_row: r1.max(r2),
            end_col: c1.max(c2),
        }
    }

    /// Create a single-cell range.
    pub fn single(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    /// Check if this range contains a cell.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row &&
        col >= self.start_col && col <= self.end_col
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(&self, other: &Range) -> Range {
        Range {
            start_row: self.start_row.min(other.start_row),
            start_col: self.start_col.min(other.start_col),
            end_row: self.end_row.max(other.end_row),
            end_col: self.end_col.max(other.end_col),
        }
    }

    pub fn top_left(&self) -> (usize, usize) {
        (self.start_row, self.start_col)
    }

    pub fn bottom_right(&self) -> (usize, usize) {
        (self.end_row, self.end_col)
    }
}

/// A set of (row, col) coordinates.
///
/// Made of five parts: block top-left corners and block bottom-right corners
/// (parallel lists, one rectangle per pair), fully selected rows, fully
/// selected columns and individually selected cells. Built once, then queried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub block_tl: Vec<(usize, usize)>,
    pub block_br: Vec<(usize, usize)>,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub cells: Vec<(usize, usize)>,
}

impl Selection {
    pub fn new(
        block_tl: Vec<(usize, usize)>,
        block_br: Vec<(usize, usize)>,
        rows: Vec<usize>,
        cols: Vec<usize>,
        cells: Vec<(usize, usize)>,
    ) -> Self {
        Self { block_tl, block_br, rows, cols, cells }
    }

    /// Selection of one cell.
    pub fn cell(row: usize, col: usize) -> Self {
        Self { cells: vec![(row, col)], ..Self::default() }
    }

    /// Selection of one rectangular block, corners inclusive.
    pub fn block(top_left: (usize, usize), bottom_right: (usize, usize)) -> Self {
        Self {
            block_tl: vec![top_left],
            block_br: vec![bottom_right],
            ..Self::default()
        }
    }

    pub fn whole_rows(rows: Vec<usize>) -> Self {
        Self { rows, ..Self::default() }
    }

    pub fn whole_cols(cols: Vec<usize>) -> Self {
        Self { cols, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks().next().is_none()
            && self.rows.is_empty()
            && self.cols.is_empty()
            && self.cells.is_empty()
    }

    /// Block rectangles. Unpaired corners are ignored.
    pub fn blocks(&self) -> impl Iterator<Item = Range> + '_ {
        self.block_tl
            .iter()
            .zip(self.block_br.iter())
            .map(|(&(r1, c1), &(r2, c2))| Range::new(r1, c1, r2, c2))
    }

    /// Check if a cell is selected.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.blocks().any(|b| b.contains(row, col))
            || self.rows.contains(&row)
            || self.cols.contains(&col)
            || self.cells.contains(&(row, col))
    }

    /// Tightest rectangle covering every member, or None for an empty selection.
    ///
    /// Whole rows span every column and whole columns every row, so they push
    /// the open side of the box out to `usize::MAX`.
    pub fn bounding_box(&self) -> Option<Range> {
        let parts = self
            .blocks()
            .chain(self.rows.iter().map(|&r| Range::new(r, 0, r, usize::MAX)))
            .chain(self.cols.iter().map(|&c| Range::new(0, c, usize::MAX, c)))
            .chain(self.cells.iter().map(|&(r, c)| Range::single(r, c)));

        parts.reduce(|acc, part| acc.union(&part))
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn pairs(items: &[(usize, usize)]) -> String {
            let inner: Vec<String> = items.iter().map(|(a, b)| format!("({}, {})", a, b)).collect();
            format!("[{}]", inner.join(", "))
        }
        fn singles(items: &[usize]) -> String {
            let inner: Vec<String> = items.iter().map(|i| i.to_string()).collect();
            format!("[{}]", inner.join(", "))
        }

        write!(
            f,
            "Selection({}, {}, {}, {}, {})",
            pairs(&self.block_tl),
            pairs(&self.block_br),
            singles(&self.rows),
            singles(&self.cols),
            pairs(&self.cells),
        )
    }
}
