use std::fmt;

use cubesheet_core::{CellKey, Shape};

/// Errors raised by grid operations.
///
/// These are caller mistakes (bad key, bad axis, bad undo entry). Evaluation
/// failures are not reported here: they come back as `Value::Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Cell key outside the current shape.
    OutOfBounds { key: CellKey, shape: Shape },
    /// Index on one axis outside `[-extent, extent)`.
    IndexOutOfRange { axis: usize, index: i64, shape: Shape },
    /// Insertion point outside `[-extent, extent]` on its axis.
    InsertionPoint { point: i64, axis: usize, shape: Shape },
    /// Deletion point outside `[-extent, extent)` on its axis.
    DeletionPoint { point: i64, axis: usize, shape: Shape },
    /// Axis is not 0 (rows), 1 (cols) or 2 (tables).
    InvalidAxis(usize),
    /// Negative row/col/table count.
    NegativeCount(i64),
    /// Slice with a zero step.
    ZeroStep,
    /// Unknown or conflicting find flags.
    InvalidFlags(String),
    /// Search pattern that does not compile.
    InvalidPattern(String),
    /// Undo/redo entry rejected at append time.
    MalformedOperation(String),
    /// Empty cells and error values cannot be pinned.
    NotFreezable { key: CellKey, value: String },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { key, shape } => {
                write!(f, "grid index {key} outside grid shape {shape}")
            }
            Self::IndexOutOfRange { axis, index, shape } => {
                write!(f, "index {index} on axis {axis} outside grid shape {shape}")
            }
            Self::InsertionPoint { point, axis, shape } => {
                write!(f, "insertion point {point} on axis {axis} not in grid {shape}")
            }
            Self::DeletionPoint { point, axis, shape } => {
                write!(f, "deletion point {point} on axis {axis} not in grid {shape}")
            }
            Self::InvalidAxis(axis) => write!(f, "axis {axis} not in grid dimensions"),
            Self::NegativeCount(count) => {
                write!(f, "cannot insert or delete a negative number ({count}) of rows/cols/tables")
            }
            Self::ZeroStep => write!(f, "slice step cannot be zero"),
            Self::InvalidFlags(msg) => write!(f, "invalid find flags: {msg}"),
            Self::InvalidPattern(msg) => write!(f, "invalid search pattern: {msg}"),
            Self::MalformedOperation(msg) => write!(f, "malformed undo/redo operation: {msg}"),
            Self::NotFreezable { key, value } => write!(f, "cannot freeze cell {key} holding {value}"),
        }
    }
}

impl std::error::Error for GridError {}
