//! Plain value types shared by the engine and the file format.
//!
//! Nothing in here knows about evaluation or undo history: a `CellKey` is a
//! coordinate triple, a `Shape` is the grid extent, an `AxisIndex` is what a
//! caller may put on one axis of a subscript, and a `Selection` describes a
//! set of (row, col) coordinates.

pub mod key;
pub mod range;
pub mod selection;

pub use key::{CellKey, Shape, AXES};
pub use range::{slice_range, AxisIndex, GridIndex, SliceRange};
pub use selection::{Range, Selection};
