//! Three-layer spreadsheet engine.
//!
//! `DictGrid` stores source expressions sparsely by (row, col, table).
//! `DataArray` adds slicing, row/column/table insertion and deletion, and
//! records every change in the `UnRedo` log. `CodeArray` evaluates cells on
//! read, caches results and turns reference cycles into error values.

pub mod attributes;
pub mod code_array;
pub mod data_array;
pub mod error;
pub mod expr;
pub mod find;
pub mod options;
pub mod store;
pub mod unredo;

pub use attributes::{AttrValue, AttributeEntry, Attributes, CellAttributes};
pub use code_array::CodeArray;
pub use data_array::{CellArray, DataArray, Nested};
pub use error::GridError;
pub use expr::{ErrorKind, EvalError, Value};
pub use find::{Direction, FindFlags};
pub use options::GridOptions;
pub use store::DictGrid;
pub use unredo::{Operation, UnRedo};
