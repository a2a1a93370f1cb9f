// Grid persistence - sectioned, tab-separated text format
//
// [shape]        rows, cols, tables
// [grid]         row, col, table, code
// [attributes]   selection parts, table, name/value pairs
// [row_heights]  row, table, height
// [col_widths]   col, table, width
// [macros]       macro text, verbatim

pub mod document;
pub mod error;
pub mod records;

pub use document::{load, read_from, save, write_to};
pub use error::FormatError;
