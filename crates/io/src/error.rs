use std::fmt;

use cubesheet_core::CellKey;
use cubesheet_engine::GridError;

/// Errors reading or writing the grid text format.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    Io(String),
    /// Malformed record. `line` is 1-based.
    Parse { line: usize, message: String },
    /// A record was well formed but the grid rejected it.
    Grid(GridError),
    /// Cell code containing a line break cannot be written as one record.
    MultilineCode(CellKey),
    /// A record could not be encoded.
    Encode(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "line {line}: {message}"),
            Self::Grid(err) => write!(f, "{err}"),
            Self::MultilineCode(key) => write!(f, "code of cell {key} spans several lines"),
            Self::Encode(msg) => write!(f, "cannot encode record: {msg}"),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<std::io::Error> for FormatError {
    fn from(err: std::io::Error) -> Self {
        FormatError::Io(err.to_string())
    }
}

impl From<GridError> for FormatError {
    fn from(err: GridError) -> Self {
        FormatError::Grid(err)
    }
}
