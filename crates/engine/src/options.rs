use crate::attributes::{default_attributes, Attributes};
use crate::unredo::DEFAULT_MAX_UNREDO;

/// Default limit on nested cell evaluations.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 200;

/// Hard ceiling on nested cell evaluations. Larger configured depths are
/// clamped to it so that a long reference chain cannot exhaust the stack.
pub const RECURSION_DEPTH_CEILING: usize = 200;

/// Engine-side knobs, usually built from user settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOptions {
    /// Undo/redo list length at which history is dropped.
    pub max_unredo: usize,
    /// Maximum number of cell evaluations in flight at once, at most
    /// `RECURSION_DEPTH_CEILING`.
    pub max_recursion_depth: usize,
    /// Skip macro execution.
    pub safe_mode: bool,
    /// Baseline attributes for every cell.
    pub default_attributes: Attributes,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            max_unredo: DEFAULT_MAX_UNREDO,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            safe_mode: false,
            default_attributes: default_attributes("Sans", 10),
        }
    }
}
