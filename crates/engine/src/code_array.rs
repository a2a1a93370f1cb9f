//! Evaluated view of the grid.
//!
//! `CodeArray` owns a `DataArray` and answers reads with evaluated values.
//! Results are memoised per cell and the whole cache is dropped on every
//! mutation. Cells being evaluated are tracked so that a chain of
//! references that comes back to one of them yields a circular reference
//! error instead of unbounded recursion.

use std::cell::RefCell;

use cubesheet_core::{CellKey, GridIndex, Selection, Shape};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::attributes::{AttrValue, Attributes, CellAttributes, FROZEN};
use crate::data_array::{DataArray, Nested};
use crate::error::GridError;
use crate::expr::{evaluate, Environment, EvalError, Value};
use crate::find::{sorted_keys, FindFlags, Matcher};
use crate::options::{GridOptions, RECURSION_DEPTH_CEILING};
use crate::unredo::UnRedo;

/// Returned by `execute_macros` when macros are disabled.
pub const SAFE_MODE_MESSAGE: &str = "Safe mode activated. Code not executed.";

/// Tokens that rule out reading `name = expr` as an assignment.
const OPERATORS: [&str; 20] = [
    "+", "-", "*", "**", "/", "//", "%", "<<", ">>", "&", "|", "^", "~", "<", ">", "<=", ">=",
    "==", "!=", "<>",
];

/// Split `name = expr` into its target and expression.
///
/// The text before the first `=` must be one bare word with no operators
/// and balanced parentheses, and the text after it must not start with
/// another `=`. This is a textual check, so `"a=b"` (a string literal) is
/// read as an assignment too.
pub fn split_assignment(code: &str) -> (Option<&str>, &str) {
    let Some((target, rest)) = code.split_once('=') else {
        return (None, code);
    };

    let is_assignment = target.split_whitespace().count() == 1
        && !rest.is_empty()
        && !rest.starts_with('=')
        && !OPERATORS.iter().any(|op| target.contains(op))
        && target.matches('(').count() == target.matches(')').count();

    if is_assignment {
        (Some(target.trim()), rest)
    } else {
        (None, code)
    }
}

/// Removes a key from the in-flight set when dropped.
struct InFlight<'a> {
    evaluating: &'a RefCell<FxHashSet<CellKey>>,
    key: CellKey,
}

impl<'a> InFlight<'a> {
    fn enter(evaluating: &'a RefCell<FxHashSet<CellKey>>, key: CellKey) -> Self {
        evaluating.borrow_mut().insert(key);
        Self { evaluating, key }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.evaluating.borrow_mut().remove(&self.key);
    }
}

/// Names visible to a cell or macro expression.
struct CellEnv<'a> {
    grid: &'a CodeArray,
    key: Option<CellKey>,
}

impl Environment for CellEnv<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        let coord = |f: fn(&CellKey) -> usize| self.key.as_ref().map(|k| Value::Int(f(k) as i64));
        match name {
            "X" | "R" => coord(|k| k.row),
            "Y" | "C" => coord(|k| k.col),
            "Z" | "T" => coord(|k| k.table),
            "S" => Some(Value::Grid),
            _ => self.grid.globals.borrow().get(name).cloned(),
        }
    }

    fn grid_get(&self, index: &GridIndex) -> Result<Value, EvalError> {
        self.grid.get(*index).map_err(|err| match err {
            GridError::ZeroStep => EvalError::value(err.to_string()),
            other => EvalError::index(other.to_string()),
        })
    }
}

fn into_value(nested: Nested<Value>) -> Value {
    match nested {
        Nested::Item(value) => value,
        Nested::List(items) => Value::List(items.into_iter().map(into_value).collect()),
    }
}

#[derive(Debug, Clone)]
pub struct CodeArray {
    data_array: DataArray,
    result_cache: RefCell<FxHashMap<CellKey, Value>>,
    evaluating: RefCell<FxHashSet<CellKey>>,
    /// Names bound by assignment cells and macros. Owned by this grid.
    globals: RefCell<FxHashMap<String, Value>>,
    max_recursion_depth: usize,
    safe_mode: bool,
}

impl CodeArray {
    pub fn new(shape: Shape) -> Self {
        Self::with_options(shape, GridOptions::default())
    }

    pub fn with_options(shape: Shape, options: GridOptions) -> Self {
        Self {
            data_array: DataArray::new(shape, &options),
            result_cache: RefCell::default(),
            evaluating: RefCell::default(),
            globals: RefCell::default(),
            max_recursion_depth: options.max_recursion_depth.min(RECURSION_DEPTH_CEILING),
            safe_mode: options.safe_mode,
        }
    }

    pub fn data_array(&self) -> &DataArray {
        &self.data_array
    }

    pub fn shape(&self) -> Shape {
        self.data_array.shape()
    }

    pub fn cell_attributes(&self) -> &CellAttributes {
        self.data_array.cell_attributes()
    }

    pub fn unredo(&self) -> &UnRedo {
        self.data_array.unredo()
    }

    pub fn macros(&self) -> &str {
        self.data_array.macros()
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn set_safe_mode(&mut self, safe_mode: bool) {
        self.safe_mode = safe_mode;
    }

    /// Value bound to a global name, if any.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// Source expression of one cell.
    pub fn code(&self, key: &CellKey) -> Result<Option<&str>, GridError> {
        self.data_array.code(key)
    }

    /// Evaluated value of the cells addressed by `index`.
    ///
    /// A slice on any axis gives a `Value::List` nested once per sliced
    /// axis. Evaluation failures are returned as `Value::Error`; only an
    /// index outside the grid is an `Err`.
    pub fn get(&self, index: impl Into<GridIndex>) -> Result<Value, GridError> {
        let cells = self.data_array.resolve(&index.into())?;
        Ok(into_value(cells.map(|key| self.get_cell(key))))
    }

    fn get_cell(&self, key: CellKey) -> Value {
        if let Some(frozen) = self.frozen_value(&key) {
            return frozen;
        }

        let cached = self.result_cache.borrow().get(&key).cloned();
        if let Some(value) = cached {
            return value;
        }

        let code = match self.data_array.code(&key) {
            Ok(Some(code)) => code.to_string(),
            _ => return Value::None,
        };

        let value = self.eval_cell(key, &code);
        self.result_cache.borrow_mut().insert(key, value.clone());
        value
    }

    fn frozen_value(&self, key: &CellKey) -> Option<Value> {
        match self.cell_attributes().get_attr(key, FROZEN)? {
            AttrValue::Bool(false) => None,
            pinned => Some(Value::from(pinned)),
        }
    }

    fn eval_cell(&self, key: CellKey, code: &str) -> Value {
        if self.evaluating.borrow().contains(&key) {
            log::trace!("circular reference closed at {}", key);
            return Value::Error(EvalError::circular(key));
        }
        if self.evaluating.borrow().len() >= self.max_recursion_depth {
            return Value::Error(EvalError::recursion(self.max_recursion_depth));
        }

        let _in_flight = InFlight::enter(&self.evaluating, key);
        self.run(code, Some(key))
    }

    /// Evaluate one expression, binding its result if it is an assignment.
    fn run(&self, code: &str, key: Option<CellKey>) -> Value {
        let (target, expr) = split_assignment(code);
        let env = CellEnv { grid: self, key };

        match evaluate(expr, &env) {
            Ok(value) => {
                if let Some(name) = target.filter(|_| !value.is_error()) {
                    self.globals.borrow_mut().insert(name.to_string(), value.clone());
                }
                value
            }
            Err(err) => Value::Error(err),
        }
    }

    fn invalidate(&mut self) {
        self.result_cache.get_mut().clear();
    }

    /// Write `code` to every addressed cell as one undo step.
    pub fn set(&mut self, index: impl Into<GridIndex>, code: &str) -> Result<(), GridError> {
        self.data_array.set(index, code)?;
        self.invalidate();
        Ok(())
    }

    pub fn pop(&mut self, key: &CellKey) -> Result<Option<String>, GridError> {
        let popped = self.data_array.pop(key)?;
        self.invalidate();
        Ok(popped)
    }

    pub fn set_shape(&mut self, shape: Shape) -> Result<(), GridError> {
        self.data_array.set_shape(shape)?;
        log::debug!("result cache invalidated by shape change to {}", shape);
        self.invalidate();
        Ok(())
    }

    pub fn insert(&mut self, point: i64, count: i64, axis: usize) -> Result<(), GridError> {
        let result = self.data_array.insert(point, count, axis);
        self.invalidate();
        result
    }

    pub fn delete(&mut self, point: i64, count: i64, axis: usize) -> Result<(), GridError> {
        let result = self.data_array.delete(point, count, axis);
        self.invalidate();
        result
    }

    pub fn append_attributes(
        &mut self,
        selection: Selection,
        table: usize,
        changes: Attributes,
    ) -> Result<(), GridError> {
        self.data_array.append_attributes(selection, table, changes)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_macros(&mut self, macros: impl Into<String>) {
        self.data_array.set_macros(macros);
        self.invalidate();
    }

    pub fn set_row_height(&mut self, row: usize, table: usize, height: f64) {
        self.data_array.set_row_height(row, table, height);
    }

    pub fn set_col_width(&mut self, col: usize, table: usize, width: f64) {
        self.data_array.set_col_width(col, table, width);
    }

    /// Close the current undo step.
    pub fn mark(&mut self) {
        self.data_array.unredo_mut().mark();
    }

    pub fn undo(&mut self) -> Result<usize, GridError> {
        let result = self.data_array.undo();
        self.invalidate();
        result
    }

    pub fn redo(&mut self) -> Result<usize, GridError> {
        let result = self.data_array.redo();
        self.invalidate();
        result
    }

    /// Pin the current value of `key` so later reads skip evaluation.
    ///
    /// Empty cells and cells evaluating to an error are refused.
    pub fn freeze(&mut self, key: CellKey) -> Result<Value, GridError> {
        let value = self.get(key)?;
        if value.is_none() || value.is_error() {
            return Err(GridError::NotFreezable { key, value: value.to_string() });
        }
        let mut changes = Attributes::new();
        changes.insert(FROZEN.to_string(), AttrValue::from(&value));
        self.append_attributes(Selection::cell(key.row, key.col), key.table, changes)?;
        Ok(value)
    }

    pub fn unfreeze(&mut self, key: CellKey) -> Result<(), GridError> {
        self.get(key)?;
        let mut changes = Attributes::new();
        changes.insert(FROZEN.to_string(), AttrValue::Bool(false));
        self.append_attributes(Selection::cell(key.row, key.col), key.table, changes)
    }

    /// Evaluate the macro text line by line.
    ///
    /// Blank lines and `#` comments are skipped. Every error and every
    /// non-None result of a line that is not an assignment adds one line
    /// to the returned output.
    pub fn execute_macros(&mut self) -> String {
        if self.safe_mode {
            return SAFE_MODE_MESSAGE.to_string();
        }

        let macros = self.macros().replace("\r\n", "\n");
        let mut output = Vec::new();
        for line in macros.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value = self.run(line, None);
            let is_assignment = split_assignment(line).0.is_some();
            if value.is_error() || !(value.is_none() || is_assignment) {
                output.push(value.to_string());
            }
        }

        // Globals may have changed under cached results.
        self.invalidate();
        output.join("\n")
    }

    /// Drop undo history, cached results and globals.
    pub fn reset(&mut self) {
        self.data_array.unredo_mut().reset();
        self.globals.get_mut().clear();
        self.invalidate();
    }

    /// First non-empty cell, in search order from `start`, whose source or
    /// evaluated value matches `needle`.
    pub fn find_next_match(
        &self,
        start: CellKey,
        needle: &str,
        flags: &FindFlags,
    ) -> Result<Option<CellKey>, GridError> {
        let matcher = Matcher::new(needle, flags)?;
        let keys: Vec<CellKey> = self.data_array.keys().copied().collect();

        for key in sorted_keys(keys, start, flags.direction) {
            let code = self.code(&key)?.unwrap_or_default();
            if matcher.is_match(code) || matcher.is_match(&self.get_cell(key).to_string()) {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ErrorKind;
    use cubesheet_core::AxisIndex;

    fn key(row: usize, col: usize, table: usize) -> CellKey {
        CellKey::new(row, col, table)
    }

    fn grid(rows: usize, cols: usize, tables: usize) -> CodeArray {
        CodeArray::new(Shape::new(rows, cols, tables))
    }

    fn error_kind(value: &Value) -> Option<ErrorKind> {
        match value {
            Value::Error(err) => Some(err.kind),
            _ => None,
        }
    }

    #[test]
    fn test_literal_and_neighbor_reference() {
        let mut g = grid(10, 10, 1);
        g.set(key(0, 0, 0), "5").unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Int(5));

        g.set(key(1, 0, 0), "S[0,0,0] + 1").unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_empty_cell_is_none_and_not_cached() {
        let g = grid(3, 3, 1);
        assert_eq!(g.get(key(2, 2, 0)).unwrap(), Value::None);
        assert!(g.result_cache.borrow().is_empty());
    }

    #[test]
    fn test_out_of_bounds_read_is_err() {
        let g = grid(3, 3, 1);
        assert!(matches!(
            g.get(key(3, 0, 0)),
            Err(GridError::IndexOutOfRange { axis: 0, .. })
        ));
    }

    #[test]
    fn test_cycle_is_reported_not_followed() {
        let mut g = grid(10, 10, 1);
        g.set(key(0, 1, 0), "S[1,1,0]").unwrap();
        g.set(key(1, 1, 0), "S[0,1,0]").unwrap();

        assert_eq!(error_kind(&g.get(key(1, 1, 0)).unwrap()), Some(ErrorKind::Circular));
        assert_eq!(error_kind(&g.get(key(0, 1, 0)).unwrap()), Some(ErrorKind::Circular));
        assert!(g.evaluating.borrow().is_empty());
    }

    #[test]
    fn test_cycle_from_either_end() {
        let mut g = grid(10, 10, 1);
        g.set(key(0, 1, 0), "S[1,1,0] + 1").unwrap();
        g.set(key(1, 1, 0), "S[0,1,0] * 2").unwrap();
        assert_eq!(error_kind(&g.get(key(0, 1, 0)).unwrap()), Some(ErrorKind::Circular));

        g.set(key(5, 5, 0), "1").unwrap();
        assert_eq!(error_kind(&g.get(key(1, 1, 0)).unwrap()), Some(ErrorKind::Circular));
    }

    #[test]
    fn test_self_reference() {
        let mut g = grid(2, 2, 1);
        g.set(key(0, 0, 0), "S[X, Y, Z]").unwrap();
        let err = g.get(key(0, 0, 0)).unwrap();
        assert_eq!(error_kind(&err), Some(ErrorKind::Circular));
        assert!(err.to_string().contains("(0, 0, 0)"));
    }

    #[test]
    fn test_recursion_depth_bound() {
        let options = GridOptions { max_recursion_depth: 10, ..GridOptions::default() };
        let mut g = CodeArray::with_options(Shape::new(50, 1, 1), options);
        g.set(key(0, 0, 0), "0").unwrap();
        for row in 1..50 {
            g.set(key(row, 0, 0), "S[X-1, 0, 0] + 1").unwrap();
        }
        assert_eq!(error_kind(&g.get(key(49, 0, 0)).unwrap()), Some(ErrorKind::Recursion));

        // Short chains still evaluate.
        g.set(key(49, 0, 0), "S[5, 0, 0]").unwrap();
        assert_eq!(g.get(key(49, 0, 0)).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_broken_cell_is_isolated() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "$^%&").unwrap();
        g.set(key(1, 0, 0), "2 + 2").unwrap();
        g.set(key(2, 0, 0), "1 / 0").unwrap();

        assert_eq!(error_kind(&g.get(key(0, 0, 0)).unwrap()), Some(ErrorKind::Syntax));
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(4));
        assert_eq!(error_kind(&g.get(key(2, 0, 0)).unwrap()), Some(ErrorKind::ZeroDivision));
    }

    #[test]
    fn test_deeply_nested_cell_is_syntax_error() {
        let mut g = grid(5, 5, 1);
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        g.set(key(0, 0, 0), &deep).unwrap();
        g.set(key(1, 0, 0), "S[0, 0, 0] if False else 3").unwrap();

        assert_eq!(error_kind(&g.get(key(0, 0, 0)).unwrap()), Some(ErrorKind::Syntax));
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_configured_depth_is_clamped() {
        let options = GridOptions { max_recursion_depth: 100_000, ..GridOptions::default() };
        let mut g = CodeArray::with_options(Shape::new(20_000, 1, 1), options);
        g.set(key(0, 0, 0), "0").unwrap();
        let rest = [AxisIndex::from(1..20_000), AxisIndex::from(0usize), AxisIndex::from(0usize)];
        g.set(rest, "S[X-1, 0, 0] + 1").unwrap();

        // Evaluated on a thread with the usual main-thread stack size.
        let value = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(move || g.get(key(19_999, 0, 0)).unwrap())
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(error_kind(&value), Some(ErrorKind::Recursion));
        assert!(value.to_string().contains(&RECURSION_DEPTH_CEILING.to_string()));
    }

    #[test]
    fn test_error_propagates_through_reference() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "undefined_name").unwrap();
        g.set(key(1, 0, 0), "S[0,0,0] + 1").unwrap();
        assert_eq!(error_kind(&g.get(key(1, 0, 0)).unwrap()), Some(ErrorKind::Name));
    }

    #[test]
    fn test_coordinate_aliases() {
        let mut g = grid(5, 5, 3);
        g.set(key(3, 2, 1), "[X, Y, Z, R, C, T]").unwrap();
        assert_eq!(g.get(key(3, 2, 1)).unwrap().to_string(), "[3, 2, 1, 3, 2, 1]");
    }

    #[test]
    fn test_slice_reads_nest_per_sliced_axis() {
        let mut g = grid(4, 4, 1);
        for row in 0..4 {
            for col in 0..4 {
                g.set(key(row, col, 0), &format!("{}", row * 10 + col)).unwrap();
            }
        }
        g.set(key(3, 3, 0), "sum(S[0:3, 0, 0])").unwrap();
        assert_eq!(g.get(key(3, 3, 0)).unwrap(), Value::Int(30));

        let index = GridIndex::new(
            AxisIndex::Slice { start: Some(0), stop: Some(2), step: None },
            AxisIndex::Slice { start: Some(1), stop: Some(3), step: None },
            AxisIndex::At(0),
        );
        assert_eq!(g.get(index).unwrap().to_string(), "[[1, 2], [11, 12]]");
    }

    #[test]
    fn test_zero_step_in_expression_is_value_error() {
        let mut g = grid(4, 4, 1);
        g.set(key(0, 0, 0), "S[0:3:0, 0, 0]").unwrap();
        assert_eq!(error_kind(&g.get(key(0, 0, 0)).unwrap()), Some(ErrorKind::Value));
    }

    #[test]
    fn test_out_of_range_reference_is_index_error() {
        let mut g = grid(4, 4, 1);
        g.set(key(0, 0, 0), "S[10, 0, 0]").unwrap();
        assert_eq!(error_kind(&g.get(key(0, 0, 0)).unwrap()), Some(ErrorKind::Index));
    }

    #[test]
    fn test_write_invalidates_cache() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "1").unwrap();
        g.set(key(1, 0, 0), "S[0,0,0] * 10").unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(10));

        g.set(key(0, 0, 0), "2").unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(20));

        g.undo().unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_global_assignment() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "rate = 0.5").unwrap();
        g.set(key(1, 0, 0), "rate * 4").unwrap();

        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Float(0.5));
        assert_eq!(g.global("rate"), Some(Value::Float(0.5)));
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_globals_are_per_grid() {
        let mut a = grid(2, 2, 1);
        let b = grid(2, 2, 1);
        a.set(key(0, 0, 0), "shared = 1").unwrap();
        a.get(key(0, 0, 0)).unwrap();
        assert!(a.global("shared").is_some());
        assert!(b.global("shared").is_none());
    }

    #[test]
    fn test_failed_assignment_does_not_bind() {
        let mut g = grid(2, 2, 1);
        g.set(key(0, 0, 0), "x = 1/0").unwrap();
        assert!(g.get(key(0, 0, 0)).unwrap().is_error());
        assert_eq!(g.global("x"), None);
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("a = 1 + 2"), (Some("a"), " 1 + 2"));
        assert_eq!(split_assignment("a = b == c"), (Some("a"), " b == c"));
        assert_eq!(split_assignment("a == b"), (None, "a == b"));
        assert_eq!(split_assignment("a <= b"), (None, "a <= b"));
        assert_eq!(split_assignment("a b = 1"), (None, "a b = 1"));
        assert_eq!(split_assignment("len(\"=\")"), (None, "len(\"=\")"));
        assert_eq!(split_assignment("a ="), (None, "a ="));
        assert_eq!(split_assignment("1 + 1"), (None, "1 + 1"));
        // Textual check: an '=' inside a string literal still splits.
        assert_eq!(split_assignment("\"a=b\""), (Some("\"a"), "b\""));
    }

    #[test]
    fn test_frozen_cell_skips_evaluation() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "7").unwrap();
        g.set(key(1, 0, 0), "S[0,0,0] * 2").unwrap();

        assert_eq!(g.freeze(key(1, 0, 0)).unwrap(), Value::Int(14));
        g.set(key(0, 0, 0), "100").unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(14));

        g.unfreeze(key(1, 0, 0)).unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(200));

        // Unfreeze is undoable through the attribute log.
        g.undo().unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Int(14));
    }

    #[test]
    fn test_freeze_refuses_empty_and_error_cells() {
        let mut g = grid(5, 5, 1);
        g.set(key(1, 0, 0), "1 / 0").unwrap();

        assert!(matches!(g.freeze(key(0, 0, 0)), Err(GridError::NotFreezable { .. })));
        assert!(matches!(g.freeze(key(1, 0, 0)), Err(GridError::NotFreezable { .. })));
        assert!(g.cell_attributes().is_empty());

        g.set(key(1, 0, 0), "1 / 4").unwrap();
        assert_eq!(g.get(key(1, 0, 0)).unwrap(), Value::Float(0.25));
    }

    #[test]
    fn test_find_next_match() {
        let mut g = grid(100, 10, 1);
        for row in 0..100 {
            g.set(key(row, 0, 0), &row.to_string()).unwrap();
        }
        let down = FindFlags::from_names(&["DOWN"]).unwrap();
        assert_eq!(g.find_next_match(key(0, 0, 0), "3", &down).unwrap(), Some(key(3, 0, 0)));
        assert_eq!(g.find_next_match(key(0, 0, 0), "99", &down).unwrap(), Some(key(99, 0, 0)));
        assert_eq!(g.find_next_match(key(0, 0, 0), "abc", &down).unwrap(), None);

        let up = FindFlags::from_names(&["UP"]).unwrap();
        assert_eq!(g.find_next_match(key(50, 0, 0), "3", &up).unwrap(), Some(key(43, 0, 0)));
    }

    #[test]
    fn test_find_matches_result_text() {
        let mut g = grid(5, 5, 1);
        g.set(key(2, 2, 0), "6 * 7").unwrap();
        let down = FindFlags::from_names(&["DOWN"]).unwrap();
        assert_eq!(g.find_next_match(key(0, 0, 0), "42", &down).unwrap(), Some(key(2, 2, 0)));

        let whole = FindFlags::from_names(&["DOWN", "WHOLE_WORD"]).unwrap();
        assert_eq!(g.find_next_match(key(0, 0, 0), "4", &whole).unwrap(), None);
    }

    #[test]
    fn test_undo_redo_edits_in_order() {
        let mut g = grid(5, 5, 1);
        g.set(key(0, 0, 0), "1").unwrap();
        g.mark();
        g.set(key(0, 0, 0), "2").unwrap();
        g.mark();

        g.undo().unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Int(1));
        g.undo().unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::None);

        g.redo().unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Int(1));
        g.redo().unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_execute_macros() {
        let mut g = grid(3, 3, 1);
        g.set_macros("# setup\nscale = 3\n\nscale * 2\nnope\r\nNone");
        let output = g.execute_macros();
        assert_eq!(output, "6\nNameError: name 'nope' is not defined");
        assert_eq!(g.global("scale"), Some(Value::Int(3)));

        g.set(key(0, 0, 0), "scale + 1").unwrap();
        assert_eq!(g.get(key(0, 0, 0)).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_safe_mode_skips_macros() {
        let options = GridOptions { safe_mode: true, ..GridOptions::default() };
        let mut g = CodeArray::with_options(Shape::new(2, 2, 1), options);
        g.set_macros("flag = 1");
        assert_eq!(g.execute_macros(), SAFE_MODE_MESSAGE);
        assert_eq!(g.global("flag"), None);
    }

    #[test]
    fn test_reset_clears_history_and_globals() {
        let mut g = grid(3, 3, 1);
        g.set(key(0, 0, 0), "v = 1").unwrap();
        g.get(key(0, 0, 0)).unwrap();
        g.reset();

        assert!(!g.unredo().can_undo());
        assert_eq!(g.global("v"), None);
        assert_eq!(g.code(&key(0, 0, 0)).unwrap(), Some("v = 1"));
    }

    #[test]
    fn test_insert_keeps_references_consistent() {
        let mut g = grid(10, 10, 1);
        g.set(key(2, 0, 0), "21").unwrap();
        assert_eq!(g.get(key(2, 0, 0)).unwrap(), Value::Int(21));

        g.insert(0, 1, 0).unwrap();
        assert_eq!(g.get(key(2, 0, 0)).unwrap(), Value::None);
        assert_eq!(g.get(key(3, 0, 0)).unwrap(), Value::Int(21));
    }
}
