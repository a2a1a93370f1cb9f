//! Cell formatting attributes.
//!
//! Attributes are never stored per cell. Instead an append-only log of
//! (selection, table, changes) entries is kept, and the attributes of one
//! cell are obtained by folding every matching entry, in log order, over the
//! default dictionary. Later entries win.

use std::cell::RefCell;
use std::collections::BTreeMap;

use cubesheet_core::{CellKey, Selection};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Attribute holding a pinned cell value. `false` means "not frozen".
pub const FROZEN: &str = "frozen";

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Float(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

/// Attribute name -> value.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Baseline attributes every cell starts from.
pub fn default_attributes(font: &str, pointsize: i64) -> Attributes {
    let grey = 0xC8C8C8_i64;
    let pairs: [(&str, AttrValue); 18] = [
        ("borderwidth_bottom", 1_i64.into()),
        ("borderwidth_right", 1_i64.into()),
        ("bordercolor_bottom", grey.into()),
        ("bordercolor_right", grey.into()),
        ("bgcolor", 0xFFFFFF_i64.into()),
        ("textfont", font.into()),
        ("pointsize", pointsize.into()),
        ("fontweight", "normal".into()),
        ("fontstyle", "normal".into()),
        ("textcolor", 0_i64.into()),
        ("underline", false.into()),
        ("strikethrough", false.into()),
        ("angle", 0.0.into()),
        ("column-width", 150_i64.into()),
        ("row-height", 26_i64.into()),
        ("vertical_align", "top".into()),
        ("justification", "left".into()),
        (FROZEN, false.into()),
    ];
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// One log entry: the changes apply to `selection` on `table`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    pub selection: Selection,
    pub table: usize,
    pub changes: Attributes,
}

impl AttributeEntry {
    pub fn new(selection: Selection, table: usize, changes: Attributes) -> Self {
        Self { selection, table, changes }
    }

    pub fn covers(&self, key: &CellKey) -> bool {
        self.table == key.table && self.selection.contains(key.row, key.col)
    }
}

/// Ordered attribute log with a per-cell fold cache.
///
/// A cache hit is only used while the log length still equals the length it
/// was computed at. Appends grow the length; pops clear the cache.
#[derive(Debug, Clone)]
pub struct CellAttributes {
    entries: Vec<AttributeEntry>,
    defaults: Attributes,
    cache: RefCell<FxHashMap<CellKey, (usize, Attributes)>>,
}

impl Default for CellAttributes {
    fn default() -> Self {
        Self::new(default_attributes("Sans", 10))
    }
}

impl CellAttributes {
    pub fn new(defaults: Attributes) -> Self {
        Self {
            entries: Vec::new(),
            defaults,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AttributeEntry] {
        &self.entries
    }

    pub fn defaults(&self) -> &Attributes {
        &self.defaults
    }

    pub(crate) fn push(&mut self, entry: AttributeEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<AttributeEntry> {
        // A later push would restore the old length with different content.
        self.cache.borrow_mut().clear();
        self.entries.pop()
    }

    /// Attributes of one cell: defaults overlaid with every matching entry.
    pub fn get(&self, key: &CellKey) -> Attributes {
        let len = self.entries.len();
        if let Some((cached_len, attrs)) = self.cache.borrow().get(key) {
            if *cached_len == len {
                return attrs.clone();
            }
        }

        let mut result = self.defaults.clone();
        for entry in self.entries.iter().filter(|e| e.covers(key)) {
            result.extend(entry.changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        self.cache.borrow_mut().insert(*key, (len, result.clone()));
        result
    }

    /// Single attribute of one cell.
    pub fn get_attr(&self, key: &CellKey, name: &str) -> Option<AttrValue> {
        self.get(key).remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(pairs: &[(&str, AttrValue)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_defaults_when_log_empty() {
        let attrs = CellAttributes::default();
        let result = attrs.get(&CellKey::new(0, 0, 0));
        assert_eq!(result.get("pointsize"), Some(&AttrValue::Int(10)));
        assert_eq!(result.get(FROZEN), Some(&AttrValue::Bool(false)));
        assert_eq!(result.get("justification"), Some(&AttrValue::from("left")));
    }

    #[test]
    fn test_later_entry_wins_on_conflict() {
        let mut attrs = CellAttributes::default();
        attrs.push(AttributeEntry::new(
            Selection::block((0, 0), (5, 5)),
            0,
            changes(&[("bgcolor", 1_i64.into()), ("underline", true.into())]),
        ));
        attrs.push(AttributeEntry::new(
            Selection::cell(2, 2),
            0,
            changes(&[("bgcolor", 2_i64.into())]),
        ));

        let cell = attrs.get(&CellKey::new(2, 2, 0));
        assert_eq!(cell.get("bgcolor"), Some(&AttrValue::Int(2)));
        assert_eq!(cell.get("underline"), Some(&AttrValue::Bool(true)));

        let other = attrs.get(&CellKey::new(1, 1, 0));
        assert_eq!(other.get("bgcolor"), Some(&AttrValue::Int(1)));
    }

    #[test]
    fn test_table_must_match() {
        let mut attrs = CellAttributes::default();
        attrs.push(AttributeEntry::new(Selection::cell(0, 0), 1, changes(&[("angle", 90.0.into())])));
        assert_eq!(attrs.get_attr(&CellKey::new(0, 0, 0), "angle"), Some(AttrValue::Float(0.0)));
        assert_eq!(attrs.get_attr(&CellKey::new(0, 0, 1), "angle"), Some(AttrValue::Float(90.0)));
    }

    #[test]
    fn test_cache_refreshed_after_append() {
        let mut attrs = CellAttributes::default();
        let key = CellKey::new(3, 3, 0);
        assert_eq!(attrs.get_attr(&key, "pointsize"), Some(AttrValue::Int(10)));

        attrs.push(AttributeEntry::new(Selection::whole_rows(vec![3]), 0, changes(&[("pointsize", 14_i64.into())])));
        assert_eq!(attrs.get_attr(&key, "pointsize"), Some(AttrValue::Int(14)));
    }

    #[test]
    fn test_cache_cleared_on_pop_then_push() {
        let mut attrs = CellAttributes::default();
        let key = CellKey::new(0, 0, 0);
        attrs.push(AttributeEntry::new(Selection::cell(0, 0), 0, changes(&[("pointsize", 20_i64.into())])));
        assert_eq!(attrs.get_attr(&key, "pointsize"), Some(AttrValue::Int(20)));

        attrs.pop();
        attrs.push(AttributeEntry::new(Selection::cell(0, 0), 0, changes(&[("pointsize", 30_i64.into())])));
        assert_eq!(attrs.get_attr(&key, "pointsize"), Some(AttrValue::Int(30)));
    }
}
