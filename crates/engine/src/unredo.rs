//! Undo/Redo log.
//!
//! Every mutation records an (undo, redo) pair of `Operation`s. One user
//! action may record several pairs; `mark()` closes the action. `undo()` pops
//! and replays undo operations back to the previous mark, moving each entry to
//! the redo list; `redo()` does the reverse.

use std::ops::{Deref, DerefMut};

use cubesheet_core::{CellKey, Shape};

use crate::attributes::AttributeEntry;
use crate::error::GridError;

/// Default maximum length of either list before the whole log is dropped.
pub const DEFAULT_MAX_UNREDO: usize = 5000;

/// A replayable grid mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Write each (key, code) pair. None deletes the cell.
    SetCells(Vec<(CellKey, Option<String>)>),
    /// Replace the grid shape without purging cells.
    SetShape(Shape),
    /// Push an entry onto the attribute log.
    AppendAttributes(AttributeEntry),
    /// Drop the last attribute log entry.
    PopAttributes,
}

impl Operation {
    fn validate(&self) -> Result<(), GridError> {
        match self {
            Operation::SetCells(cells) if cells.is_empty() => Err(GridError::MalformedOperation(
                "cell write without any cells".to_string(),
            )),
            Operation::AppendAttributes(entry) if entry.selection.is_empty() => Err(
                GridError::MalformedOperation("attribute entry with empty selection".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// One slot of the undo or redo list.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Step { undo: Operation, redo: Operation },
    Mark,
}

#[derive(Debug, Clone)]
pub struct UnRedo {
    undo_list: Vec<Entry>,
    redo_list: Vec<Entry>,
    active: bool,
    max_len: usize,
}

impl Default for UnRedo {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNREDO)
    }
}

/// Holds the log in replay mode; dropping it leaves replay mode on every exit path.
struct Replaying<'a> {
    log: &'a mut UnRedo,
}

impl<'a> Replaying<'a> {
    fn new(log: &'a mut UnRedo) -> Self {
        log.active = true;
        Self { log }
    }
}

impl Drop for Replaying<'_> {
    fn drop(&mut self) {
        self.log.active = false;
    }
}

impl Deref for Replaying<'_> {
    type Target = UnRedo;

    fn deref(&self) -> &UnRedo {
        self.log
    }
}

impl DerefMut for Replaying<'_> {
    fn deref_mut(&mut self) -> &mut UnRedo {
        self.log
    }
}

impl UnRedo {
    pub fn new(max_len: usize) -> Self {
        Self {
            undo_list: Vec::new(),
            redo_list: Vec::new(),
            active: false,
            max_len,
        }
    }

    /// True while an undo or redo batch is being replayed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn undo_list(&self) -> &[Entry] {
        &self.undo_list
    }

    pub fn redo_list(&self) -> &[Entry] {
        &self.redo_list
    }

    pub fn can_undo(&self) -> bool {
        self.undo_list.iter().any(|e| matches!(e, Entry::Step { .. }))
    }

    pub fn can_redo(&self) -> bool {
        self.redo_list.iter().any(|e| matches!(e, Entry::Step { .. }))
    }

    /// Record an (undo, redo) pair.
    ///
    /// Returns Ok(false) without recording while a replay is running.
    /// Malformed operations are rejected here so they never reach the log.
    pub fn append(&mut self, undo: Operation, redo: Operation) -> Result<bool, GridError> {
        if self.active {
            return Ok(false);
        }

        undo.validate()?;
        redo.validate()?;

        if self.undo_list.len() > self.max_len || self.redo_list.len() > self.max_len {
            log::warn!(
                "undo/redo log exceeded {} entries, dropping history",
                self.max_len
            );
            self.reset();
        }

        self.undo_list.push(Entry::Step { undo, redo });
        Ok(true)
    }

    /// Close the current action. No mark on empty history, no doubled marks.
    pub fn mark(&mut self) {
        if matches!(self.undo_list.last(), Some(Entry::Step { .. })) {
            self.undo_list.push(Entry::Mark);
        }
    }

    /// Replay undo operations back to the previous mark.
    ///
    /// Each popped entry is moved to the redo list before `apply` runs its
    /// undo operation. Returns the number of operations replayed.
    pub fn undo<F>(&mut self, mut apply: F) -> Result<usize, GridError>
    where
        F: FnMut(&Operation) -> Result<(), GridError>,
    {
        let mut log = Replaying::new(self);

        while matches!(log.undo_list.last(), Some(Entry::Mark)) {
            log.undo_list.pop();
        }
        if matches!(log.redo_list.last(), Some(Entry::Step { .. })) {
            log.redo_list.push(Entry::Mark);
        }

        let mut replayed = 0;
        while let Some(entry) = log.undo_list.pop() {
            let Entry::Step { undo, redo } = entry else {
                break;
            };
            log.redo_list.push(Entry::Step { undo: undo.clone(), redo });
            apply(&undo)?;
            replayed += 1;
        }

        log::debug!("undo replayed {} operation(s)", replayed);
        Ok(replayed)
    }

    /// Replay redo operations back to the previous mark.
    pub fn redo<F>(&mut self, mut apply: F) -> Result<usize, GridError>
    where
        F: FnMut(&Operation) -> Result<(), GridError>,
    {
        let mut log = Replaying::new(self);

        while matches!(log.redo_list.last(), Some(Entry::Mark)) {
            log.redo_list.pop();
        }
        if matches!(log.undo_list.last(), Some(Entry::Step { .. })) {
            log.undo_list.push(Entry::Mark);
        }

        let mut replayed = 0;
        while let Some(entry) = log.redo_list.pop() {
            let Entry::Step { undo, redo } = entry else {
                break;
            };
            log.undo_list.push(Entry::Step { undo, redo: redo.clone() });
            apply(&redo)?;
            replayed += 1;
        }

        log::debug!("redo replayed {} operation(s)", replayed);
        Ok(replayed)
    }

    /// Empty both lists.
    pub fn reset(&mut self) {
        self.undo_list.clear();
        self.redo_list.clear();
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    type Cells = FxHashMap<CellKey, String>;

    fn key(row: usize) -> CellKey {
        CellKey::new(row, 0, 0)
    }

    fn write(row: usize, code: Option<&str>) -> Operation {
        Operation::SetCells(vec![(key(row), code.map(str::to_string))])
    }

    fn apply(cells: &mut Cells, op: &Operation) -> Result<(), GridError> {
        if let Operation::SetCells(writes) = op {
            for (k, code) in writes {
                match code {
                    Some(c) => cells.insert(*k, c.clone()),
                    None => cells.remove(k),
                };
            }
        }
        Ok(())
    }

    /// Records an edit the way the grid does: log, then write.
    fn edit(log: &mut UnRedo, cells: &mut Cells, row: usize, code: &str) {
        let old = cells.get(&key(row)).cloned();
        log.append(
            Operation::SetCells(vec![(key(row), old)]),
            write(row, Some(code)),
        )
        .unwrap();
        cells.insert(key(row), code.to_string());
    }

    #[test]
    fn test_mark_not_on_empty_and_not_doubled() {
        let mut log = UnRedo::default();
        log.mark();
        assert!(log.undo_list().is_empty());

        log.append(write(0, None), write(0, Some("1"))).unwrap();
        log.mark();
        log.mark();
        assert_eq!(log.undo_list().len(), 2);
        assert_eq!(log.undo_list()[1], Entry::Mark);
    }

    #[test]
    fn test_append_ignored_while_active() {
        let mut log = UnRedo::default();
        log.active = true;
        assert_eq!(log.append(write(0, None), write(0, Some("1"))), Ok(false));
        assert!(log.undo_list().is_empty());
    }

    #[test]
    fn test_malformed_rejected_at_append() {
        let mut log = UnRedo::default();
        let result = log.append(Operation::SetCells(vec![]), write(0, Some("1")));
        assert!(matches!(result, Err(GridError::MalformedOperation(_))));
        assert!(log.undo_list().is_empty());
    }

    #[test]
    fn test_undo_redo_in_batches() {
        let mut log = UnRedo::default();
        let mut cells = Cells::default();

        edit(&mut log, &mut cells, 0, "first");
        log.mark();
        edit(&mut log, &mut cells, 0, "second");
        log.mark();

        log.undo(|op| apply(&mut cells, op)).unwrap();
        assert_eq!(cells.get(&key(0)).map(String::as_str), Some("first"));

        log.undo(|op| apply(&mut cells, op)).unwrap();
        assert!(cells.get(&key(0)).is_none());

        log.redo(|op| apply(&mut cells, op)).unwrap();
        assert_eq!(cells.get(&key(0)).map(String::as_str), Some("first"));

        log.redo(|op| apply(&mut cells, op)).unwrap();
        assert_eq!(cells.get(&key(0)).map(String::as_str), Some("second"));
    }

    #[test]
    fn test_multi_entry_batch_undone_together() {
        let mut log = UnRedo::default();
        let mut cells = Cells::default();

        edit(&mut log, &mut cells, 0, "a");
        edit(&mut log, &mut cells, 1, "b");
        log.mark();

        let replayed = log.undo(|op| apply(&mut cells, op)).unwrap();
        assert_eq!(replayed, 2);
        assert!(cells.is_empty());
    }

    #[test]
    fn test_active_released_after_failed_replay() {
        let mut log = UnRedo::default();
        log.append(write(0, None), write(0, Some("1"))).unwrap();
        log.mark();

        let result = log.undo(|_| Err(GridError::InvalidAxis(7)));
        assert_eq!(result, Err(GridError::InvalidAxis(7)));
        assert!(!log.is_active());
    }

    #[test]
    fn test_reset_when_too_long() {
        let mut log = UnRedo::new(3);
        for row in 0..4 {
            log.append(write(row, None), write(row, Some("x"))).unwrap();
        }
        assert_eq!(log.undo_list().len(), 4);

        // The fifth append sees an oversized list and starts over.
        log.append(write(9, None), write(9, Some("x"))).unwrap();
        assert_eq!(log.undo_list().len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut log = UnRedo::default();
        log.append(write(0, None), write(0, Some("1"))).unwrap();
        log.mark();
        log.undo(|_| Ok(())).unwrap();
        assert!(log.can_redo());

        log.reset();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert!(!log.is_active());
    }

    #[test]
    fn test_undo_on_empty_log_is_noop() {
        let mut log = UnRedo::default();
        assert_eq!(log.undo(|_| Ok(())), Ok(0));
        assert_eq!(log.redo(|_| Ok(())), Ok(0));
    }
}
