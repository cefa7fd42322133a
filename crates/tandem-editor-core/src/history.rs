//! Versioned editor state with undo/redo.
//!
//! Provides:
//! - `EditorState` - current document, version counter and snapshot history
//! - `ChangeType` - what kind of edit produced a history entry

use tracing::trace;

use crate::document::Document;

/// Default number of undo steps kept.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// The kind of change recorded with a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    ApplyEntity,
    InsertCharacters,
    RemoveRange,
    SplitBlock,
    RemoveBlock,
    ChangeBlockText,
    /// Wholesale replacement, e.g. a loaded document.
    InsertFragment,
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    change: ChangeType,
    document: Document,
}

/// Current document plus bounded undo/redo stacks of whole snapshots.
///
/// Every push, undo and redo bumps `version`, so consumers can tell which
/// document state an overlay model was derived from.
#[derive(Clone, Debug)]
pub struct EditorState {
    current: Document,
    version: u64,
    last_change: Option<ChangeType>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_steps: usize,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl EditorState {
    pub fn new(document: Document) -> Self {
        Self::with_max_steps(document, DEFAULT_MAX_STEPS)
    }

    pub fn with_max_steps(document: Document, max_steps: usize) -> Self {
        Self {
            current: document,
            version: 0,
            last_change: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_change(&self) -> Option<ChangeType> {
        self.last_change
    }

    /// Make `document` current as one undoable step.
    pub fn push(&mut self, document: Document, change: ChangeType) {
        // Clear redo stack on new edit
        self.redo_stack.clear();

        let previous = std::mem::replace(&mut self.current, document);
        self.undo_stack.push(HistoryEntry {
            change,
            document: previous,
        });

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }

        self.last_change = Some(change);
        self.version += 1;
        trace!(target: "tandem::history", version = self.version, ?change, "pushed");
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Restore the previous document. Returns true if successful.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let undone = std::mem::replace(&mut self.current, entry.document);
        self.redo_stack.push(HistoryEntry {
            change: entry.change,
            document: undone,
        });
        self.last_change = None;
        self.version += 1;
        true
    }

    /// Re-apply the last undone change. Returns true if successful.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let previous = std::mem::replace(&mut self.current, entry.document);
        self.undo_stack.push(HistoryEntry {
            change: entry.change,
            document: previous,
        });
        self.last_change = Some(entry.change);
        self.version += 1;
        true
    }

    /// Clear all undo/redo history.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
