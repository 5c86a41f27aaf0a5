//! Snapshot-based undo/redo.
//!
//! [`HistoryManager`] is a bounded, linear stack of labelled snapshots with a
//! cursor. [`CanvasHistory`] specializes it to whole-document JSON snapshots
//! of a [`Canvas`].

use serde_json::Value;

use crate::config::DEFAULT_MAX_HISTORY;
use crate::error::CanvasResult;
use crate::Canvas;

/// Label of the snapshot recorded when history starts.
pub const INITIAL_STATE_LABEL: &str = "初始状态";

/// A labelled snapshot. Immutable once pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState<T> {
    label: String,
    state: T,
}

impl<T> HistoryState<T> {
    /// Action label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Snapshot data.
    #[must_use]
    pub fn state(&self) -> &T {
        &self.state
    }
}

/// Bounded linear undo/redo stack.
///
/// The cursor points at the snapshot matching the live state. Pushing after
/// an undo discards the redo branch; exceeding the depth evicts the oldest
/// snapshot.
#[derive(Debug, Clone)]
pub struct HistoryManager<T> {
    entries: Vec<HistoryState<T>>,
    cursor: Option<usize>,
    max_history: usize,
    recording: bool,
}

impl<T: Clone> HistoryManager<T> {
    /// Create an empty history holding at most `max_history` snapshots
    /// (at least one).
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_history: max_history.max(1),
            recording: true,
        }
    }

    /// Record a snapshot. Ignored while recording is paused.
    pub fn push(&mut self, label: impl Into<String>, state: T) {
        if !self.recording {
            return;
        }
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(HistoryState {
            label: label.into(),
            state,
        });
        if self.entries.len() > self.max_history {
            self.entries.remove(0);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back and return the snapshot now current.
    pub fn undo(&mut self) -> Option<T> {
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        Some(self.entries[cursor].state.clone())
    }

    /// Step forward and return the snapshot now current.
    pub fn redo(&mut self) -> Option<T> {
        let cursor = self.cursor.map_or(0, |c| c + 1);
        if cursor >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor);
        Some(self.entries[cursor].state.clone())
    }

    /// Whether [`undo`](Self::undo) would restore something.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    /// Whether [`redo`](Self::redo) would restore something.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    /// Label of the action an undo would revert.
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        let cursor = self.cursor.filter(|&c| c > 0)?;
        Some(self.entries[cursor].label())
    }

    /// Label of the action a redo would reapply.
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.entries.get(next).map(HistoryState::label)
    }

    /// The snapshot matching the live state.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryState<T>> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Stop recording until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.recording = false;
    }

    /// Resume recording.
    pub fn resume(&mut self) {
        self.recording = true;
    }

    /// Whether pushes are currently recorded.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no snapshot is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained snapshots.
    #[must_use]
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Retained snapshots, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryState<T>> {
        self.entries.iter()
    }
}

impl<T: Clone> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

/// Whole-document history for a [`Canvas`].
#[derive(Debug, Clone)]
pub struct CanvasHistory {
    history: HistoryManager<Value>,
}

impl CanvasHistory {
    /// Start a history and record the canvas as its initial state.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas cannot be serialized.
    pub fn new(canvas: &Canvas, max_history: usize) -> CanvasResult<Self> {
        let mut history = Self {
            history: HistoryManager::new(max_history),
        };
        history.save_state(canvas, INITIAL_STATE_LABEL)?;
        Ok(history)
    }

    /// Snapshot the canvas under `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas cannot be serialized.
    pub fn save_state(&mut self, canvas: &Canvas, label: &str) -> CanvasResult<()> {
        let snapshot = canvas.to_value()?;
        self.history.push(label, snapshot);
        tracing::debug!("Recorded history state {label:?} ({} retained)", self.history.len());
        Ok(())
    }

    /// Restore the previous snapshot onto `canvas`. Returns whether anything
    /// was restored.
    ///
    /// A snapshot that fails to restore leaves both the canvas and the cursor
    /// where they were.
    pub fn undo(&mut self, canvas: &mut Canvas) -> bool {
        let cursor = self.history.cursor;
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.restore_or_rewind(canvas, &snapshot, cursor)
    }

    /// Restore the next snapshot onto `canvas`. Returns whether anything was
    /// restored.
    pub fn redo(&mut self, canvas: &mut Canvas) -> bool {
        let cursor = self.history.cursor;
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.restore_or_rewind(canvas, &snapshot, cursor)
    }

    fn restore_or_rewind(
        &mut self,
        canvas: &mut Canvas,
        snapshot: &Value,
        previous_cursor: Option<usize>,
    ) -> bool {
        self.history.pause();
        let restored = canvas.restore(snapshot);
        self.history.resume();
        match restored {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to restore history snapshot: {e}");
                self.history.cursor = previous_cursor;
                false
            }
        }
    }

    /// Whether an undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the action an undo would revert.
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    /// Label of the action a redo would reapply.
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    /// The underlying snapshot stack.
    #[must_use]
    pub fn manager(&self) -> &HistoryManager<Value> {
        &self.history
    }
}
