//! # Snapshots
//!
//! Named versions of the whole directory state, used by test suites to
//! reset the service between cases.
//!
//! ## Model
//!
//! ```text
//! slots: [ S0 ][ S1 ][ S2 ] ...      names: "base" → 1, "after-upload" → 2
//!          ▲
//!          live
//! ```
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `take_snapshot(n)` | clone live slot into a new slot, map `n` to it |
//! | `revert_to_snapshot(n)` | make `n`'s slot live (no copy) |
//! | `replace_live(s)` | install `s` in a new slot and make it live |
//!
//! Revert does not copy, so after reverting to `n` the live state *is* `n`'s
//! slot: mutations made afterwards are visible to the next revert to `n`
//! unless `n` is re-taken first. Slots that are neither live nor named are
//! reset and recycled. Names are never removed.

use std::collections::HashMap;

use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::session::SessionStore;

/// Everything a snapshot captures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryState {
    pub directory: Directory,
    pub sessions: SessionStore,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_directory(directory: Directory) -> Self {
        Self {
            directory,
            sessions: SessionStore::new(),
        }
    }
}

#[derive(Debug)]
pub struct SnapshotManager {
    slots: Vec<DirectoryState>,
    free: Vec<usize>,
    live: usize,
    names: HashMap<String, usize>,
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new(DirectoryState::default())
    }
}

impl SnapshotManager {
    pub fn new(initial: DirectoryState) -> Self {
        Self {
            slots: vec![initial],
            free: Vec::new(),
            live: 0,
            names: HashMap::new(),
        }
    }

    pub fn live(&self) -> &DirectoryState {
        &self.slots[self.live]
    }

    pub fn live_mut(&mut self) -> &mut DirectoryState {
        &mut self.slots[self.live]
    }

    pub fn take_snapshot(&mut self, name: &str) {
        let copy = self.live().clone();
        let idx = self.allocate(copy);
        if let Some(previous) = self.names.insert(name.to_string(), idx) {
            self.release(previous);
        }
    }

    pub fn revert_to_snapshot(&mut self, name: &str) -> Result<(), DirectoryError> {
        let idx = *self
            .names
            .get(name)
            .ok_or_else(|| DirectoryError::NoSuchSnapshot(name.to_string()))?;
        let previous = std::mem::replace(&mut self.live, idx);
        self.release(previous);
        Ok(())
    }

    /// Installs `state` as the live state. Named snapshots are untouched.
    pub fn replace_live(&mut self, state: DirectoryState) {
        let idx = self.allocate(state);
        let previous = std::mem::replace(&mut self.live, idx);
        self.release(previous);
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of slots currently holding a live or named state.
    pub fn retained_states(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn allocate(&mut self, state: DirectoryState) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = state;
                idx
            }
            None => {
                self.slots.push(state);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) {
        if idx == self.live || self.names.values().any(|&i| i == idx) {
            return;
        }
        self.slots[idx] = DirectoryState::default();
        self.free.push(idx);
    }
}
