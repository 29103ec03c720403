//! Rule check approvals: pruning and persistence.
//!
//! Approvals belong to the document but live outside the undo log. The
//! tracker remembers which findings this session has seen at all, so an
//! approval is only dropped once a complete run no longer reports a finding
//! that was known to exist.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{EditorError, EditorResult};
use crate::model::{ApprovalKey, Document};

#[derive(Debug, Clone, Default)]
pub struct ApprovalTracker {
    supported: BTreeSet<ApprovalKey>,
}

impl ApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Findings seen by any run of this session.
    pub fn supported(&self) -> &BTreeSet<ApprovalKey> {
        &self.supported
    }

    /// Records the findings of a run and prunes `stored`.
    ///
    /// A `partial` run only covers part of the rules, so nothing is pruned.
    /// Otherwise approvals of known findings that are no longer `present`
    /// are removed. Returns whether `stored` changed.
    pub fn update(
        &mut self,
        stored: &mut BTreeSet<ApprovalKey>,
        present: &BTreeSet<ApprovalKey>,
        partial: bool,
    ) -> bool {
        self.supported.extend(present.iter().cloned());
        if partial {
            return false;
        }
        let before = stored.len();
        stored.retain(|key| present.contains(key) || !self.supported.contains(key));
        before != stored.len()
    }

    /// [`update`](Self::update) applied to the approvals of `doc`.
    pub fn apply(&mut self, doc: &mut Document, present: &BTreeSet<ApprovalKey>, partial: bool) -> bool {
        let mut stored = doc.approvals().clone();
        if self.update(&mut stored, present, partial) {
            let pruned = doc.approvals().len() - stored.len();
            tracing::info!("Pruned {} approval(s) of resolved findings", pruned);
            doc.replace_approvals(stored)
        } else {
            false
        }
    }
}

/// Where approval changes are written as soon as they happen
pub trait DocumentStore: Send {
    fn save_approvals(&mut self, doc: &Document) -> EditorResult<()>;
}

/// Writes approvals into a board JSON file
///
/// Only the approvals of the file are replaced; unsaved content edits stay
/// out of it. A missing file receives the whole document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonFileStore {
    fn save_approvals(&mut self, doc: &Document) -> EditorResult<()> {
        let mut stored = if self.path.exists() {
            Document::load_json(&self.path)?
        } else {
            doc.clone()
        };
        stored.replace_approvals(doc.approvals().clone());
        stored.save_json(&self.path)?;
        tracing::debug!(
            "Saved {} approval(s) to {}",
            doc.approvals().len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps the last saved approvals in memory; clones share the storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<BTreeSet<ApprovalKey>>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<BTreeSet<ApprovalKey>> {
        self.saved.lock().clone()
    }

    /// Makes every following save fail, e.g. to simulate a read-only medium.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl DocumentStore for MemoryStore {
    fn save_approvals(&mut self, doc: &Document) -> EditorResult<()> {
        if *self.fail.lock() {
            return Err(EditorError::Store("storage is not writable".to_string()));
        }
        *self.saved.lock() = Some(doc.approvals().clone());
        Ok(())
    }
}
