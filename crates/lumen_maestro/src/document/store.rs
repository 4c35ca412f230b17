//! Versioned document store.
//!
//! Each source id moves through `unopened -> open(v) -> open(v') -> closed`
//! with strictly increasing versions. Version checks and replacement happen
//! under the map's entry lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lsp_types::TextDocumentContentChangeEvent;

use super::{Snapshot, UpdateError};

#[derive(Debug, Clone)]
enum DocumentState {
    Open(Snapshot),
    Closed,
}

/// Thread-safe document store.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<String, DocumentState>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document. A closed id may be opened again.
    pub fn open(&self, id: &str, text: &str, version: i32) -> Result<Snapshot, UpdateError> {
        let snapshot = Snapshot::new(text, version);
        match self.documents.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if let DocumentState::Open(_) = entry.get() {
                    return Err(UpdateError::AlreadyOpen(id.to_string()));
                }
                entry.insert(DocumentState::Open(snapshot.clone()));
            }
            Entry::Vacant(entry) => {
                entry.insert(DocumentState::Open(snapshot.clone()));
            }
        }
        tracing::debug!(id, version, "document opened");
        Ok(snapshot)
    }

    /// Replace the text of an open document with a newer version.
    pub fn update(&self, id: &str, text: &str, version: i32) -> Result<Snapshot, UpdateError> {
        self.replace(id, version, |_| Snapshot::new(text, version))
    }

    /// Apply protocol changes to the current snapshot of an open document.
    pub fn apply_changes(
        &self,
        id: &str,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<Snapshot, UpdateError> {
        self.replace(id, version, |current| current.apply_changes(changes, version))
    }

    fn replace(
        &self,
        id: &str,
        version: i32,
        next: impl FnOnce(&Snapshot) -> Snapshot,
    ) -> Result<Snapshot, UpdateError> {
        let mut entry = self
            .documents
            .get_mut(id)
            .ok_or_else(|| UpdateError::NotOpen(id.to_string()))?;

        let current = match &*entry {
            DocumentState::Open(snapshot) => snapshot,
            DocumentState::Closed => return Err(UpdateError::Closed(id.to_string())),
        };
        if version <= current.version() {
            tracing::error!(
                id,
                current = current.version(),
                received = version,
                "rejected out-of-order document update"
            );
            return Err(UpdateError::StaleVersion {
                id: id.to_string(),
                current: current.version(),
                received: version,
            });
        }

        let snapshot = next(current);
        *entry = DocumentState::Open(snapshot.clone());
        Ok(snapshot)
    }

    /// Close a document. Later updates for the id are rejected.
    pub fn close(&self, id: &str) -> Result<(), UpdateError> {
        let mut entry = self
            .documents
            .get_mut(id)
            .ok_or_else(|| UpdateError::NotOpen(id.to_string()))?;
        if let DocumentState::Closed = *entry {
            return Err(UpdateError::Closed(id.to_string()));
        }
        *entry = DocumentState::Closed;
        tracing::debug!(id, "document closed");
        Ok(())
    }

    /// Current snapshot of an open document.
    pub fn get(&self, id: &str) -> Option<Snapshot> {
        match self.documents.get(id)?.value() {
            DocumentState::Open(snapshot) => Some(snapshot.clone()),
            DocumentState::Closed => None,
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Whether `version` is still the latest version of an open document.
    pub fn is_current(&self, id: &str, version: i32) -> bool {
        self.get(id).is_some_and(|snapshot| snapshot.version() == version)
    }

    /// Whether `snapshot` is the one the store currently holds for `id`.
    ///
    /// Unlike [`Self::is_current`] this tells a reopened document apart from
    /// the session it replaced, even at the same version.
    pub fn is_latest(&self, id: &str, snapshot: &Snapshot) -> bool {
        self.get(id).is_some_and(|current| current.same_as(snapshot))
    }

    /// Ids of all open documents.
    pub fn ids(&self) -> Vec<String> {
        self.documents
            .iter()
            .filter(|entry| matches!(entry.value(), DocumentState::Open(_)))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
