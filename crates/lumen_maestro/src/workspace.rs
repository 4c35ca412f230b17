//! Workspace of open source documents.
//!
//! The workspace owns the document store and, per source id, the latest
//! [`VirtualCodeTree`] plus the generator state that produced it. Trees are
//! never mutated once published: readers hold an `Arc` to a tree and keep a
//! consistent view no matter how many edits land afterwards.

use std::sync::Arc;

use dashmap::DashMap;
use lsp_types::TextDocumentContentChangeEvent;
use lumen_relief::Diagnostic;
use parking_lot::Mutex;

use crate::compiler::{TemplateCompiler, WorkerCompiler};
use crate::config::LumenConfig;
use crate::diagnostics::reshape_frontmatter_diagnostics;
use crate::document::{DocumentStore, Snapshot, UpdateError};
use crate::virtual_code::{VirtualCode, VirtualCodeGenerator, VirtualCodeTree};

/// Open documents and their virtual code trees.
pub struct Workspace<C> {
    compiler: C,
    config: LumenConfig,
    store: DocumentStore,
    trees: DashMap<String, Arc<VirtualCodeTree>>,
    generators: DashMap<String, Arc<Mutex<VirtualCodeGenerator>>>,
}

impl Workspace<WorkerCompiler> {
    /// Workspace whose compiler runs on a worker thread with the configured
    /// timeout.
    pub fn with_worker<T>(compiler: T, config: LumenConfig) -> std::io::Result<Self>
    where
        T: TemplateCompiler + 'static,
    {
        let worker = WorkerCompiler::spawn(compiler, config.timeout())?;
        Ok(Self::new(worker, config))
    }
}

impl<C: TemplateCompiler> Workspace<C> {
    pub fn new(compiler: C, config: LumenConfig) -> Self {
        Self {
            compiler,
            config,
            store: DocumentStore::new(),
            trees: DashMap::new(),
            generators: DashMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &LumenConfig {
        &self.config
    }

    /// Open a document and build its first tree.
    pub fn open(
        &self,
        id: &str,
        text: &str,
        version: i32,
    ) -> Result<Arc<VirtualCodeTree>, UpdateError> {
        let snapshot = self.store.open(id, text, version)?;
        Ok(self.publish(id, snapshot))
    }

    /// Replace the text of an open document. `version` must be newer than
    /// the current one.
    pub fn update(
        &self,
        id: &str,
        text: &str,
        version: i32,
    ) -> Result<Arc<VirtualCodeTree>, UpdateError> {
        let snapshot = self.store.update(id, text, version)?;
        Ok(self.publish(id, snapshot))
    }

    /// Apply protocol text changes to an open document.
    pub fn apply_changes(
        &self,
        id: &str,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<Arc<VirtualCodeTree>, UpdateError> {
        let snapshot = self.store.apply_changes(id, changes, version)?;
        Ok(self.publish(id, snapshot))
    }

    /// Close a document and drop its tree.
    pub fn close(&self, id: &str) -> Result<(), UpdateError> {
        self.store.close(id)?;
        self.trees.remove(id);
        self.generators.remove(id);
        Ok(())
    }

    /// Latest tree of an open document.
    pub fn tree(&self, id: &str) -> Option<Arc<VirtualCodeTree>> {
        self.trees.get(id).map(|tree| Arc::clone(tree.value()))
    }

    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.store.get(id)
    }

    /// Resolve a virtual code id to its tree and code.
    pub fn find_virtual_code(
        &self,
        generated_id: &str,
    ) -> Option<(Arc<VirtualCodeTree>, Arc<VirtualCode>)> {
        self.trees.iter().find_map(|entry| {
            let tree = entry.value();
            let code = if tree.root.id == generated_id {
                Some(Arc::clone(&tree.root))
            } else {
                tree.root.find_shared(generated_id).cloned()
            };
            code.map(|code| (Arc::clone(tree), code))
        })
    }

    /// Diagnostics of the latest tree.
    pub fn diagnostics(&self, id: &str) -> Vec<Diagnostic> {
        self.tree(id)
            .map(|tree| tree.diagnostics.clone())
            .unwrap_or_default()
    }

    pub fn has_errors(&self, id: &str) -> bool {
        self.tree(id).is_some_and(|tree| tree.has_errors())
    }

    /// Whether results computed for `version` are still worth publishing.
    pub fn is_current(&self, id: &str, version: i32) -> bool {
        self.store.is_current(id, version)
    }

    /// Carry checker diagnostics reported on the frontmatter projection of
    /// `id` back to the source document.
    pub fn schema_diagnostics(&self, id: &str, reported: &[Diagnostic]) -> Vec<Diagnostic> {
        let Some(tree) = self.tree(id) else {
            return Vec::new();
        };
        let projection = tree.find(&format!("{id}.frontmatter-ts.ts"));
        reshape_frontmatter_diagnostics(reported, projection, tree.frontmatter, tree.root.len())
    }

    /// Generate the tree for `snapshot` and publish it if `snapshot` is
    /// still the document's latest. A tree generated for a superseded
    /// snapshot, including one from before a close and reopen, is returned
    /// to the caller but never published.
    fn publish(&self, id: &str, snapshot: Snapshot) -> Arc<VirtualCodeTree> {
        let generator = Arc::clone(
            self.generators
                .entry(id.to_string())
                .or_default()
                .value(),
        );
        let mut generator = generator.lock();

        let previous = self.tree(id);
        let tree = Arc::new(generator.generate(
            id,
            &snapshot,
            self.config.document_kind(id),
            self.config.collection_for(id),
            &self.compiler,
            previous.as_deref(),
        ));

        // Checked while holding the entry: a concurrent close removes the
        // tree only after this insert.
        let entry = self.trees.entry(id.to_string());
        if !self.store.is_latest(id, &snapshot) {
            tracing::debug!(id, version = tree.version, "snapshot superseded, tree discarded");
            return tree;
        }
        entry.insert(Arc::clone(&tree));
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, CompileOutput};
    use crossbeam_channel::{bounded, Receiver, Sender};
    use lsp_types::{Position, Range};
    use std::thread;

    struct Offline;

    impl TemplateCompiler for Offline {
        fn compile(&self, _text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            Err(CompileError::Failed("offline".into()))
        }
    }

    /// Holds compiles of one text until released.
    struct Gate {
        held: &'static str,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl TemplateCompiler for Gate {
        fn compile(&self, text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            if text == self.held {
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
            Err(CompileError::Failed("gated".into()))
        }
    }

    fn gated(held: &'static str) -> (Workspace<Gate>, Receiver<()>, Sender<()>) {
        let (entered, entered_rx) = bounded(1);
        let (release_tx, release) = bounded(1);
        let gate = Gate {
            held,
            entered,
            release,
        };
        (Workspace::new(gate, LumenConfig::default()), entered_rx, release_tx)
    }

    const ID: &str = "src/pages/index.astro";

    fn workspace() -> Workspace<Offline> {
        Workspace::new(Offline, LumenConfig::default())
    }

    #[test]
    fn test_lifecycle() {
        let workspace = workspace();
        let first = workspace.open(ID, "<style>a{}</style>", 1).unwrap();
        assert_eq!(first.version, 1);

        let second = workspace.update(ID, "<style>b{}</style>", 2).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(workspace.tree(ID).unwrap().version, 2);
        // Readers of the old tree keep their view
        assert_eq!(first.find(&format!("{ID}.0.css")).unwrap().text(), "a{}");

        workspace.close(ID).unwrap();
        assert!(workspace.tree(ID).is_none());
        assert_eq!(
            workspace.update(ID, "x", 3).unwrap_err(),
            UpdateError::Closed(ID.to_string())
        );
    }

    #[test]
    fn test_stale_update_rejected() {
        let workspace = workspace();
        workspace.open(ID, "<p>a</p>", 5).unwrap();

        let err = workspace.update(ID, "<p>old</p>", 4).unwrap_err();
        assert_eq!(
            err,
            UpdateError::StaleVersion {
                id: ID.to_string(),
                current: 5,
                received: 4,
            }
        );
        assert!(workspace.update(ID, "<p>same</p>", 5).is_err());
        assert_eq!(workspace.tree(ID).unwrap().root.text(), "<p>a</p>");
        assert!(workspace.is_current(ID, 5));
    }

    #[test]
    fn test_update_unknown_document() {
        assert_eq!(
            workspace().update("nope.astro", "", 1).unwrap_err(),
            UpdateError::NotOpen("nope.astro".to_string())
        );
    }

    #[test]
    fn test_apply_changes() {
        let workspace = workspace();
        workspace.open(ID, "<style>a{}</style>", 1).unwrap();
        let change = TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(0, 7), Position::new(0, 8))),
            range_length: None,
            text: "b".into(),
        };

        let tree = workspace.apply_changes(ID, &[change], 2).unwrap();
        assert_eq!(tree.root.text(), "<style>b{}</style>");
        assert_eq!(tree.changed, vec![ID.to_string(), format!("{ID}.0.css")]);
    }

    #[test]
    fn test_find_virtual_code() {
        let workspace = workspace();
        workspace.open(ID, "<style>a{}</style>", 1).unwrap();

        let (tree, code) = workspace.find_virtual_code(&format!("{ID}.0.css")).unwrap();
        assert_eq!(tree.source_id, ID);
        assert_eq!(code.text(), "a{}");
        assert!(workspace.find_virtual_code(ID).is_some());
        assert!(workspace.find_virtual_code("missing.css").is_none());
    }

    #[test]
    fn test_compiler_failure_diagnostics() {
        let workspace = workspace();
        workspace.open(ID, "<div/>", 1).unwrap();
        assert!(workspace.has_errors(ID));
        assert_eq!(workspace.diagnostics(ID).len(), 1);
        assert!(!workspace.has_errors("other.astro"));
    }

    #[test]
    fn test_reopen_after_close() {
        let workspace = workspace();
        workspace.open(ID, "<p/>", 1).unwrap();
        workspace.close(ID).unwrap();
        let tree = workspace.open(ID, "<p/>", 1).unwrap();
        assert_eq!(tree.changed.len(), 2);
    }

    #[test]
    fn test_generation_from_before_reopen_is_discarded() {
        let (workspace, entered, release) = gated("<p>OLD</p>");
        workspace.open(ID, "<p>a</p>", 1).unwrap();

        thread::scope(|scope| {
            let pending = scope.spawn(|| workspace.update(ID, "<p>OLD</p>", 5));
            entered.recv().unwrap();

            workspace.close(ID).unwrap();
            workspace.open(ID, "<p>NEW</p>", 1).unwrap();
            release.send(()).unwrap();

            let stale = pending.join().unwrap().unwrap();
            assert_eq!(stale.version, 5);
        });

        let tree = workspace.tree(ID).unwrap();
        assert_eq!(tree.root.text(), "<p>NEW</p>");
        assert_eq!(tree.version, 1);

        // Later edits of the new session still publish
        workspace.update(ID, "<p>NEWER</p>", 2).unwrap();
        assert_eq!(workspace.tree(ID).unwrap().root.text(), "<p>NEWER</p>");
    }

    #[test]
    fn test_generation_during_close_leaves_no_tree() {
        let (workspace, entered, release) = gated("<p>late</p>");
        workspace.open(ID, "<p>a</p>", 1).unwrap();

        thread::scope(|scope| {
            let pending = scope.spawn(|| workspace.update(ID, "<p>late</p>", 2));
            entered.recv().unwrap();
            workspace.close(ID).unwrap();
            release.send(()).unwrap();
            pending.join().unwrap().unwrap();
        });

        assert!(workspace.tree(ID).is_none());
        assert!(workspace.find_virtual_code(ID).is_none());
    }
}
