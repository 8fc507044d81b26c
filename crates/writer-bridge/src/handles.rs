//! Open documents, at most one per absolute path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    Open,
    Saved,
}

#[derive(Debug, Clone)]
pub struct DocumentHandle<D> {
    pub id: u64,
    pub path: PathBuf,
    pub doc: D,
    pub state: HandleState,
}

/// Owned by the worker; nothing else touches it.
#[derive(Debug)]
pub struct HandleTable<D> {
    handles: HashMap<PathBuf, DocumentHandle<D>>,
    next_id: u64,
}

impl<D> Default for HandleTable<D> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<D: Clone> HandleTable<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&DocumentHandle<D>> {
        self.handles.get(path)
    }

    /// Register a freshly opened document. Replaces any previous handle on
    /// the same path.
    pub fn insert(&mut self, path: PathBuf, doc: D) -> DocumentHandle<D> {
        self.next_id += 1;
        let handle = DocumentHandle {
            id: self.next_id,
            path: path.clone(),
            doc,
            state: HandleState::Open,
        };
        self.handles.insert(path, handle.clone());
        handle
    }

    pub fn mark_saved(&mut self, path: &Path) {
        if let Some(handle) = self.handles.get_mut(path) {
            handle.state = HandleState::Saved;
        }
    }

    pub fn remove(&mut self, path: &Path) -> Option<DocumentHandle<D>> {
        self.handles.remove(path)
    }

    /// Forget every handle without closing anything; used after the backend
    /// was reset and the references are void.
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Take every handle out, for closing at shutdown.
    pub fn drain(&mut self) -> Vec<DocumentHandle<D>> {
        self.handles.drain().map(|(_, h)| h).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
