use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    document::Document,
    error::{StencilError, StencilResult},
};

/// Resolved documents by name, shared between renders.
///
/// Reads take a shared lock, so concurrent renders only contend when a
/// document is inserted or removed. A disabled cache stores nothing: reads
/// miss and writes fail with [`StencilError::CachingDisabled`].
#[derive(Debug)]
pub struct DocumentCache {
    enabled: bool,
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl DocumentCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stores `document` under its name and returns the shared handle.
    ///
    /// # Errors
    ///
    /// - [`StencilError::CachingDisabled`] on a disabled cache.
    /// - [`StencilError::UnresolvedAst`] when `document` is not flat.
    /// - [`StencilError::KeyExists`] when an entry exists and `replace` is
    ///   unset.
    pub fn insert(&self, document: Document, replace: bool) -> StencilResult<Arc<Document>> {
        if !self.enabled {
            return Err(StencilError::CachingDisabled);
        }
        if !document.is_flat() {
            return Err(StencilError::UnresolvedAst {
                name: document.name().to_string(),
                missing: document.unresolved_references().iter().cloned().collect(),
            });
        }

        let name = document.name().to_string();
        let document = Arc::new(document);
        let mut documents = self.documents.write();
        if !replace && documents.contains_key(&name) {
            return Err(StencilError::KeyExists {
                template_name: name,
            });
        }
        documents.insert(name, Arc::clone(&document));
        drop(documents);
        Ok(document)
    }

    pub fn retrieve(&self, name: &str) -> Option<Arc<Document>> {
        if !self.enabled {
            return None;
        }
        self.documents.read().get(name).cloned()
    }

    /// # Errors
    ///
    /// [`StencilError::CachingDisabled`] on a disabled cache, and
    /// [`StencilError::NoValueForKey`] when nothing is stored under `name`.
    pub fn remove(&self, name: &str) -> StencilResult<Arc<Document>> {
        if !self.enabled {
            return Err(StencilError::CachingDisabled);
        }
        self.documents
            .write()
            .remove(name)
            .ok_or_else(|| StencilError::NoValueForKey {
                template_name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }
}
