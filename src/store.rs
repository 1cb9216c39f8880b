//! # Store Boundary
//!
//! The persistent store is an external collaborator. The engine only needs
//! four verbs from it: load (open-or-create) a named root, commit a root
//! after a full reconciliation pass, abort back to the committed state, and
//! pack. `MemoryStore` is the in-process reference implementation; roots are
//! serialized on commit so the boundary stays honest about what a real store
//! would persist, and a payload that does not decode as a root is rejected
//! at load time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rustc_hash::FxHashMap;

use crate::collection::CardList;
use crate::model::CardArena;
use crate::sets::SetCollection;

/// One named catalog: the owning card arena, the global collection view, and
/// the current set collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRoot {
    pub arena: CardArena,
    pub cards: CardList,
    pub sets: SetCollection,
}

/// Transactional persistence collaborator.
pub trait CatalogStore: Send {
    /// Open-or-create the named root, returning its last committed state.
    fn load_root(&mut self, name: &str) -> Result<CatalogRoot>;

    /// Persist the root. Invoked only after a full reconciliation pass,
    /// never mid-page.
    fn commit(&mut self, name: &str, root: &CatalogRoot) -> Result<()>;

    /// Discard uncommitted work, returning the last committed state.
    fn abort(&mut self, name: &str) -> Result<CatalogRoot>;

    /// Compact the underlying storage.
    fn pack(&mut self) -> Result<()>;
}

/// In-memory store holding one serialized snapshot per root name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roots: FxHashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryStore {
    fn load_root(&mut self, name: &str) -> Result<CatalogRoot> {
        match self.roots.get(name) {
            Some(bytes) => serde_json::from_slice(bytes)
                .with_context(|| format!("root {name} does not decode as a catalog root")),
            None => Ok(CatalogRoot::default()),
        }
    }

    fn commit(&mut self, name: &str, root: &CatalogRoot) -> Result<()> {
        let bytes = serde_json::to_vec(root).context("serializing catalog root")?;
        self.roots.insert(name.to_string(), bytes);
        Ok(())
    }

    fn abort(&mut self, name: &str) -> Result<CatalogRoot> {
        self.load_root(name)
    }

    fn pack(&mut self) -> Result<()> {
        for bytes in self.roots.values_mut() {
            bytes.shrink_to_fit();
        }
        Ok(())
    }
}
