//! A module graph shared between threads.

use std::sync::Arc;

use modwire_core::descriptor::{ModuleDescriptor, ModuleId};
use modwire_util::errors::ModwireResult;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::delta::Delta;
use crate::graph::ModuleGraph;

/// Cloneable handle to a [`ModuleGraph`]. Mutations and resolve passes hold
/// the write lock for their whole duration; queries share the read lock.
#[derive(Debug, Clone, Default)]
pub struct SharedModuleGraph {
    inner: Arc<RwLock<ModuleGraph>>,
}

impl SharedModuleGraph {
    pub fn new(graph: ModuleGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    pub fn add_module(&self, descriptor: ModuleDescriptor) -> ModwireResult<ModuleId> {
        self.inner.write().add_module(descriptor)
    }

    pub fn remove_module(&self, id: ModuleId) -> ModwireResult<ModuleDescriptor> {
        self.inner.write().remove_module(id)
    }

    pub fn resolve(&self) -> Delta {
        self.inner.write().resolve()
    }

    pub fn resolve_triggered(&self, triggers: &[ModuleId]) -> ModwireResult<Delta> {
        self.inner.write().resolve_triggered(triggers)
    }

    /// Lock the graph for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ModuleGraph> {
        self.inner.read()
    }

    pub fn with_read<R>(&self, f: impl FnOnce(&ModuleGraph) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn is_resolved(&self, id: ModuleId) -> bool {
        self.inner.read().is_resolved(id)
    }
}

impl From<ModuleGraph> for SharedModuleGraph {
    fn from(graph: ModuleGraph) -> Self {
        Self::new(graph)
    }
}
