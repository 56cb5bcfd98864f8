//! Name <-> type handle cache

use conduit_sdk::TypeHandle;
use dashmap::DashMap;

/// Resolved type handles keyed by dotted name, and the inverse
#[derive(Debug, Default)]
pub struct ClassResolutionCache {
    by_name: DashMap<String, TypeHandle>,
    by_handle: DashMap<TypeHandle, String>,
}

impl ClassResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).map(|h| *h)
    }

    pub fn name(&self, handle: TypeHandle) -> Option<String> {
        self.by_handle.get(&handle).map(|n| n.clone())
    }

    /// Record a resolution in both directions. The first name recorded for a
    /// handle stays its canonical name.
    pub fn insert(&self, name: &str, handle: TypeHandle) {
        self.by_name.insert(name.to_string(), handle);
        self.by_handle
            .entry(handle)
            .or_insert_with(|| name.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&self) {
        self.by_name.clear();
        self.by_handle.clear();
    }
}
