//! Per-tenant snapshot cache.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard};

/// Tenant ID → most recent complete snapshot for one domain.
///
/// Entries are only ever replaced wholesale, so readers see either the
/// previous snapshot or the new one.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Swap in a new snapshot for a tenant.
    pub async fn replace(&self, tenant_id: &str, snapshot: T) {
        let mut entries = self.entries.write().await;
        entries.insert(tenant_id.to_string(), snapshot);
    }

    /// Shared read access to all snapshots.
    pub async fn read(&self) -> RwLockReadGuard<'_, HashMap<String, T>> {
        self.entries.read().await
    }

    /// Tenants that have a snapshot.
    pub async fn tenants(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries.keys().cloned().collect()
    }
}

impl<T: Clone> SnapshotCache<T> {
    /// Copy of a tenant's snapshot.
    pub async fn get(&self, tenant_id: &str) -> Option<T> {
        let entries = self.entries.read().await;
        entries.get(tenant_id).cloned()
    }
}
