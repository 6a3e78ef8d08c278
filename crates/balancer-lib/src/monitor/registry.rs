//! Registry of known backend servers

use crate::models::ServerMetrics;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

/// Map of server_id -> latest metrics snapshot
///
/// Entries are replaced whole under their shard lock, so readers never see
/// a partially written record and different servers update independently.
/// First-seen order is kept separately for deterministic iteration.
#[derive(Default)]
pub struct ServerRegistry {
    servers: DashMap<String, ServerMetrics>,
    order: RwLock<Vec<String>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot for `metrics.server_id`
    ///
    /// Returns true when the server was not known before.
    pub fn upsert(&self, metrics: ServerMetrics) -> bool {
        match self.servers.entry(metrics.server_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(metrics);
                false
            }
            Entry::Vacant(entry) => {
                debug!(server_id = %metrics.server_id, "Registering server");
                self.order.write().push(metrics.server_id.clone());
                entry.insert(metrics);
                true
            }
        }
    }

    /// Get a server snapshot by ID
    pub fn get(&self, server_id: &str) -> Option<ServerMetrics> {
        self.servers.get(server_id).map(|r| r.clone())
    }

    pub fn contains(&self, server_id: &str) -> bool {
        self.servers.contains_key(server_id)
    }

    /// Server ids in first-seen order
    pub fn ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// All snapshots in first-seen order
    pub fn list(&self) -> Vec<ServerMetrics> {
        self.ids().iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
