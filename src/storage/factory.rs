// Chooses the backend for each collection key

use super::remote::{WriteLane, new_lane};
use super::transport::{DocumentTransport, HttpTransport};
use super::{Adapter, LocalAdapter, RemoteAdapter};
use crate::config::Config;
use crate::store::LocalStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Hands out adapters according to the configuration it was built with
///
/// The decision is fixed at construction: changing the configuration later
/// requires a new factory and new adapters. All remote adapters from one
/// factory share a single write lane, since they write the same document.
pub struct StorageFactory {
    config: Config,
    local: LocalStore,
    transport: Option<Arc<dyn DocumentTransport>>,
    lane: WriteLane,
}

impl StorageFactory {
    pub fn new(config: Config, local: LocalStore) -> Self {
        let transport = if config.is_cloud_enabled() {
            match HttpTransport::new(config.remote.clone()) {
                Ok(transport) => Some(Arc::new(transport) as Arc<dyn DocumentTransport>),
                Err(e) => {
                    warn!(error = ?e, "Failed to set up remote transport, falling back to local storage");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            local,
            transport,
            lane: new_lane(),
        }
    }

    /// Factory using the given transport for remote collections
    pub fn with_transport(config: Config, local: LocalStore, transport: Arc<dyn DocumentTransport>) -> Self {
        Self {
            config,
            local,
            transport: Some(transport),
            lane: new_lane(),
        }
    }

    /// Remote iff cloud storage is selected with both credentials present
    pub fn is_remote(&self) -> bool {
        self.config.is_cloud_enabled() && self.transport.is_some()
    }

    pub fn create(&self, key: &str) -> Adapter {
        match (&self.transport, self.config.is_cloud_enabled()) {
            (Some(transport), true) => {
                info!(key, document = %self.config.remote.document_id, "Using remote document storage");
                Adapter::Remote(RemoteAdapter::new(key, transport.clone(), self.lane.clone()))
            }
            _ => {
                info!(key, "Using local storage");
                Adapter::Local(LocalAdapter::new(key, self.local.clone()))
            }
        }
    }
}
