//! In-memory capability registry

use crate::error::{CapabilityError, Result};
use crate::ports::{CapabilityRegistry, ConsensusCapabilityApi};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Capabilities by id, held in process memory.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    capabilities: RwLock<HashMap<String, Arc<dyn ConsensusCapabilityApi>>>,
}

impl InMemoryCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ConsensusCapabilityApi>> {
        self.capabilities.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.capabilities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CapabilityRegistry for InMemoryCapabilityRegistry {
    fn add(&self, capability: Arc<dyn ConsensusCapabilityApi>) -> Result<()> {
        let info = capability.info();
        let mut capabilities = self.capabilities.write();
        if capabilities.contains_key(&info.id) {
            return Err(CapabilityError::Registry(format!(
                "capability {} already registered",
                info.id
            )));
        }

        info!(capability_id = %info.id, capability_type = %info.capability_type, "Capability registered");
        capabilities.insert(info.id, capability);
        Ok(())
    }

    fn remove(&self, id: &str) -> bool {
        let removed = self.capabilities.write().remove(id).is_some();
        if removed {
            info!(capability_id = id, "Capability removed");
        }
        removed
    }
}
