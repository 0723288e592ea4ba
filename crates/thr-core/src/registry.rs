// ── Registry facade ──
//
// One handle that owns the store and the two services built on it.
// CLI and TUI construct a `Registry` and never touch the store directly
// except for one-shot reads.

use std::sync::Arc;

use tracing::info;

use crate::config::RegistryConfig;
use crate::controls::ControlsService;
use crate::directory::DirectoryService;
use crate::error::CoreError;
use crate::store::{MemoryStore, RegistryStore, RestStore};

/// Entry point for consumers. Cheaply cloneable.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    directory: DirectoryService,
    controls: ControlsService,
}

impl Registry {
    /// Connect to a remote store. No request is sent until the first load.
    pub fn connect(config: &RegistryConfig) -> Result<Self, CoreError> {
        let store = RestStore::connect(config)?;
        info!(url = %config.url, "registry configured");
        Ok(Self::with_store(Arc::new(store)))
    }

    /// In-memory registry seeded with sample data.
    pub fn demo() -> Self {
        Self::with_store(Arc::new(MemoryStore::demo()))
    }

    pub fn with_store(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            directory: DirectoryService::new(Arc::clone(&store)),
            controls: ControlsService::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn controls(&self) -> &ControlsService {
        &self.controls
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::controls::FilterContext;

    #[tokio::test]
    async fn services_share_one_store() {
        let registry = Registry::demo();
        let families = registry.directory().load_families().await.unwrap();
        assert!(!families.is_empty());

        registry
            .controls()
            .set_context(FilterContext {
                family_id: Some(families[0].id.clone()),
                ..FilterContext::default()
            })
            .await
            .unwrap();
        assert!(registry.controls().snapshot().error.is_none());
    }

    #[test]
    fn connect_rejects_blank_key() {
        let config = RegistryConfig::new(
            "https://abc.supabase.co".parse().unwrap(),
            SecretString::from(String::new()),
        );
        let err = Registry::connect(&config).err().unwrap();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
