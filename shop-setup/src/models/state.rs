// Process-wide configuration registry (in-memory)
//
// NOTE: This is NOT a global. One instance is created at process start and passed explicitly to the
// installer, the view regenerator and the shop context. It holds the active config-file handle and,
// once the application has loaded it, the live shop configuration.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context::sources::LiveConfig;
use crate::models::config_file::ConfigFile;

#[derive(Default)]
pub struct ConfigRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    config_file: Option<Arc<ConfigFile>>,
    shop_config: Option<Arc<dyn LiveConfig>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new config-file handle. Readers see either the old or the new handle.
    pub fn replace_config_file(&self, file: ConfigFile) -> Arc<ConfigFile> {
        let file = Arc::new(file);
        self.write().config_file = Some(Arc::clone(&file));
        file
    }

    pub fn config_file(&self) -> Option<Arc<ConfigFile>> {
        self.read().config_file.clone()
    }

    /// Register the live shop configuration once the application has loaded it.
    pub fn set_shop_config(&self, config: Arc<dyn LiveConfig>) {
        self.write().shop_config = Some(config);
    }

    pub fn shop_config(&self) -> Option<Arc<dyn LiveConfig>> {
        self.read().shop_config.clone()
    }

    /// Whether a shop configuration entry exists. Does not touch the database.
    pub fn is_config_loaded(&self) -> bool {
        self.read().shop_config.is_some()
    }

    // Slots only ever hold complete handles, so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("ConfigRegistry")
            .field(
                "config_file",
                &inner.config_file.as_ref().map(|c| c.path().to_path_buf()),
            )
            .field("shop_config_loaded", &inner.shop_config.is_some())
            .finish()
    }
}
