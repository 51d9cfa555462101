// Configuration sources consumed by the shop context
//
// - LiveConfig: database-backed shop configuration (reachable only once the shop is bootstrapped)
// - StaticSource: fact file on disk, always readable
// - SessionStore: per-request session variables

use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::context::ConfigError;
use crate::models::config_file::ConfigFile;

/// Database-backed configuration of a running shop.
///
/// Implementations report `DatabaseNotConfigured` / `DatabaseConnection` when the backing store is
/// unavailable; the context falls back to the static source only for those two errors.
pub trait LiveConfig: Send + Sync {
    fn get_param(&self, name: &str, default: Option<Value>) -> Result<Option<Value>, ConfigError>;

    fn logs_dir(&self) -> Result<PathBuf, ConfigError>;

    fn shop_id(&self) -> Result<Value, ConfigError>;

    fn shop_ids(&self) -> Result<Vec<Value>, ConfigError>;

    fn is_admin(&self) -> Result<bool, ConfigError>;
}

/// Bootstrap fact file. Never fails; a missing entry is `None`.
pub trait StaticSource: Send + Sync {
    fn get_var(&self, name: &str) -> Option<Value>;
}

pub trait SessionStore: Send + Sync {
    fn get_variable(&self, name: &str) -> Option<Value>;
}

// =============================================================================
// Static source: config file read straight from disk
// =============================================================================

/// Fact file at a fixed location, read on first use and memoized.
///
/// A file that cannot be read or parsed behaves as an empty fact file.
#[derive(Debug)]
pub struct FactsConfigFile {
    path: PathBuf,
    file: OnceLock<ConfigFile>,
}

impl FactsConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> &ConfigFile {
        self.file
            .get_or_init(|| match ConfigFile::load_blocking(&self.path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(
                        "[PHASE: bootstrap] [STEP: facts] Fact file unavailable, using empty facts (path={:?}): {:#}",
                        self.path, e
                    );
                    ConfigFile::empty(&self.path)
                }
            })
    }
}

impl StaticSource for FactsConfigFile {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.file().get_var(name)
    }
}

impl StaticSource for ConfigFile {
    fn get_var(&self, name: &str) -> Option<Value> {
        ConfigFile::get_var(self, name)
    }
}

// =============================================================================
// Live source: in-memory snapshot registered by the application
// =============================================================================

/// Loaded shop configuration.
///
/// The application builds this once its configuration subsystem has read the database and
/// registers it with `ConfigRegistry::set_shop_config`.
#[derive(Debug, Clone, Default)]
pub struct ShopConfig {
    shop_id: i64,
    shop_ids: Vec<i64>,
    logs_dir: PathBuf,
    admin: bool,
    params: HashMap<String, Value>,
}

impl ShopConfig {
    pub fn new(shop_id: i64) -> Self {
        Self {
            shop_id,
            shop_ids: vec![shop_id],
            ..Default::default()
        }
    }

    pub fn with_shop_ids(mut self, shop_ids: Vec<i64>) -> Self {
        self.shop_ids = shop_ids;
        self
    }

    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = logs_dir.into();
        self
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

impl LiveConfig for ShopConfig {
    fn get_param(&self, name: &str, default: Option<Value>) -> Result<Option<Value>, ConfigError> {
        Ok(self.params.get(name).cloned().or(default))
    }

    fn logs_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.logs_dir.clone())
    }

    fn shop_id(&self) -> Result<Value, ConfigError> {
        Ok(Value::from(self.shop_id))
    }

    fn shop_ids(&self) -> Result<Vec<Value>, ConfigError> {
        Ok(self.shop_ids.iter().map(|id| Value::from(*id)).collect())
    }

    fn is_admin(&self) -> Result<bool, ConfigError> {
        Ok(self.admin)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session variables held in memory (CLI runs, tests, single-request handlers).
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    vars: HashMap<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }
}

impl SessionStore for MemorySession {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }
}
