// Shop context: configuration answers for every phase of the process lifetime
//
// Phases:
// - nothing loaded yet (setup, early bootstrap)      -> static fact file
// - config file loaded, database not reachable        -> static fact file
// - shop configuration loaded from the database       -> live source
//
// Only "database not configured" and "database connection failure" trigger the fallback.
// Every other live-source error reaches the caller unchanged.

pub mod basic;
pub mod coerce;
pub mod sources;

use log::debug;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::models::state::ConfigRegistry;
use crate::utils::path_resolver::join_paths;
use basic::{path_str, BasicContext};
use sources::{FactsConfigFile, LiveConfig, SessionStore, StaticSource};

pub const DEFAULT_LOG_LEVEL: &str = "error";
pub const LOG_FILE_NAME: &str = "shop.log";
pub const ADMIN_LOG_FILE_NAME: &str = "admin.log";
pub const LOG_DIR_NAME: &str = "log";

const PARAM_LOG_LEVEL: &str = "sLogLevel";
const PARAM_CONTACT_FORM_FIELDS: &str = "contactFormRequiredFields";
const PARAM_SKIP_LOG_TAGS: &str = "aLogSkipTags";
const VAR_SHOP_DIR: &str = "sShopDir";
const VAR_ADMIN_QUERY_LOG: &str = "blLogChangesInAdmin";
const SESSION_ADMIN_USER: &str = "auth";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("database is not configured")]
    DatabaseNotConfigured,

    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("admin user not found in session")]
    AdminUserNotFound,

    #[error("config parameter '{name}' has an invalid value: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConfigError {
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::DatabaseConnection(msg.into())
    }

    #[must_use]
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The two conditions meaning "the live source is not reachable yet".
    pub fn is_database_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseNotConfigured | Self::DatabaseConnection(_)
        )
    }
}

/// Configuration resolver. Holds no state of its own beyond its sources.
#[derive(Clone)]
pub struct ShopContext {
    basic: Arc<BasicContext>,
    registry: Arc<ConfigRegistry>,
    facts: Arc<dyn StaticSource>,
    session: Arc<dyn SessionStore>,
}

impl ShopContext {
    /// Context reading facts from the config file named by `basic`.
    pub fn new(
        basic: Arc<BasicContext>,
        registry: Arc<ConfigRegistry>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        let facts = Arc::new(FactsConfigFile::new(basic.config_file_path()));
        Self {
            basic,
            registry,
            facts,
            session,
        }
    }

    pub fn with_static_source(mut self, facts: Arc<dyn StaticSource>) -> Self {
        self.facts = facts;
        self
    }

    pub fn basic(&self) -> &BasicContext {
        &self.basic
    }

    pub fn registry(&self) -> &Arc<ConfigRegistry> {
        &self.registry
    }

    pub fn log_level(&self) -> Result<String, ConfigError> {
        let level = self.with_fallback(
            self.config_parameter(PARAM_LOG_LEVEL),
            || self.facts.get_var(PARAM_LOG_LEVEL),
        )?;

        Ok(level
            .filter(|v| !v.is_null())
            .map(|v| coerce::to_string(&v))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()))
    }

    pub fn log_file_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = self.with_fallback(
            self.live().and_then(|live| live.logs_dir()),
            || {
                let shop_dir = self
                    .facts
                    .get_var(VAR_SHOP_DIR)
                    .map(|v| coerce::to_string(&v))
                    .unwrap_or_default();
                join_paths([shop_dir.as_str(), LOG_DIR_NAME])
            },
        )?;

        Ok(join_paths([path_str(&dir).as_str(), LOG_FILE_NAME]))
    }

    pub fn required_contact_form_fields(&self) -> Result<Vec<String>, ConfigError> {
        let fields = self.config_parameter(PARAM_CONTACT_FORM_FIELDS)?;
        Ok(coerce::to_string_list(fields.as_ref()))
    }

    pub fn current_shop_id(&self) -> Result<i64, ConfigError> {
        let id = self.live()?.shop_id()?;
        coerce::to_int("shopId", &id)
    }

    pub fn all_shop_ids(&self) -> Result<Vec<i64>, ConfigError> {
        self.live()?
            .shop_ids()?
            .iter()
            .map(|id| coerce::to_int("shopIds", id))
            .collect()
    }

    pub fn is_admin(&self) -> Result<bool, ConfigError> {
        if self.is_config_loaded() {
            self.live()?.is_admin()
        } else {
            Ok(self.basic.is_admin_entry_point())
        }
    }

    /// Read from the fact file only; the database is never consulted.
    pub fn is_admin_query_log_enabled(&self) -> bool {
        coerce::to_bool(self.facts.get_var(VAR_ADMIN_QUERY_LOG).as_ref())
    }

    pub fn admin_log_file_path(&self) -> PathBuf {
        join_paths([
            path_str(self.basic.source_path()).as_str(),
            LOG_DIR_NAME,
            ADMIN_LOG_FILE_NAME,
        ])
    }

    /// Empty until the shop configuration is loaded; the shop may still be bootstrapping.
    pub fn skip_log_tags(&self) -> Result<Vec<String>, ConfigError> {
        if !self.is_config_loaded() {
            return Ok(Vec::new());
        }
        let tags = self.config_parameter(PARAM_SKIP_LOG_TAGS)?;
        Ok(coerce::to_string_list(tags.as_ref()))
    }

    /// Falsy session values (absent, null, "", "0", 0, false) mean no admin is logged in.
    pub fn admin_user_id(&self) -> Result<String, ConfigError> {
        let id = self.session.get_variable(SESSION_ADMIN_USER);
        match id {
            Some(v) if coerce::to_bool(Some(&v)) => Ok(coerce::to_string(&v)),
            _ => Err(ConfigError::AdminUserNotFound),
        }
    }

    pub fn is_config_loaded(&self) -> bool {
        self.registry.is_config_loaded()
    }

    fn live(&self) -> Result<Arc<dyn LiveConfig>, ConfigError> {
        self.registry
            .shop_config()
            .ok_or(ConfigError::DatabaseNotConfigured)
    }

    fn config_parameter(&self, name: &str) -> Result<Option<Value>, ConfigError> {
        self.live()?.get_param(name, None)
    }

    fn with_fallback<T>(
        &self,
        live: Result<T, ConfigError>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, ConfigError> {
        match live {
            Err(e) if e.is_database_unavailable() => {
                debug!(
                    "[PHASE: bootstrap] [STEP: config] Live config unavailable, using fact file: {}",
                    e
                );
                Ok(fallback())
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for ShopContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopContext")
            .field("basic", &self.basic)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config_file::ConfigFile;
    use serde_json::json;
    use sources::{MemorySession, ShopConfig};
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};

    // -------------------------------------------------------------------------
    // Stubs
    // -------------------------------------------------------------------------

    /// Live source failing every call with a fixed error kind.
    struct FailingLive {
        kind: fn() -> ConfigError,
    }

    impl LiveConfig for FailingLive {
        fn get_param(&self, _: &str, _: Option<Value>) -> Result<Option<Value>, ConfigError> {
            Err((self.kind)())
        }
        fn logs_dir(&self) -> Result<PathBuf, ConfigError> {
            Err((self.kind)())
        }
        fn shop_id(&self) -> Result<Value, ConfigError> {
            Err((self.kind)())
        }
        fn shop_ids(&self) -> Result<Vec<Value>, ConfigError> {
            Err((self.kind)())
        }
        fn is_admin(&self) -> Result<bool, ConfigError> {
            Err((self.kind)())
        }
    }

    /// Static source counting reads.
    struct CountingFacts {
        file: ConfigFile,
        reads: AtomicU32,
    }

    impl StaticSource for CountingFacts {
        fn get_var(&self, name: &str) -> Option<Value> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.file.get_var(name)
        }
    }

    fn facts(toml: &str) -> Arc<dyn StaticSource> {
        Arc::new(ConfigFile::parse(Path::new("config.toml"), toml).unwrap())
    }

    fn context(live: Option<Arc<dyn LiveConfig>>, facts_toml: &str) -> ShopContext {
        let registry = Arc::new(ConfigRegistry::new());
        if let Some(live) = live {
            registry.set_shop_config(live);
        }
        ShopContext::new(
            Arc::new(BasicContext::from_root("/srv/shop")),
            registry,
            Arc::new(MemorySession::new()),
        )
        .with_static_source(facts(facts_toml))
    }

    fn not_configured() -> Arc<dyn LiveConfig> {
        Arc::new(FailingLive {
            kind: || ConfigError::DatabaseNotConfigured,
        })
    }

    fn connection_failed() -> Arc<dyn LiveConfig> {
        Arc::new(FailingLive {
            kind: || ConfigError::connection("connection refused"),
        })
    }

    fn unrelated_failure() -> Arc<dyn LiveConfig> {
        Arc::new(FailingLive {
            kind: || ConfigError::Other(anyhow::anyhow!("corrupt config row")),
        })
    }

    const FACTS: &str = r#"
sLogLevel = "warning"
sShopDir = "/srv/shop/source/"
blLogChangesInAdmin = true
"#;

    // -------------------------------------------------------------------------
    // Log level
    // -------------------------------------------------------------------------

    #[test]
    fn log_level_prefers_live_source() {
        let live = ShopConfig::new(1).with_param("sLogLevel", json!("debug"));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(ctx.log_level().unwrap(), "debug");
    }

    #[test]
    fn log_level_falls_back_when_database_not_configured() {
        let ctx = context(Some(not_configured()), FACTS);
        assert_eq!(ctx.log_level().unwrap(), "warning");
    }

    #[test]
    fn log_level_falls_back_when_connection_fails() {
        let ctx = context(Some(connection_failed()), FACTS);
        assert_eq!(ctx.log_level().unwrap(), "warning");
    }

    #[test]
    fn log_level_falls_back_when_nothing_is_loaded() {
        let ctx = context(None, FACTS);
        assert_eq!(ctx.log_level().unwrap(), "warning");
    }

    #[test]
    fn log_level_propagates_unrelated_errors() {
        let ctx = context(Some(unrelated_failure()), FACTS);
        let err = ctx.log_level().unwrap_err();
        assert!(matches!(err, ConfigError::Other(_)), "{:?}", err);
        assert_eq!(err.to_string(), "corrupt config row");
    }

    #[test]
    fn log_level_defaults_to_error_when_both_sources_are_empty() {
        let ctx = context(None, "");
        assert_eq!(ctx.log_level().unwrap(), DEFAULT_LOG_LEVEL);

        let ctx = context(Some(Arc::new(ShopConfig::new(1))), "");
        assert_eq!(ctx.log_level().unwrap(), "error");
    }

    // -------------------------------------------------------------------------
    // Log file paths
    // -------------------------------------------------------------------------

    #[test]
    fn log_file_path_uses_live_logs_dir() {
        let live = ShopConfig::new(1).with_logs_dir("/var/log/shop/");
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(
            ctx.log_file_path().unwrap(),
            PathBuf::from("/var/log/shop/shop.log")
        );
    }

    #[test]
    fn log_file_path_falls_back_to_shop_dir() {
        let ctx = context(Some(not_configured()), FACTS);
        assert_eq!(
            ctx.log_file_path().unwrap(),
            PathBuf::from("/srv/shop/source/log/shop.log")
        );

        let ctx = context(Some(connection_failed()), FACTS);
        assert_eq!(
            ctx.log_file_path().unwrap(),
            PathBuf::from("/srv/shop/source/log/shop.log")
        );
    }

    #[test]
    fn log_file_path_propagates_unrelated_errors() {
        let ctx = context(Some(unrelated_failure()), FACTS);
        assert!(matches!(
            ctx.log_file_path(),
            Err(ConfigError::Other(_))
        ));
    }

    #[test]
    fn admin_log_file_path_is_under_source_path() {
        let ctx = context(Some(unrelated_failure()), FACTS);
        assert_eq!(
            ctx.admin_log_file_path(),
            PathBuf::from("/srv/shop/source/log/admin.log")
        );
    }

    // -------------------------------------------------------------------------
    // Live-only accessors
    // -------------------------------------------------------------------------

    #[test]
    fn required_contact_form_fields_default_to_empty() {
        let ctx = context(Some(Arc::new(ShopConfig::new(1))), FACTS);
        assert!(ctx.required_contact_form_fields().unwrap().is_empty());

        let live = ShopConfig::new(1).with_param("contactFormRequiredFields", json!(null));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert!(ctx.required_contact_form_fields().unwrap().is_empty());
    }

    #[test]
    fn required_contact_form_fields_are_returned_in_order() {
        let live = ShopConfig::new(1)
            .with_param("contactFormRequiredFields", json!(["email", "subject"]));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(
            ctx.required_contact_form_fields().unwrap(),
            vec!["email", "subject"]
        );
    }

    #[test]
    fn required_contact_form_fields_have_no_fallback() {
        let ctx = context(Some(not_configured()), FACTS);
        assert!(matches!(
            ctx.required_contact_form_fields(),
            Err(ConfigError::DatabaseNotConfigured)
        ));
    }

    #[test]
    fn current_shop_id_requires_live_source() {
        let ctx = context(None, FACTS);
        assert!(matches!(
            ctx.current_shop_id(),
            Err(ConfigError::DatabaseNotConfigured)
        ));

        let ctx = context(Some(connection_failed()), FACTS);
        assert!(matches!(
            ctx.current_shop_id(),
            Err(ConfigError::DatabaseConnection(_))
        ));

        let ctx = context(Some(Arc::new(ShopConfig::new(3))), FACTS);
        assert_eq!(ctx.current_shop_id().unwrap(), 3);
    }

    #[test]
    fn all_shop_ids_preserve_source_order() {
        let live = ShopConfig::new(1).with_shop_ids(vec![5, 1, 3]);
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(ctx.all_shop_ids().unwrap(), vec![5, 1, 3]);
    }

    #[test]
    fn all_shop_ids_coerce_string_ids() {
        struct StringIds;
        impl LiveConfig for StringIds {
            fn get_param(&self, _: &str, d: Option<Value>) -> Result<Option<Value>, ConfigError> {
                Ok(d)
            }
            fn logs_dir(&self) -> Result<PathBuf, ConfigError> {
                Ok(PathBuf::new())
            }
            fn shop_id(&self) -> Result<Value, ConfigError> {
                Ok(json!("2"))
            }
            fn shop_ids(&self) -> Result<Vec<Value>, ConfigError> {
                Ok(vec![json!("2"), json!(1), json!("10")])
            }
            fn is_admin(&self) -> Result<bool, ConfigError> {
                Ok(false)
            }
        }

        let ctx = context(Some(Arc::new(StringIds)), FACTS);
        assert_eq!(ctx.current_shop_id().unwrap(), 2);
        assert_eq!(ctx.all_shop_ids().unwrap(), vec![2, 1, 10]);
    }

    // -------------------------------------------------------------------------
    // Admin
    // -------------------------------------------------------------------------

    #[test]
    fn is_admin_uses_entry_point_until_config_is_loaded() {
        let registry = Arc::new(ConfigRegistry::new());
        let basic = Arc::new(BasicContext::from_root("/srv/shop").with_admin_entry_point(true));
        let ctx = ShopContext::new(basic, Arc::clone(&registry), Arc::new(MemorySession::new()))
            .with_static_source(facts(FACTS));
        assert!(ctx.is_admin().unwrap());

        registry.set_shop_config(Arc::new(ShopConfig::new(1).with_admin(false)));
        assert!(!ctx.is_admin().unwrap());
    }

    #[test]
    fn admin_query_log_reads_static_source_only() {
        let counting = Arc::new(CountingFacts {
            file: ConfigFile::parse(Path::new("config.toml"), FACTS).unwrap(),
            reads: AtomicU32::new(0),
        });
        // A live source that would fail loudly if consulted.
        let ctx = context(Some(unrelated_failure()), "")
            .with_static_source(Arc::clone(&counting) as Arc<dyn StaticSource>);

        assert!(ctx.is_admin_query_log_enabled());
        assert_eq!(counting.reads.load(Ordering::SeqCst), 1);

        let ctx = context(None, "blLogChangesInAdmin = \"0\"");
        assert!(!ctx.is_admin_query_log_enabled());
        let ctx = context(None, "");
        assert!(!ctx.is_admin_query_log_enabled());
    }

    #[test]
    fn admin_user_id_is_returned_as_string() {
        let session = MemorySession::new().with_variable("auth", json!("oxdefaultadmin"));
        let ctx = ShopContext::new(
            Arc::new(BasicContext::from_root("/srv/shop")),
            Arc::new(ConfigRegistry::new()),
            Arc::new(session),
        );
        assert_eq!(ctx.admin_user_id().unwrap(), "oxdefaultadmin");
    }

    #[test]
    fn admin_user_id_missing_or_empty_is_an_error() {
        let ctx = context(None, FACTS);
        assert!(matches!(
            ctx.admin_user_id(),
            Err(ConfigError::AdminUserNotFound)
        ));

        for empty in [json!(""), json!(null), json!("0"), json!(0), json!(false)] {
            let session = MemorySession::new().with_variable("auth", empty);
            let ctx = ShopContext::new(
                Arc::new(BasicContext::from_root("/srv/shop")),
                Arc::new(ConfigRegistry::new()),
                Arc::new(session),
            );
            assert!(matches!(
                ctx.admin_user_id(),
                Err(ConfigError::AdminUserNotFound)
            ));
        }
    }

    // -------------------------------------------------------------------------
    // Skip-log tags
    // -------------------------------------------------------------------------

    #[test]
    fn skip_log_tags_empty_when_config_not_loaded() {
        let ctx = context(None, FACTS);
        assert!(ctx.skip_log_tags().unwrap().is_empty());
    }

    #[test]
    fn skip_log_tags_null_value_is_empty_list() {
        let live = ShopConfig::new(1).with_param("aLogSkipTags", json!(null));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert!(ctx.skip_log_tags().unwrap().is_empty());
    }

    #[test]
    fn skip_log_tags_read_from_live_source() {
        let live = ShopConfig::new(1).with_param("aLogSkipTags", json!(["oxsession", "oxcache"]));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(ctx.skip_log_tags().unwrap(), vec!["oxsession", "oxcache"]);

        let live = ShopConfig::new(1).with_param("aLogSkipTags", json!("oxsession"));
        let ctx = context(Some(Arc::new(live)), FACTS);
        assert_eq!(ctx.skip_log_tags().unwrap(), vec!["oxsession"]);
    }
}
