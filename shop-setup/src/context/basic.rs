// Basic context: filesystem layout of the shop and the process entry point
//
// Available from the first line of the process on; never touches the database.
// Settings are layered with the `config` crate:
//   built-in defaults -> optional settings file -> SHOP_SETUP_* environment variables

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::path_resolver::{join_paths, resolve_deployment_folder};

pub const ENV_PREFIX: &str = "SHOP_SETUP";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
struct BasicSettings {
    shop_root_path: PathBuf,
    #[serde(default)]
    source_path: Option<PathBuf>,
    #[serde(default)]
    config_file_path: Option<PathBuf>,
    #[serde(default)]
    setup_sql_path: Option<PathBuf>,
    #[serde(default)]
    admin_entry_point: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicContext {
    shop_root_path: PathBuf,
    source_path: PathBuf,
    config_file_path: PathBuf,
    setup_sql_path: PathBuf,
    admin_entry_point: bool,
}

impl BasicContext {
    /// Resolve settings from defaults, an optional settings file and the environment.
    pub fn load(settings_file: Option<&Path>) -> Result<Self> {
        let root = resolve_deployment_folder()?;

        let mut builder = Config::builder()
            .set_default("shop_root_path", root.to_string_lossy().to_string())?
            .set_default("admin_entry_point", false)?;

        if let Some(path) = settings_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: BasicSettings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build basic settings")?
            .try_deserialize()
            .context("Failed to deserialize basic settings")?;

        Ok(Self::from_settings(settings))
    }

    /// Standard layout under `shop_root_path`.
    pub fn from_root(shop_root_path: impl Into<PathBuf>) -> Self {
        Self::from_settings(BasicSettings {
            shop_root_path: shop_root_path.into(),
            source_path: None,
            config_file_path: None,
            setup_sql_path: None,
            admin_entry_point: false,
        })
    }

    fn from_settings(s: BasicSettings) -> Self {
        let root = s.shop_root_path;
        let source_path = s
            .source_path
            .unwrap_or_else(|| join_paths([path_str(&root).as_str(), "source"]));
        let config_file_path = s
            .config_file_path
            .unwrap_or_else(|| join_paths([path_str(&source_path).as_str(), CONFIG_FILE_NAME]));
        let setup_sql_path = s
            .setup_sql_path
            .unwrap_or_else(|| join_paths([path_str(&source_path).as_str(), "Setup", "Sql"]));

        Self {
            shop_root_path: root,
            source_path,
            config_file_path,
            setup_sql_path,
            admin_entry_point: s.admin_entry_point,
        }
    }

    pub fn with_admin_entry_point(mut self, admin: bool) -> Self {
        self.admin_entry_point = admin;
        self
    }

    pub fn with_config_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_path = path.into();
        self
    }

    pub fn with_setup_sql_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.setup_sql_path = path.into();
        self
    }

    pub fn shop_root_path(&self) -> &Path {
        &self.shop_root_path
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    pub fn setup_sql_path(&self) -> &Path {
        &self.setup_sql_path
    }

    /// Whether the process was started through the admin entry point.
    pub fn is_admin_entry_point(&self) -> bool {
        self.admin_entry_point
    }
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_root_derives_standard_layout() {
        let ctx = BasicContext::from_root("/var/www/shop/");
        assert_eq!(ctx.source_path(), Path::new("/var/www/shop/source"));
        assert_eq!(
            ctx.config_file_path(),
            Path::new("/var/www/shop/source/config.toml")
        );
        assert_eq!(
            ctx.setup_sql_path(),
            Path::new("/var/www/shop/source/Setup/Sql")
        );
        assert!(!ctx.is_admin_entry_point());
    }

    #[test]
    fn load_reads_settings_file() {
        let mut settings = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            settings,
            "shop_root_path = \"/srv/shop\"\nconfig_file_path = \"/etc/shop/config.toml\"\nadmin_entry_point = true"
        )
        .unwrap();

        let ctx = BasicContext::load(Some(settings.path())).unwrap();
        assert_eq!(ctx.shop_root_path(), Path::new("/srv/shop"));
        assert_eq!(ctx.source_path(), Path::new("/srv/shop/source"));
        assert_eq!(ctx.config_file_path(), Path::new("/etc/shop/config.toml"));
        assert!(ctx.is_admin_entry_point());
    }

    #[test]
    fn load_fails_for_missing_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BasicContext::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
