// Loaded view of the shop configuration file (TOML)

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::models::connection::{ConnectionParameters, CredentialKey, DEFAULT_DB_PORT};

/// Immutable snapshot of the shop config file.
///
/// Values are exposed as `serde_json::Value` so that file-backed and database-backed sources
/// share one value type.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: PathBuf,
    vars: toml::Table,
}

impl ConfigFile {
    /// Read and parse the file at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(path, &content)
    }

    /// Blocking variant for callers outside the async runtime (logging bootstrap).
    pub fn load_blocking(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let vars: toml::Table = content
            .parse()
            .with_context(|| format!("Failed to parse config file as TOML: {:?}", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            vars,
        })
    }

    /// Config file with no entries; used when a static source cannot be read.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            vars: toml::Table::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_var(&self, name: &str) -> Option<Value> {
        let raw = self.vars.get(name)?;
        serde_json::to_value(raw).ok()
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.vars.get(name)? {
            toml::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Connection data currently stored in the file.
    ///
    /// `dbPort` is optional and defaults to the MySQL port; the four credential keys are required.
    pub fn connection_parameters(&self) -> Result<ConnectionParameters> {
        let required = |key: CredentialKey| -> Result<String> {
            self.get_str(key.as_str()).ok_or_else(|| {
                anyhow::anyhow!("Config file {:?} has no '{}' entry", self.path, key)
            })
        };

        let port = match self.vars.get("dbPort") {
            None => DEFAULT_DB_PORT,
            Some(toml::Value::Integer(p)) => u16::try_from(*p)
                .map_err(|_| anyhow::anyhow!("dbPort out of range: {}", p))?,
            Some(toml::Value::String(s)) => s
                .trim()
                .parse::<u16>()
                .with_context(|| format!("dbPort is not a valid port: '{}'", s))?,
            Some(other) => anyhow::bail!("dbPort has unsupported type: {}", other.type_str()),
        };

        Ok(ConnectionParameters {
            host: required(CredentialKey::Host)?,
            port,
            username: required(CredentialKey::User)?,
            password: required(CredentialKey::Password)?,
            database_name: required(CredentialKey::Name)?,
        })
    }
}
