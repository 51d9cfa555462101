// Derived view regeneration
//
// Runs against whatever connection data the registry's active config file holds, so it must be
// called after the installer has refreshed the registry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::database::connection::{connect_with_retry, Target};
use crate::database::initiation::{load_scripts, run_scripts};
use crate::models::state::ConfigRegistry;

pub const VIEWS_SCRIPT: &str = "views.sql";

#[async_trait]
pub trait ViewRegenerator: Send + Sync {
    async fn regenerate(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlScriptViewRegenerator {
    registry: Arc<ConfigRegistry>,
    sql_dir: PathBuf,
}

impl SqlScriptViewRegenerator {
    pub fn new(registry: Arc<ConfigRegistry>, sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            sql_dir: sql_dir.into(),
        }
    }
}

#[async_trait]
impl ViewRegenerator for SqlScriptViewRegenerator {
    async fn regenerate(&self) -> Result<()> {
        let file = self
            .registry
            .config_file()
            .ok_or_else(|| anyhow::anyhow!("No active config file; cannot regenerate views"))?;
        let params = file
            .connection_parameters()
            .context("Active config file has no usable connection data")?;

        let scripts = load_scripts(&self.sql_dir, &[VIEWS_SCRIPT]).await?;
        let mut conn = connect_with_retry(&params, Target::Database).await?;
        run_scripts(&mut conn, &scripts, "regenerate_views").await
    }
}
