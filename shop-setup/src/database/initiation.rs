// Database initiation: schema and seed data
//
// Scripts live in the setup SQL directory and run in a fixed order against the target database.
// All scripts are read before connecting so a broken installation package fails without touching
// the database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::database::connection::{connect_with_retry, Target};
use crate::models::connection::ConnectionParameters;

pub const SCHEMA_SCRIPT: &str = "database_schema.sql";
pub const SEED_DATA_SCRIPT: &str = "initial_data.sql";

#[async_trait]
pub trait DatabaseInitiator: Send + Sync {
    async fn initiate_database(&self, params: &ConnectionParameters) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlScript {
    pub path: PathBuf,
    pub sql: String,
}

/// Read `names` from `dir` in order. Missing or empty scripts are errors.
pub async fn load_scripts(dir: &Path, names: &[&str]) -> Result<Vec<SqlScript>> {
    let mut scripts = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(name);
        let sql = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read SQL script: {:?}", path))?;
        if sql.trim().is_empty() {
            anyhow::bail!("SQL script is empty: {:?}", path);
        }
        scripts.push(SqlScript { path, sql });
    }
    Ok(scripts)
}

/// Run each script as one multi-statement batch on `conn` (text protocol, no parameters).
pub async fn run_scripts(
    conn: &mut sqlx::MySqlConnection,
    scripts: &[SqlScript],
    step: &str,
) -> Result<()> {
    for script in scripts {
        let started = Instant::now();
        sqlx::Executor::execute(&mut *conn, script.sql.as_str())
            .await
            .with_context(|| format!("SQL script failed: {:?}", script.path))?;
        info!(
            "[PHASE: database] [STEP: {}] Applied {:?} (duration_ms={})",
            step,
            script.path,
            started.elapsed().as_millis()
        );
    }
    Ok(())
}

/// Initiator running the shop's schema and seed scripts.
#[derive(Debug, Clone)]
pub struct SqlScriptInitiator {
    sql_dir: PathBuf,
}

impl SqlScriptInitiator {
    pub fn new(sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            sql_dir: sql_dir.into(),
        }
    }
}

#[async_trait]
impl DatabaseInitiator for SqlScriptInitiator {
    async fn initiate_database(&self, params: &ConnectionParameters) -> Result<()> {
        let scripts = load_scripts(&self.sql_dir, &[SCHEMA_SCRIPT, SEED_DATA_SCRIPT]).await?;
        let mut conn = connect_with_retry(params, Target::Database).await?;
        run_scripts(&mut conn, &scripts, "initiate_database").await
    }
}
