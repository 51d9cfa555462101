// Database provisioning: create the shop database
//
// Key design decisions:
// - Creation reports `AlreadyExists` as a normal outcome, not an error. Re-running setup against
//   an existing database is an expected operation.
// - Names are checked only for what quoting cannot fix; the exact string checked is the one sent.
// - The already-exists condition is detected from the server error number (1007), never from
//   message text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

use crate::database::connection::{connect_with_retry, Target};
use crate::models::connection::ConnectionParameters;

/// MySQL `ER_DB_CREATE_EXISTS`
pub const MYSQL_ER_DB_CREATE_EXISTS: u16 = 1007;

// =============================================================================
// Types
// =============================================================================

/// Successful outcomes of a create attempt. Failures are the `Err` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[async_trait]
pub trait DatabaseCreator: Send + Sync {
    async fn create_database(&self, params: &ConnectionParameters) -> Result<CreateOutcome>;
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a database name as MySQL sees it once backtick-quoted.
///
/// No trimming: the value checked is the value sent.
pub fn validate_db_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Database name is required.".to_string());
    }
    if name.chars().count() > 64 {
        return Err("Database name must be 64 characters or fewer.".to_string());
    }
    if name.ends_with(' ') {
        return Err("Database name must not end with a space.".to_string());
    }
    let reserved = ["mysql", "information_schema", "performance_schema", "sys"];
    if reserved.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(format!("'{}' is a reserved database name.", name));
    }
    Ok(())
}

// =============================================================================
// MySQL SQL Generation (backtick-quoted)
// =============================================================================

/// Backtick-quote a MySQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// CREATE DATABASE without IF NOT EXISTS, so an existing database surfaces as error 1007.
pub fn mysql_create_db_stmt(db_name: &str) -> String {
    format!(
        "CREATE DATABASE {} CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;",
        quote_ident(db_name)
    )
}

pub fn is_already_exists_error(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>())
        .map(|my| my.number() == MYSQL_ER_DB_CREATE_EXISTS)
        .unwrap_or(false)
}

// =============================================================================
// MySQL creator
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct MySqlDatabaseCreator;

#[async_trait]
impl DatabaseCreator for MySqlDatabaseCreator {
    async fn create_database(&self, params: &ConnectionParameters) -> Result<CreateOutcome> {
        validate_db_name(&params.database_name).map_err(|msg| anyhow::anyhow!(msg))?;

        let mut conn = connect_with_retry(params, Target::Server).await?;
        let stmt = mysql_create_db_stmt(&params.database_name);

        match sqlx::Executor::execute(&mut conn, stmt.as_str()).await {
            Ok(_) => {
                info!(
                    "[PHASE: database] [STEP: create_database] Created database '{}'",
                    params.database_name
                );
                Ok(CreateOutcome::Created)
            }
            Err(e) if is_already_exists_error(&e) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(anyhow::Error::new(e)).with_context(|| {
                format!("CREATE DATABASE failed for '{}'", params.database_name)
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
