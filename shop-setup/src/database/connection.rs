// MySQL connection management for the install collaborators
//
// Connect attempts are bounded by a timeout and retried on transient failures only
// (I/O errors, timeouts). Authentication and protocol errors fail on the first attempt.

use anyhow::{Context, Result};
use log::{info, warn};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::models::connection::ConnectionParameters;
use crate::utils::logging::mask_connection_url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const CONNECT_ATTEMPTS: usize = 3;

/// Which database the session should select after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Server-level session (needed to create the database itself)
    Server,
    /// Session bound to `params.database_name`
    Database,
}

pub fn connect_options(params: &ConnectionParameters, target: Target) -> MySqlConnectOptions {
    let opts = MySqlConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.username)
        .password(&params.password)
        .charset("utf8mb4");
    match target {
        Target::Server => opts,
        Target::Database => opts.database(&params.database_name),
    }
}

/// Connection URL with the password masked; safe for logs.
pub fn describe(params: &ConnectionParameters, target: Target) -> String {
    let db = match target {
        Target::Server => "",
        Target::Database => params.database_name.as_str(),
    };
    mask_connection_url(&format!(
        "mysql://{}:{}@{}:{}/{}",
        params.username, params.password, params.host, params.port, db
    ))
}

pub fn is_transient_connect_error(e: &anyhow::Error) -> bool {
    if let Some(sqlx::Error::Io(_)) = e.downcast_ref::<sqlx::Error>() {
        return true;
    }
    let msg = e.to_string().to_ascii_lowercase();
    msg.contains("timed out")
        || msg.contains("timeout")
        || msg.contains("connection reset")
        || msg.contains("connection refused")
}

async fn connect_once(opts: &MySqlConnectOptions) -> Result<MySqlConnection> {
    match timeout(CONNECT_TIMEOUT, MySqlConnection::connect_with(opts)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(anyhow::Error::new(e)),
        Err(_) => Err(anyhow::anyhow!(
            "Connection attempt timed out after {}s",
            CONNECT_TIMEOUT.as_secs()
        )),
    }
}

/// Open a MySQL session, retrying transient failures with bounded backoff.
pub async fn connect_with_retry(
    params: &ConnectionParameters,
    target: Target,
) -> Result<MySqlConnection> {
    let started = Instant::now();
    let described = describe(params, target);
    let opts = connect_options(params, target);

    let retry_strategy = ExponentialBackoff::from_millis(100)
        .factor(2)
        .max_delay(Duration::from_secs(2))
        .take(CONNECT_ATTEMPTS - 1)
        .map(jitter);

    let conn = RetryIf::start(
        retry_strategy,
        || connect_once(&opts),
        |e: &anyhow::Error| {
            let transient = is_transient_connect_error(e);
            if transient {
                warn!(
                    "[PHASE: database] [STEP: connect] Transient connect failure; will retry (target={}, err={})",
                    described, e
                );
            }
            transient
        },
    )
    .await
    .with_context(|| format!("Unable to connect to {}", described))?;

    info!(
        "[PHASE: database] [STEP: connect] Connected (target={}, duration_ms={})",
        described,
        started.elapsed().as_millis()
    );
    Ok(conn)
}
