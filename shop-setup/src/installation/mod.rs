// Installation orchestration
//
// Drives the install sequence end to end:
//   create database -> persist credentials -> refresh registry -> initiate schema/data -> views
//
// IMPORTANT:
// - "Database already exists" is the only tolerated failure; everything else aborts the run.
// - There is no rollback. Steps completed before a failure stay completed.
// - Installs against the same target must be serialized by the caller.
// - Never log secrets (passwords are logged as fingerprints).

pub mod config_file;

use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use crate::context::basic::BasicContext;
use crate::database::initiation::DatabaseInitiator;
use crate::database::provisioning::{CreateOutcome, DatabaseCreator};
use crate::database::views::ViewRegenerator;
use crate::models::config_file::ConfigFile;
use crate::models::connection::{ConnectionParameters, CredentialKey};
use crate::models::state::ConfigRegistry;
use crate::security::crypto::secret_fingerprint;
use config_file::CredentialStore;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to create database '{database}'")]
    CreateDatabase {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write '{key}' to the config file")]
    PersistCredential {
        key: CredentialKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to reload config file {path:?}")]
    ReloadConfigFile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to initiate database '{database}'")]
    InitiateDatabase {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to regenerate views")]
    RegenerateViews {
        #[source]
        source: anyhow::Error,
    },
}

impl InstallError {
    /// Short name of the step that failed; used in logs and CLI output.
    pub fn step(&self) -> &'static str {
        match self {
            Self::CreateDatabase { .. } => "create_database",
            Self::PersistCredential { .. } => "persist_credentials",
            Self::ReloadConfigFile { .. } => "refresh_registry",
            Self::InitiateDatabase { .. } => "initiate_database",
            Self::RegenerateViews { .. } => "regenerate_views",
        }
    }
}

/// Installs the shop database and makes its credentials visible to the running process.
pub struct DatabaseInstaller {
    creator: Arc<dyn DatabaseCreator>,
    initiator: Arc<dyn DatabaseInitiator>,
    credentials: Arc<dyn CredentialStore>,
    views: Arc<dyn ViewRegenerator>,
    basic: Arc<BasicContext>,
    registry: Arc<ConfigRegistry>,
}

impl DatabaseInstaller {
    pub fn new(
        creator: Arc<dyn DatabaseCreator>,
        initiator: Arc<dyn DatabaseInitiator>,
        credentials: Arc<dyn CredentialStore>,
        views: Arc<dyn ViewRegenerator>,
        basic: Arc<BasicContext>,
        registry: Arc<ConfigRegistry>,
    ) -> Self {
        Self {
            creator,
            initiator,
            credentials,
            views,
            basic,
            registry,
        }
    }

    pub async fn install_with(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database_name: &str,
    ) -> Result<(), InstallError> {
        let params = ConnectionParameters::new(host, port, username, password, database_name);
        self.install(&params).await
    }

    pub async fn install(&self, params: &ConnectionParameters) -> Result<(), InstallError> {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4().simple().to_string();

        info!(
            "[PHASE: install] [STEP: start] Install requested (correlation_id={}, host={}, port={}, user={}, password={}, database={})",
            correlation_id,
            params.host,
            params.port,
            params.username,
            secret_fingerprint(&params.password),
            params.database_name
        );

        let result = self.run_steps(params, &correlation_id).await;

        match &result {
            Ok(()) => info!(
                "[PHASE: install] [STEP: complete] Install finished (correlation_id={}, duration_ms={})",
                correlation_id,
                started.elapsed().as_millis()
            ),
            Err(e) => error!(
                "[PHASE: install] [STEP: {}] Install aborted (correlation_id={}, duration_ms={}): {}",
                e.step(),
                correlation_id,
                started.elapsed().as_millis(),
                error_chain(e)
            ),
        }

        result
    }

    async fn run_steps(
        &self,
        params: &ConnectionParameters,
        correlation_id: &str,
    ) -> Result<(), InstallError> {
        match self.creator.create_database(params).await {
            Ok(CreateOutcome::Created) => info!(
                "[PHASE: install] [STEP: create_database] Database '{}' created (correlation_id={})",
                params.database_name, correlation_id
            ),
            Ok(CreateOutcome::AlreadyExists) => info!(
                "[PHASE: install] [STEP: create_database] Database '{}' already exists; continuing (correlation_id={})",
                params.database_name, correlation_id
            ),
            Err(source) => {
                return Err(InstallError::CreateDatabase {
                    database: params.database_name.clone(),
                    source,
                })
            }
        }

        self.add_credentials_to_config_file(params).await?;
        self.update_config_file_in_registry(correlation_id).await?;

        self.initiator
            .initiate_database(params)
            .await
            .map_err(|source| InstallError::InitiateDatabase {
                database: params.database_name.clone(),
                source,
            })?;
        info!(
            "[PHASE: install] [STEP: initiate_database] Schema and seed data applied (correlation_id={})",
            correlation_id
        );

        self.views
            .regenerate()
            .await
            .map_err(|source| InstallError::RegenerateViews { source })?;
        info!(
            "[PHASE: install] [STEP: regenerate_views] Views regenerated (correlation_id={})",
            correlation_id
        );

        Ok(())
    }

    // One write per key; a failure leaves the earlier writes in place.
    async fn add_credentials_to_config_file(
        &self,
        params: &ConnectionParameters,
    ) -> Result<(), InstallError> {
        for key in CredentialKey::ALL {
            self.credentials
                .replace_placeholder(key, params.credential(key))
                .await
                .map_err(|source| InstallError::PersistCredential { key, source })?;
        }
        Ok(())
    }

    async fn update_config_file_in_registry(&self, correlation_id: &str) -> Result<(), InstallError> {
        let path = self.basic.config_file_path();
        let file = ConfigFile::load(path)
            .await
            .map_err(|source| InstallError::ReloadConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        self.registry.replace_config_file(file);
        info!(
            "[PHASE: install] [STEP: refresh_registry] Config file {:?} is now active (correlation_id={})",
            path, correlation_id
        );
        Ok(())
    }
}

/// Renders an error with its full source chain, `outer: inner: ...`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}
