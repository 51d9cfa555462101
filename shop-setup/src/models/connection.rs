// Connection parameters for a single install run

use std::fmt;

/// Default MySQL port, used when a config file carries no `dbPort`.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Connection data handed to every install step.
///
/// Immutable for the duration of an install. Only the individual fields are persisted
/// (through the credential store); the struct itself is never written anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database_name: database_name.into(),
        }
    }

    /// Value persisted for a credential key.
    pub fn credential(&self, key: CredentialKey) -> &str {
        match key {
            CredentialKey::Host => &self.host,
            CredentialKey::User => &self.username,
            CredentialKey::Password => &self.password,
            CredentialKey::Name => &self.database_name,
        }
    }
}

// Password stays out of Debug output (it ends up in logs via `{:?}`).
impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Placeholder keys written into the shop config file during install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    Host,
    User,
    Password,
    Name,
}

impl CredentialKey {
    /// Write order used by the installer.
    pub const ALL: [CredentialKey; 4] = [
        CredentialKey::Host,
        CredentialKey::User,
        CredentialKey::Password,
        CredentialKey::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::Host => "dbHost",
            CredentialKey::User => "dbUser",
            CredentialKey::Password => "dbPwd",
            CredentialKey::Name => "dbName",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, CredentialKey::Password)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
