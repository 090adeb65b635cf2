//! Database configuration for the Grove kernel.

use secrecy::SecretString;
use serde::Deserialize;

/// Database connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Database connection URL.
    pub url: SecretString,
    /// Prefix of every physical table.
    pub namespace: String,
    /// Upper bound of the connection pool.
    pub max_connections: u32,
}
