//! Contact list sync configuration.

use secrecy::SecretString;
use serde::Deserialize;

/// Contact service endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ContactSettings {
    /// Base URL; contacts are sent to `<endpoint>/contacts`.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: Option<SecretString>,
}
