//! Configuration management for the Grove kernel.
//!
//! Defaults are layered under environment variables prefixed `GROVE` with
//! `__` separating nested keys, e.g. `GROVE__DATABASE__URL`.
//!
//! # Example
//!
//! ```
//! use grove_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! assert_eq!(settings.hierarchy.page_size, 50);
//! ```

pub mod contacts;
pub mod database;
pub mod hierarchy;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use contacts::ContactSettings;
pub use database::DatabaseSettings;
pub use hierarchy::HierarchySettings;
pub use server::ServerSettings;
pub use storage::StorageSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level configuration for the Grove kernel.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Server settings.
    pub server: ServerSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// Image object storage.
    pub storage: StorageSettings,
    /// Contact list sync; absent disables it.
    pub contacts: Option<ContactSettings>,
    /// Hierarchy engine tuning.
    #[serde(default)]
    pub hierarchy: HierarchySettings,
}

impl Settings {
    /// Creates a new settings instance from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("GROVE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9090)?
            .set_default("telemetry.service_name", "grove-kernel")?
            .set_default("telemetry.sampling_ratio", 1.0)?
            .set_default("telemetry.log_level", "info")?
            .set_default("telemetry.json", true)?
            .set_default("database.url", "sqlite://grove.db?mode=rwc")?
            .set_default("database.namespace", namespace_for(&run_mode))?
            .set_default("database.max_connections", 5)?
            .set_default("storage.images_dir", "./images")?
            .set_default("hierarchy.page_size", 50)?
            .add_source(Environment::with_prefix("GROVE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

/// Table namespace for a run mode: production tables are kept apart from
/// every other environment.
#[must_use]
pub fn namespace_for(run_mode: &str) -> &'static str {
    if run_mode == "production" { "prod" } else { "dev" }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}
