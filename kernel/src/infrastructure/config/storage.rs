//! Object storage configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Where branch images live.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Root directory; each bucket is a subdirectory.
    pub images_dir: PathBuf,
}
