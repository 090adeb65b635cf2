//! Hierarchy engine configuration.

use serde::Deserialize;

/// Tuning of the hierarchy engine.
#[derive(Debug, Deserialize, Clone)]
pub struct HierarchySettings {
    /// Items per store page and per descendant listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}
