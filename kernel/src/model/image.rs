//! Branch profile and cover image metadata.

use serde::{Deserialize, Serialize};

use crate::store::{Key, Record, TableDef};

/// Image metadata table, keyed `<branch>-picture` / `<branch>-cover`.
pub const BRANCH_IMAGES: TableDef = TableDef {
    name: "branch_images",
    hash_key: "id",
    range_key: None,
    indexes: &[],
};

/// Which of a branch's images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Profile picture.
    Picture,
    /// Cover banner.
    Cover,
}

impl ImageKind {
    /// Both kinds.
    pub const ALL: [ImageKind; 2] = [ImageKind::Picture, ImageKind::Cover];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Picture => "picture",
            ImageKind::Cover => "cover",
        }
    }

    /// Widths of the resized variants: full size, then thumbnail.
    #[must_use]
    pub fn resized_widths(self) -> [u32; 2] {
        match self {
            ImageKind::Picture => [640, 200],
            ImageKind::Cover => [1920, 800],
        }
    }

    /// Metadata row id for `branchid`.
    #[must_use]
    pub fn image_id(self, branchid: &str) -> String {
        format!("{branchid}-{}", self.as_str())
    }
}

/// Metadata of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchImage {
    /// `<branch>-<kind>`.
    pub id: String,
    /// Upload time in milliseconds.
    pub date: i64,
    /// File extension of every variant.
    pub extension: String,
}

impl BranchImage {
    /// Object key of the original upload.
    #[must_use]
    pub fn original_key(&self) -> String {
        format!("{}-orig.{}", self.id, self.extension)
    }

    /// Object keys of every resized variant.
    #[must_use]
    pub fn resized_keys(&self, kind: ImageKind) -> Vec<String> {
        kind.resized_widths()
            .iter()
            .map(|w| format!("{}-{w}.{}", self.id, self.extension))
            .collect()
    }
}

impl Record for BranchImage {
    const TABLE: &'static TableDef = &BRANCH_IMAGES;

    fn key(&self) -> Key {
        Key::hash(self.id.as_str())
    }
}
