//! Branch rows.

use serde::{Deserialize, Serialize};

use crate::model::validate::{self, Field, Validate};
use crate::store::{IndexDef, Key, Record, TableDef};

/// Index over branches by recorded parent, sorted by creation date.
pub const PARENT_DATE_INDEX: &str = "parentid-date-index";

/// Branch table.
pub const BRANCHES: TableDef = TableDef {
    name: "branches",
    hash_key: "id",
    range_key: None,
    indexes: &[IndexDef {
        name: PARENT_DATE_INDEX,
        hash_key: "parentid",
        range_key: Some("date"),
    }],
};

/// A community node in the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Unique slug.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Username of the creator.
    pub creator: String,
    /// Creation time in milliseconds.
    pub date: i64,
    /// Recorded parent, or `root`. Presentation only: the tag index is the
    /// authoritative hierarchy.
    pub parentid: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Community rules.
    #[serde(default)]
    pub rules: String,
    /// Number of posts.
    #[serde(default)]
    pub post_count: i64,
    /// Sum of post points.
    #[serde(default)]
    pub post_points: i64,
    /// Number of comments.
    #[serde(default)]
    pub post_comments: i64,
}

impl Branch {
    /// A fresh branch with zeroed aggregates.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        creator: impl Into<String>,
        parentid: impl Into<String>,
        date: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            creator: creator.into(),
            date,
            parentid: parentid.into(),
            description: String::new(),
            rules: String::new(),
            post_count: 0,
            post_points: 0,
            post_comments: 0,
        }
    }

    /// Whether the branch heads its own tree.
    #[must_use]
    pub fn is_tree_root(&self) -> bool {
        self.parentid == super::ROOT
    }
}

impl Record for Branch {
    const TABLE: &'static TableDef = &BRANCHES;

    fn key(&self) -> Key {
        Key::hash(self.id.as_str())
    }
}

impl Validate for Branch {
    fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::Id => validate::branch_id(&self.id),
            Field::Name => validate::branch_name(&self.name),
            Field::Creator => validate::username(&self.creator),
            Field::Date => validate::date(self.date),
            Field::ParentId => validate::parent_id(&self.parentid),
            Field::Description => validate::long_text(&self.description),
            Field::Rules => validate::long_text(&self.rules),
            _ => true,
        }
    }

    fn required_fields(&self) -> &'static [Field] {
        &[
            Field::Id,
            Field::Name,
            Field::Creator,
            Field::Date,
            Field::ParentId,
        ]
    }
}
