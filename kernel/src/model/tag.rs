//! Tag rows: the flattened ancestor-or-self relation.

use serde::{Deserialize, Serialize};

use crate::model::validate::{self, Field, Validate};
use crate::store::{IndexDef, Key, Record, TableDef};

/// Index over tag rows by tag, sorted by branch.
pub const TAG_BRANCH_INDEX: &str = "tag-branchid-index";

/// Tag table. The primary key `(branchid, tag)` yields a branch's ancestors;
/// the tag index yields a tag's descendants.
pub const TAGS: TableDef = TableDef {
    name: "tags",
    hash_key: "branchid",
    range_key: Some("tag"),
    indexes: &[IndexDef {
        name: TAG_BRANCH_INDEX,
        hash_key: "tag",
        range_key: Some("branchid"),
    }],
};

/// `tag` is `branchid` itself or one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tagged branch.
    pub branchid: String,
    /// Ancestor-or-self of the branch.
    pub tag: String,
}

impl Tag {
    /// Builds a tag row.
    pub fn new(branchid: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            branchid: branchid.into(),
            tag: tag.into(),
        }
    }
}

impl Record for Tag {
    const TABLE: &'static TableDef = &TAGS;

    fn key(&self) -> Key {
        Key::composite(self.branchid.as_str(), self.tag.as_str())
    }
}

impl Validate for Tag {
    fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::BranchId => validate::branch_id(&self.branchid),
            Field::Tag => validate::tag(&self.tag),
            _ => true,
        }
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::BranchId, Field::Tag]
    }
}
