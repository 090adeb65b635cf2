//! Sub-branch requests: proposed parent/child linkages.

use serde::{Deserialize, Serialize};

use crate::model::validate::{self, Field, Validate};
use crate::store::{IndexDef, Key, Record, TableDef};

/// Index over requests by parent, sorted by date.
pub const REQUEST_PARENT_DATE_INDEX: &str = "parentid-date-index";

/// Sub-branch request table.
pub const SUBBRANCH_REQUESTS: TableDef = TableDef {
    name: "subbranch_requests",
    hash_key: "parentid",
    range_key: Some("childid"),
    indexes: &[IndexDef {
        name: REQUEST_PARENT_DATE_INDEX,
        hash_key: "parentid",
        range_key: Some("date"),
    }],
};

/// Audit record that `childid` was proposed under `parentid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBranchRequest {
    /// Proposed parent.
    pub parentid: String,
    /// Proposed child.
    pub childid: String,
    /// When the proposal was made, in milliseconds.
    pub date: i64,
    /// Proposing user.
    pub creator: String,
}

impl Record for SubBranchRequest {
    const TABLE: &'static TableDef = &SUBBRANCH_REQUESTS;

    fn key(&self) -> Key {
        Key::composite(self.parentid.as_str(), self.childid.as_str())
    }
}

impl Validate for SubBranchRequest {
    fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::ParentId => validate::branch_id(&self.parentid),
            Field::ChildId => validate::branch_id(&self.childid),
            Field::Date => validate::date(self.date),
            Field::Creator => validate::username(&self.creator),
            _ => true,
        }
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::ParentId, Field::ChildId, Field::Date, Field::Creator]
    }
}
