//! Moderator membership and the moderation audit trail.

use serde::{Deserialize, Serialize};

use crate::model::validate::{self, Field, Validate};
use crate::store::{Key, Record, TableDef};

/// Moderator table, one row per moderator per branch.
pub const MODS: TableDef = TableDef {
    name: "mods",
    hash_key: "branchid",
    range_key: Some("username"),
    indexes: &[],
};

/// Moderation log table.
pub const MOD_LOG: TableDef = TableDef {
    name: "mod_log",
    hash_key: "branchid",
    range_key: Some("date"),
    indexes: &[],
};

/// A user's moderation rights on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    /// Moderated branch.
    pub branchid: String,
    /// When the rights were granted, in milliseconds.
    pub date: i64,
    /// Moderator.
    pub username: String,
}

impl Mod {
    /// Builds a membership row.
    pub fn new(branchid: impl Into<String>, username: impl Into<String>, date: i64) -> Self {
        Self {
            branchid: branchid.into(),
            date,
            username: username.into(),
        }
    }
}

impl Record for Mod {
    const TABLE: &'static TableDef = &MODS;

    fn key(&self) -> Key {
        Key::composite(self.branchid.as_str(), self.username.as_str())
    }
}

impl Validate for Mod {
    fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::BranchId => validate::branch_id(&self.branchid),
            Field::Date => validate::date(self.date),
            Field::Username => validate::username(&self.username),
            _ => true,
        }
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::BranchId, Field::Date, Field::Username]
    }
}

/// One moderation action taken on a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModLogEntry {
    /// Branch acted on.
    pub branchid: String,
    /// Acting moderator.
    pub username: String,
    /// When the action happened, in milliseconds.
    pub date: i64,
    /// Action name.
    pub action: String,
    /// Action payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Record for ModLogEntry {
    const TABLE: &'static TableDef = &MOD_LOG;

    fn key(&self) -> Key {
        Key::composite(self.branchid.as_str(), self.date)
    }
}
