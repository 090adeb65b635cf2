//! User profiles and global constants touched by branch lifecycle.

use serde::{Deserialize, Serialize};

use crate::store::{Key, Record, TableDef};

/// User table.
pub const USERS: TableDef = TableDef {
    name: "users",
    hash_key: "username",
    range_key: None,
    indexes: &[],
};

/// Single-row counters and settings.
pub const CONSTANTS: TableDef = TableDef {
    name: "constants",
    hash_key: "id",
    range_key: None,
    indexes: &[],
};

/// Id of the global branch counter.
pub const BRANCH_COUNT: &str = "branch_count";

/// The subset of a user profile this engine reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique username.
    pub username: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub firstname: String,
    /// Family name.
    #[serde(default)]
    pub lastname: String,
    /// Signup time in milliseconds.
    #[serde(default)]
    pub datejoined: i64,
    /// Branches this user created.
    #[serde(default)]
    pub num_branches: i64,
    /// Branches this user moderates.
    #[serde(default)]
    pub num_mod_positions: i64,
}

impl User {
    /// A profile with zeroed counters.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            firstname: String::new(),
            lastname: String::new(),
            datejoined: 0,
            num_branches: 0,
            num_mod_positions: 0,
        }
    }
}

impl Record for User {
    const TABLE: &'static TableDef = &USERS;

    fn key(&self) -> Key {
        Key::hash(self.username.as_str())
    }
}

/// A named global integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    /// Constant name.
    pub id: String,
    /// Current value.
    pub data: i64,
}

impl Record for Constant {
    const TABLE: &'static TableDef = &CONSTANTS;

    fn key(&self) -> Key {
        Key::hash(self.id.as_str())
    }
}
