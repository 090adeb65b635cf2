//! Notifications delivered to users.

use serde::{Deserialize, Serialize};

use crate::model::validate::{self, Field, Validate};
use crate::store::{IndexDef, Key, Record, TableDef};

/// Index over notifications by recipient, sorted by date.
pub const USER_DATE_INDEX: &str = "user-date-index";

/// Notification table.
pub const NOTIFICATIONS: TableDef = TableDef {
    name: "notifications",
    hash_key: "id",
    range_key: None,
    indexes: &[IndexDef {
        name: USER_DATE_INDEX,
        hash_key: "user",
        range_key: Some("date"),
    }],
};

/// Kinds of notification the hierarchy engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A branch asked to become a child of a moderated branch.
    NewChildBranchRequest,
}

/// Payload of a [`NotificationKind::NewChildBranchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildBranchRequestData {
    /// Proposed child.
    pub childid: String,
    /// Proposed parent.
    pub parentid: String,
    /// User who proposed the linkage.
    pub username: String,
}

/// A message owned by its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// `<user>-<date>`.
    pub id: String,
    /// Recipient.
    pub user: String,
    /// Creation time in milliseconds.
    pub date: i64,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Event payload.
    pub data: serde_json::Value,
    /// Whether the recipient has yet to read it.
    pub unread: bool,
}

impl Notification {
    /// Identifier derived from recipient and timestamp.
    #[must_use]
    pub fn id_for(user: &str, date: i64) -> String {
        format!("{user}-{date}")
    }
}

impl Record for Notification {
    const TABLE: &'static TableDef = &NOTIFICATIONS;

    fn key(&self) -> Key {
        Key::hash(self.id.as_str())
    }
}

impl Validate for Notification {
    fn is_valid(&self, field: Field) -> bool {
        match field {
            Field::Id => validate::non_empty(&self.id),
            Field::User => validate::username(&self.user),
            Field::Date => validate::date(self.date),
            Field::Data => self.data.is_object(),
            // type and unread are typed, present by construction
            _ => true,
        }
    }

    fn required_fields(&self) -> &'static [Field] {
        &[
            Field::Id,
            Field::User,
            Field::Date,
            Field::Type,
            Field::Unread,
            Field::Data,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_in_wire_form() {
        let value = serde_json::to_value(NotificationKind::NewChildBranchRequest).unwrap();
        assert_eq!(value, "NEW_CHILD_BRANCH_REQUEST");
    }

    #[test]
    fn payload_must_be_an_object() {
        let mut notification = Notification {
            id: Notification::id_for("ann", 9),
            user: "ann".into(),
            date: 9,
            kind: NotificationKind::NewChildBranchRequest,
            data: serde_json::json!({"childid": "c"}),
            unread: true,
        };
        assert_eq!(notification.check_all(), Ok(()));
        notification.data = serde_json::Value::Null;
        assert_eq!(notification.check_all(), Err(Field::Data));
    }
}
