//! Field-level validation.
//!
//! Every rule is a pure predicate. Records map each [`Field`] they carry to
//! one of these predicates, so callers can check exactly the fields they
//! supplied and report the first one that fails.

use std::fmt;

use crate::model::ROOT;

/// Longest accepted branch id.
pub const MAX_BRANCH_ID_LEN: usize = 30;
/// Longest accepted branch name.
pub const MAX_BRANCH_NAME_LEN: usize = 30;
/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 20;
/// Longest accepted description or rules text.
pub const MAX_LONG_TEXT_LEN: usize = 10_000;

/// Names of validated record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Branch or notification identifier.
    Id,
    /// Display name.
    Name,
    /// Creating user.
    Creator,
    /// Millisecond timestamp.
    Date,
    /// Parent branch pointer.
    ParentId,
    /// Proposed child branch.
    ChildId,
    /// Branch a row belongs to.
    BranchId,
    /// Tag value.
    Tag,
    /// Long description.
    Description,
    /// Branch rules.
    Rules,
    /// Username.
    Username,
    /// Notification recipient.
    User,
    /// Notification kind.
    Type,
    /// Notification payload.
    Data,
    /// Notification read flag.
    Unread,
}

impl Field {
    /// Wire name of the field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Creator => "creator",
            Field::Date => "date",
            Field::ParentId => "parentid",
            Field::ChildId => "childid",
            Field::BranchId => "branchid",
            Field::Tag => "tag",
            Field::Description => "description",
            Field::Rules => "rules",
            Field::Username => "username",
            Field::User => "user",
            Field::Type => "type",
            Field::Data => "data",
            Field::Unread => "unread",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record whose fields can be checked one by one.
pub trait Validate {
    /// Whether `field` currently holds a valid value.
    fn is_valid(&self, field: Field) -> bool;

    /// Fields every complete record must satisfy.
    fn required_fields(&self) -> &'static [Field];

    /// First field of `fields` that fails validation.
    ///
    /// # Errors
    ///
    /// Returns the offending field.
    fn check(&self, fields: &[Field]) -> Result<(), Field> {
        match fields.iter().find(|f| !self.is_valid(**f)) {
            Some(field) => Err(*field),
            None => Ok(()),
        }
    }

    /// Checks every required field.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    fn check_all(&self) -> Result<(), Field> {
        self.check(self.required_fields())
    }
}

fn within(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}

/// Branch slugs: lowercase letters, digits, `-` and `_`; the sentinel `root`
/// is reserved.
#[must_use]
pub fn branch_id(value: &str) -> bool {
    within(value, 1, MAX_BRANCH_ID_LEN)
        && value != ROOT
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// A parent pointer is a branch slug or `root`.
#[must_use]
pub fn parent_id(value: &str) -> bool {
    value == ROOT || branch_id(value)
}

/// Tags are branch slugs or `root`.
#[must_use]
pub fn tag(value: &str) -> bool {
    parent_id(value)
}

/// Usernames: ASCII letters, digits, `-` and `_`.
#[must_use]
pub fn username(value: &str) -> bool {
    within(value, 1, MAX_USERNAME_LEN)
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Branch display names: non-blank, bounded.
#[must_use]
pub fn branch_name(value: &str) -> bool {
    !value.trim().is_empty() && within(value, 1, MAX_BRANCH_NAME_LEN)
}

/// Descriptions and rules: bounded, may be empty.
#[must_use]
pub fn long_text(value: &str) -> bool {
    within(value, 0, MAX_LONG_TEXT_LEN)
}

/// Millisecond timestamps must be positive.
#[must_use]
pub fn date(value: i64) -> bool {
    value > 0
}

/// Opaque identifiers must be non-blank.
#[must_use]
pub fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}
