//! Descendant listing order and pagination.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::model::Branch;

/// Attribute descendants are ranked by, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Creation time.
    #[default]
    Date,
    /// Number of posts.
    PostCount,
    /// Sum of post points.
    PostPoints,
    /// Number of comments.
    PostComments,
}

impl SortKey {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::PostCount => "post_count",
            SortKey::PostPoints => "post_points",
            SortKey::PostComments => "post_comments",
        }
    }

    /// Value of the attribute on `branch`.
    #[must_use]
    pub fn value(self, branch: &Branch) -> i64 {
        match self {
            SortKey::Date => branch.date,
            SortKey::PostCount => branch.post_count,
            SortKey::PostPoints => branch.post_points,
            SortKey::PostComments => branch.post_comments,
        }
    }

    /// Listing order: larger value first, then id ascending.
    #[must_use]
    pub fn compare(self, a: &Branch, b: &Branch) -> Ordering {
        self.value(b)
            .cmp(&self.value(a))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortKey::Date),
            "post_count" => Ok(SortKey::PostCount),
            "post_points" => Ok(SortKey::PostPoints),
            "post_comments" => Ok(SortKey::PostComments),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// A request for one page of a tag's descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantQuery {
    /// Tag whose descendants are listed; the tag's own branch is excluded.
    pub tag: String,
    /// Only branches created at or after this time, in milliseconds.
    pub after: i64,
    /// Ranking attribute.
    pub sort: SortKey,
    /// Resume strictly after this branch.
    pub cursor: Option<String>,
}

impl DescendantQuery {
    /// First page of `tag`'s descendants, newest first.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            after: 0,
            sort: SortKey::Date,
            cursor: None,
        }
    }
}

/// Filters, orders, and cuts one page out of `branches`.
pub(crate) fn page(
    mut branches: Vec<Branch>,
    query: &DescendantQuery,
    cursor: Option<&Branch>,
    limit: usize,
) -> Vec<Branch> {
    branches.retain(|b| b.id != query.tag && b.date >= query.after);
    branches.sort_by(|a, b| query.sort.compare(a, b));
    branches
        .into_iter()
        .filter(|b| cursor.is_none_or(|c| query.sort.compare(b, c) == Ordering::Greater))
        .take(limit)
        .collect()
}
