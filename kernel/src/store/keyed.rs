//! Keyed store contract.
//!
//! Tables are declared up front with a hash key, an optional range key, and a
//! list of secondary indexes. Items travel as JSON documents; the store pulls
//! the key attributes out of the document using the table declaration.

use async_trait::async_trait;
use serde_json::Value;

use crate::store::sqlite::StoreError;

/// Declaration of a secondary index over a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name, unique within its table.
    pub name: &'static str,
    /// Attribute the index is partitioned on.
    pub hash_key: &'static str,
    /// Attribute the index is sorted on.
    pub range_key: Option<&'static str>,
}

/// Declaration of a logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Logical table name.
    pub name: &'static str,
    /// Partition attribute of the primary key.
    pub hash_key: &'static str,
    /// Sort attribute of the primary key.
    pub range_key: Option<&'static str>,
    /// Declared secondary indexes.
    pub indexes: &'static [IndexDef],
}

impl TableDef {
    /// Looks up a declared index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&'static IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Extracts the primary key of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingKey`] when a key attribute is absent or is
    /// neither a string nor an integer.
    pub fn key_of(&self, item: &Value) -> Result<Key, StoreError> {
        let hash = attribute(self, item, self.hash_key)?;
        let range = match self.range_key {
            Some(attr) => Some(attribute(self, item, attr)?),
            None => None,
        };
        Ok(Key { hash, range })
    }
}

fn attribute(table: &TableDef, item: &Value, name: &'static str) -> Result<KeyValue, StoreError> {
    item.get(name)
        .and_then(KeyValue::from_json)
        .ok_or(StoreError::MissingKey {
            table: table.name,
            attribute: name,
        })
}

/// A scalar usable as a key attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyValue {
    /// String attribute.
    Str(String),
    /// Integer attribute (timestamps, counters).
    Num(i64),
}

impl KeyValue {
    /// Converts a JSON scalar into a key value.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Num),
            _ => None,
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Num(value)
    }
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Partition value.
    pub hash: KeyValue,
    /// Sort value, for tables declaring a range key.
    pub range: Option<KeyValue>,
}

impl Key {
    /// Key of a table without a range attribute.
    pub fn hash(hash: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// Key of a table with a range attribute.
    pub fn composite(hash: impl Into<KeyValue>, range: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }
}

/// Scan direction over the sort attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Smallest sort value first.
    #[default]
    Ascending,
    /// Largest sort value first.
    Descending,
}

/// Condition on the sort attribute of a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeCondition {
    /// Sort attribute equals the value.
    Eq(KeyValue),
    /// Sort attribute is greater than or equal to the value.
    AtLeast(KeyValue),
}

/// Exclusive start position of a paged query.
///
/// Carries the primary key of the last item seen and, for index queries, the
/// value of the index sort attribute on that item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Primary key of the last item of the previous page.
    pub key: Key,
    /// Index sort attribute of that item, if the index declares one.
    pub sort: Option<KeyValue>,
}

impl Cursor {
    /// Builds the cursor that resumes right after `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` lacks a key attribute of the table or index.
    pub fn after(
        table: &TableDef,
        index: Option<&IndexDef>,
        item: &Value,
    ) -> Result<Self, StoreError> {
        let key = table.key_of(item)?;
        let sort = match index.and_then(|i| i.range_key) {
            Some(attr) => Some(attribute(table, item, attr)?),
            None => None,
        };
        Ok(Self { key, sort })
    }
}

/// A range query against the primary key or a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Secondary index name; `None` queries the primary key.
    pub index: Option<&'static str>,
    /// Partition value to match.
    pub hash: KeyValue,
    /// Optional condition on the sort attribute.
    pub range: Option<RangeCondition>,
    /// Scan direction.
    pub order: Order,
    /// Maximum items per page.
    pub limit: Option<u32>,
    /// Resume strictly after this position.
    pub exclusive_start: Option<Cursor>,
}

impl RangeQuery {
    /// Query on the primary partition key.
    pub fn primary(hash: impl Into<KeyValue>) -> Self {
        Self {
            index: None,
            hash: hash.into(),
            range: None,
            order: Order::Ascending,
            limit: None,
            exclusive_start: None,
        }
    }

    /// Query on a secondary index partition.
    pub fn on_index(index: &'static str, hash: impl Into<KeyValue>) -> Self {
        Self {
            index: Some(index),
            ..Self::primary(hash)
        }
    }

    /// Restricts the sort attribute.
    #[must_use]
    pub fn with_range(mut self, range: RangeCondition) -> Self {
        self.range = Some(range);
        self
    }

    /// Returns results largest sort value first.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    /// Caps the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resumes after a previous page.
    #[must_use]
    pub fn starting_after(mut self, cursor: Option<Cursor>) -> Self {
        self.exclusive_start = cursor;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Items in scan order.
    pub items: Vec<Value>,
    /// Set when the page was cut by the limit and more items may follow.
    pub last_evaluated: Option<Cursor>,
}

/// Point and range access to declared tables.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Fetches the item with the given primary key.
    async fn get(&self, table: &TableDef, key: &Key) -> Result<Option<Value>, StoreError>;

    /// Inserts or replaces an item.
    async fn put(&self, table: &TableDef, item: Value) -> Result<(), StoreError>;

    /// Deletes the item with the given primary key. Deleting a missing item is
    /// not an error.
    async fn delete(&self, table: &TableDef, key: &Key) -> Result<(), StoreError>;

    /// Runs a range query and returns one page.
    async fn query(&self, table: &TableDef, query: &RangeQuery) -> Result<Page, StoreError>;
}
