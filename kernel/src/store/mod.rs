//! Keyed store with secondary indexes, backed by `SQLite`.

/// Table declarations, keys, and the store contract.
pub mod keyed;
/// Namespace policy applied to every data-path statement.
pub mod policy;
/// Typed record facade.
pub mod records;
/// `SQLite` implementation.
pub mod sqlite;

pub use keyed::{
    Cursor, IndexDef, Key, KeyValue, KeyedStore, Order, Page, RangeCondition, RangeQuery, TableDef,
};
pub use policy::{NamespacePolicy, PolicyError, QueryPolicy};
pub use records::{Record, Records};
pub use sqlite::{SqlStore, StoreError};
