//! `SQLite` backend for the keyed store.
//!
//! Every logical table lives in one physical `{namespace}_items` table keyed
//! by `(tbl, hash_key, range_key)`. Secondary indexes are expression indexes
//! over `json_extract(body, ...)`, created by [`SqlStore::migrate`] from the
//! table declarations.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    Row,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use tracing::{debug, instrument};

use crate::store::keyed::{
    Cursor, IndexDef, Key, KeyValue, KeyedStore, Order, Page, RangeCondition, RangeQuery, TableDef,
};
use crate::store::policy::{PolicyError, QueryPolicy};

/// Errors that can occur when using the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database-related error.
    #[error("Database Error: {0}")]
    DbError(#[from] sqlx::Error),
    /// Policy violation error.
    #[error("Policy Violation: {0}")]
    PolicyError(#[from] PolicyError),
    /// Item body could not be encoded or decoded.
    #[error("Serialization Error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Item lacks a key attribute declared by its table.
    #[error("Item in table '{table}' is missing key attribute '{attribute}'")]
    MissingKey {
        /// Logical table.
        table: &'static str,
        /// Missing attribute.
        attribute: &'static str,
    },
    /// Query names an index the table does not declare.
    #[error("Table '{table}' has no index '{index}'")]
    UnknownIndex {
        /// Logical table.
        table: &'static str,
        /// Requested index.
        index: String,
    },
}

/// Stored in `range_key` for tables without a range attribute.
const NO_RANGE: &str = "";

/// Keyed store over a `SQLite` pool.
pub struct SqlStore {
    pool: SqlitePool,
    namespace: String,
    policy: Box<dyn QueryPolicy>,
}

impl SqlStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool, namespace: impl Into<String>, policy: Box<dyn QueryPolicy>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            policy,
        }
    }

    /// Opens a private in-memory database.
    ///
    /// The pool holds a single connection: each `SQLite` memory connection is
    /// its own database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened.
    pub async fn in_memory(
        namespace: impl Into<String>,
        policy: Box<dyn QueryPolicy>,
    ) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool, namespace, policy))
    }

    /// Namespace prefix of the physical tables.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn items(&self) -> String {
        format!("{}_items", self.namespace)
    }

    /// Creates the items table and one expression index per declared
    /// secondary index. Safe to run repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    #[instrument(skip(self, tables), fields(namespace = %self.namespace))]
    pub async fn migrate(&self, tables: &[&TableDef]) -> Result<(), StoreError> {
        let items = self.items();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {items} (\
                tbl TEXT NOT NULL, \
                hash_key NOT NULL, \
                range_key NOT NULL, \
                body TEXT NOT NULL, \
                PRIMARY KEY (tbl, hash_key, range_key))"
        ))
        .execute(&self.pool)
        .await?;

        for table in tables {
            for index in table.indexes {
                let name = format!(
                    "{}_{}_{}",
                    self.namespace,
                    table.name,
                    index.name.replace('-', "_")
                );
                let mut columns = vec!["tbl".to_string(), json_path(index.hash_key)];
                if let Some(range) = index.range_key {
                    columns.push(json_path(range));
                }
                sqlx::query(&format!(
                    "CREATE INDEX IF NOT EXISTS {name} ON {items} ({})",
                    columns.join(", ")
                ))
                .execute(&self.pool)
                .await?;
                debug!(table = table.name, index = index.name, "index ready");
            }
        }
        Ok(())
    }

    async fn fetch(&self, sql: &str, params: Vec<KeyValue>) -> Result<Vec<Value>, StoreError> {
        self.policy.authorize(&self.namespace, sql)?;

        let mut query_builder = sqlx::query(sql);
        for param in params {
            query_builder = match param {
                KeyValue::Str(s) => query_builder.bind(s),
                KeyValue::Num(n) => query_builder.bind(n),
            };
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<Value, StoreError> {
                let body: String = row.try_get("body")?;
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    async fn run(&self, sql: &str, params: Vec<KeyValue>) -> Result<u64, StoreError> {
        self.policy.authorize(&self.namespace, sql)?;

        let mut query_builder = sqlx::query(sql);
        for param in params {
            query_builder = match param {
                KeyValue::Str(s) => query_builder.bind(s),
                KeyValue::Num(n) => query_builder.bind(n),
            };
        }

        Ok(query_builder.execute(&self.pool).await?.rows_affected())
    }
}

fn json_path(attribute: &str) -> String {
    format!("json_extract(body, '$.{attribute}')")
}

fn range_or_sentinel(key: &Key) -> KeyValue {
    key.range
        .clone()
        .unwrap_or_else(|| KeyValue::Str(NO_RANGE.to_string()))
}

/// Column expressions a query partitions and sorts on.
struct Plan {
    hash_expr: String,
    sort_expr: Option<String>,
    index: Option<&'static IndexDef>,
}

impl Plan {
    fn new(table: &TableDef, query: &RangeQuery) -> Result<Self, StoreError> {
        match query.index {
            None => Ok(Self {
                hash_expr: "hash_key".to_string(),
                sort_expr: table.range_key.map(|_| "range_key".to_string()),
                index: None,
            }),
            Some(name) => {
                let index = table.index(name).ok_or_else(|| StoreError::UnknownIndex {
                    table: table.name,
                    index: name.to_string(),
                })?;
                Ok(Self {
                    hash_expr: json_path(index.hash_key),
                    sort_expr: index.range_key.map(json_path),
                    index: Some(index),
                })
            }
        }
    }
}

#[async_trait]
impl KeyedStore for SqlStore {
    #[instrument(skip(self, table, key), fields(table = table.name))]
    async fn get(&self, table: &TableDef, key: &Key) -> Result<Option<Value>, StoreError> {
        let sql = format!(
            "SELECT body FROM {} WHERE tbl = ? AND hash_key = ? AND range_key = ?",
            self.items()
        );
        let params = vec![
            KeyValue::from(table.name),
            key.hash.clone(),
            range_or_sentinel(key),
        ];
        Ok(self.fetch(&sql, params).await?.into_iter().next())
    }

    #[instrument(skip(self, table, item), fields(table = table.name))]
    async fn put(&self, table: &TableDef, item: Value) -> Result<(), StoreError> {
        let key = table.key_of(&item)?;
        let sql = format!(
            "INSERT INTO {} (tbl, hash_key, range_key, body) VALUES (?, ?, ?, ?) \
             ON CONFLICT (tbl, hash_key, range_key) DO UPDATE SET body = excluded.body",
            self.items()
        );
        let params = vec![
            KeyValue::from(table.name),
            key.hash.clone(),
            range_or_sentinel(&key),
            KeyValue::Str(serde_json::to_string(&item)?),
        ];
        self.run(&sql, params).await?;
        Ok(())
    }

    #[instrument(skip(self, table, key), fields(table = table.name))]
    async fn delete(&self, table: &TableDef, key: &Key) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE tbl = ? AND hash_key = ? AND range_key = ?",
            self.items()
        );
        let params = vec![
            KeyValue::from(table.name),
            key.hash.clone(),
            range_or_sentinel(key),
        ];
        self.run(&sql, params).await?;
        Ok(())
    }

    #[instrument(skip(self, table, query), fields(table = table.name, index = ?query.index))]
    async fn query(&self, table: &TableDef, query: &RangeQuery) -> Result<Page, StoreError> {
        let plan = Plan::new(table, query)?;
        let (op, dir) = match query.order {
            Order::Ascending => (">", "ASC"),
            Order::Descending => ("<", "DESC"),
        };

        let mut sql = format!(
            "SELECT body FROM {} WHERE tbl = ? AND {} = ?",
            self.items(),
            plan.hash_expr
        );
        let mut params = vec![KeyValue::from(table.name), query.hash.clone()];

        if let (Some(condition), Some(sort)) = (&query.range, &plan.sort_expr) {
            match condition {
                RangeCondition::Eq(v) => {
                    sql.push_str(&format!(" AND {sort} = ?"));
                    params.push(v.clone());
                }
                RangeCondition::AtLeast(v) => {
                    sql.push_str(&format!(" AND {sort} >= ?"));
                    params.push(v.clone());
                }
            }
        }

        if let Some(start) = &query.exclusive_start {
            let hash = start.key.hash.clone();
            let range = range_or_sentinel(&start.key);
            match (plan.index, &plan.sort_expr, &start.sort) {
                // Primary query: the partition is fixed, range_key orders it.
                (None, _, _) => {
                    sql.push_str(&format!(" AND range_key {op} ?"));
                    params.push(range);
                }
                (Some(_), Some(sort), Some(sort_value)) => {
                    sql.push_str(&format!(
                        " AND ({sort} {op} ? OR ({sort} = ? AND \
                         (hash_key {op} ? OR (hash_key = ? AND range_key {op} ?))))"
                    ));
                    params.extend([
                        sort_value.clone(),
                        sort_value.clone(),
                        hash.clone(),
                        hash,
                        range,
                    ]);
                }
                (Some(_), _, _) => {
                    sql.push_str(&format!(
                        " AND (hash_key {op} ? OR (hash_key = ? AND range_key {op} ?))"
                    ));
                    params.extend([hash.clone(), hash, range]);
                }
            }
        }

        let mut order_by = Vec::new();
        if let Some(sort) = &plan.sort_expr {
            order_by.push(format!("{sort} {dir}"));
        }
        if plan.index.is_some() {
            order_by.push(format!("hash_key {dir}"));
            order_by.push(format!("range_key {dir}"));
        }
        if !order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", order_by.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(KeyValue::Num(i64::from(limit)));
        }

        let items = self.fetch(&sql, params).await?;
        let last_evaluated = match (query.limit, items.last()) {
            (Some(limit), Some(last)) if items.len() >= limit as usize => {
                Some(Cursor::after(table, plan.index, last)?)
            }
            _ => None,
        };

        debug!(count = items.len(), more = last_evaluated.is_some(), "query page");
        Ok(Page {
            items,
            last_evaluated,
        })
    }
}
