//! Typed access to the keyed store.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::store::keyed::{Cursor, Key, KeyedStore, RangeQuery, TableDef};
use crate::store::sqlite::StoreError;

/// A row type bound to a declared table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Table the record lives in.
    const TABLE: &'static TableDef;

    /// Primary key of this record.
    fn key(&self) -> Key;
}

/// Typed facade over a shared [`KeyedStore`].
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn KeyedStore>,
    page_size: u32,
}

impl Records {
    /// Wraps a store; `page_size` bounds every page fetched by
    /// [`Records::query_all`].
    #[must_use]
    pub fn new(store: Arc<dyn KeyedStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Fetches one record by primary key.
    pub async fn get<T: Record>(&self, key: &Key) -> Result<Option<T>, StoreError> {
        match self.store.get(T::TABLE, key).await? {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        }
    }

    /// Inserts or replaces a record.
    pub async fn put<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.store.put(T::TABLE, serde_json::to_value(record)?).await
    }

    /// Deletes a record by primary key.
    pub async fn delete<T: Record>(&self, key: &Key) -> Result<(), StoreError> {
        self.store.delete(T::TABLE, key).await
    }

    /// Deletes the row `record` was read from.
    pub async fn remove<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.delete::<T>(&record.key()).await
    }

    /// Runs one page of a range query.
    pub async fn query<T: Record>(
        &self,
        query: &RangeQuery,
    ) -> Result<(Vec<T>, Option<Cursor>), StoreError> {
        let page = self.store.query(T::TABLE, query).await?;
        let items = page
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        Ok((items, page.last_evaluated))
    }

    /// Follows a range query through every page.
    pub async fn query_all<T: Record>(&self, mut query: RangeQuery) -> Result<Vec<T>, StoreError> {
        query.limit = Some(query.limit.unwrap_or(self.page_size));
        let mut out = Vec::new();
        loop {
            let (mut items, next) = self.query::<T>(&query).await?;
            out.append(&mut items);
            match next {
                Some(cursor) => query.exclusive_start = Some(cursor),
                None => return Ok(out),
            }
        }
    }
}
