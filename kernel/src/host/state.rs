//! Host state management for the Grove kernel.
//!
//! `GroveHostState` owns the store and the hierarchy engine wired over it.
//! It uses an internal `Arc` for cheap cloning into request handlers.

use anyhow::{Context, Result};
use reqwest::Url;
use secrecy::ExposeSecret;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tracing::info;

use crate::collaborators::{
    ContactSync, HttpContactSync, LocalObjectStore, NoopContactSync, ObjectStore,
};
use crate::hierarchy::BranchLifecycle;
use crate::infrastructure::config::{ContactSettings, Settings};
use crate::model::ALL_TABLES;
use crate::store::{NamespacePolicy, Records, SqlStore};

pub(crate) struct GroveHostStateInner {
    pub(crate) records: Records,
    pub(crate) lifecycle: BranchLifecycle,
}

/// The main host state for the Grove kernel.
#[derive(Clone)]
pub struct GroveHostState {
    pub(crate) inner: Arc<GroveHostStateInner>,
}

impl std::fmt::Debug for GroveHostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroveHostState").finish_non_exhaustive()
    }
}

impl GroveHostState {
    /// Connects the database, migrates the tables, and wires the engine
    /// from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or migration fails, or if
    /// the contact endpoint is not a valid URL.
    pub async fn new(settings: &Settings) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.database.max_connections)
            .connect(settings.database.url.expose_secret())
            .await
            .context("Failed to connect to database")?;

        let store = SqlStore::new(
            pool,
            settings.database.namespace.clone(),
            Box::new(NamespacePolicy),
        );
        store
            .migrate(&ALL_TABLES)
            .await
            .context("Failed to migrate tables")?;
        info!(namespace = store.namespace(), "store ready");

        let records = Records::new(Arc::new(store), settings.hierarchy.page_size);
        let objects = Arc::new(LocalObjectStore::new(&settings.storage.images_dir));
        let contacts = contact_sync(settings.contacts.as_ref())?;

        Ok(Self::from_parts(
            records,
            objects,
            contacts,
            settings.hierarchy.page_size as usize,
        ))
    }

    /// Wires the engine over already-built parts.
    #[must_use]
    pub fn from_parts(
        records: Records,
        objects: Arc<dyn ObjectStore>,
        contacts: Arc<dyn ContactSync>,
        page_size: usize,
    ) -> Self {
        let lifecycle = BranchLifecycle::new(records.clone(), objects, contacts, page_size);
        Self {
            inner: Arc::new(GroveHostStateInner { records, lifecycle }),
        }
    }

    /// Typed store access.
    #[must_use]
    pub fn records(&self) -> &Records {
        &self.inner.records
    }

    /// The hierarchy engine.
    #[must_use]
    pub fn lifecycle(&self) -> &BranchLifecycle {
        &self.inner.lifecycle
    }
}

fn contact_sync(settings: Option<&ContactSettings>) -> Result<Arc<dyn ContactSync>> {
    let Some(settings) = settings else {
        info!("no contact endpoint configured, contact sync disabled");
        return Ok(Arc::new(NoopContactSync));
    };
    let mut endpoint = settings.endpoint.clone();
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    let url = Url::parse(&endpoint).context("Invalid contact endpoint")?;
    Ok(Arc::new(HttpContactSync::new(url, settings.api_key.clone())))
}
