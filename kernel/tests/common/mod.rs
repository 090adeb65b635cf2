//! Shared harness for hierarchy integration tests.

#![allow(dead_code, missing_docs)]

use anyhow::Result;
use grove_kernel::collaborators::{
    Bucket, ContactError, ContactSync, NoopContactSync, ObjectStore, ObjectStoreError,
};
use grove_kernel::hierarchy::{BranchLifecycle, NewBranch};
use grove_kernel::host::GroveHostState;
use grove_kernel::model::{ALL_TABLES, Branch, User};
use grove_kernel::store::{NamespacePolicy, Records, SqlStore};
use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// Collaborator doubles
// =============================================================================

#[derive(Default)]
pub struct RecordingContacts {
    pub calls: Mutex<Vec<(String, bool)>>,
}

#[async_trait::async_trait]
impl ContactSync for RecordingContacts {
    async fn add_contact(&self, user: &User, is_new_moderator: bool) -> Result<(), ContactError> {
        self.calls
            .lock()
            .push((user.username.clone(), is_new_moderator));
        Ok(())
    }
}

pub struct FailingContacts;

#[async_trait::async_trait]
impl ContactSync for FailingContacts {
    async fn add_contact(&self, _user: &User, _new: bool) -> Result<(), ContactError> {
        Err(ContactError::Network("connection refused".into()))
    }
}

#[derive(Default)]
pub struct RecordingObjects {
    pub deleted: Mutex<Vec<(Bucket, Vec<String>)>>,
}

#[async_trait::async_trait]
impl ObjectStore for RecordingObjects {
    async fn delete_objects(&self, bucket: Bucket, keys: &[String]) -> Result<(), ObjectStoreError> {
        self.deleted.lock().push((bucket, keys.to_vec()));
        Ok(())
    }
}

/// Records every attempted deletion, then fails it.
#[derive(Default)]
pub struct FailingObjects {
    pub attempted: Mutex<Vec<(Bucket, Vec<String>)>>,
}

#[async_trait::async_trait]
impl ObjectStore for FailingObjects {
    async fn delete_objects(&self, bucket: Bucket, keys: &[String]) -> Result<(), ObjectStoreError> {
        self.attempted.lock().push((bucket, keys.to_vec()));
        Err(ObjectStoreError::Io {
            key: keys.join(","),
            source: std::io::Error::other("bucket unavailable"),
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

pub const PAGE_SIZE: u32 = 2;

pub struct Harness {
    pub state: GroveHostState,
    pub contacts: Arc<RecordingContacts>,
    pub objects: Arc<RecordingObjects>,
}

impl Harness {
    pub async fn new() -> Result<Self> {
        let contacts = Arc::new(RecordingContacts::default());
        let objects = Arc::new(RecordingObjects::default());
        let state = state_with(contacts.clone(), objects.clone()).await?;
        Ok(Self {
            state,
            contacts,
            objects,
        })
    }

    pub fn lifecycle(&self) -> &BranchLifecycle {
        self.state.lifecycle()
    }

    pub fn records(&self) -> &Records {
        self.state.records()
    }

    pub async fn seed_user(&self, username: &str) -> Result<()> {
        self.records()
            .put(&User::new(username, format!("{username}@example.com")))
            .await?;
        Ok(())
    }

    /// Creates a tree root through the lifecycle, seeding its creator.
    pub async fn create_root(&self, id: &str, creator: &str) -> Result<Branch> {
        self.seed_user(creator).await?;
        Ok(self
            .lifecycle()
            .create(new_branch(id, creator, "root"))
            .await?)
    }

    /// Records `id` under `ancestors` the way an approved request would:
    /// recorded parent set to the nearest ancestor plus one tag row each.
    pub async fn graft(&self, id: &str, ancestors: &[&str]) -> Result<()> {
        let mut branch = self.lifecycle().get(id).await?;
        if let Some(parent) = ancestors.first() {
            branch.parentid = (*parent).to_string();
            self.records().put(&branch).await?;
        }
        for a in ancestors {
            self.lifecycle().tags().tag(id, a).await?;
        }
        Ok(())
    }

    pub async fn tags_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(self
            .lifecycle()
            .tags()
            .ancestors_of(id)
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect())
    }
}

pub async fn records() -> Result<Records> {
    let store = SqlStore::in_memory("test", Box::new(NamespacePolicy)).await?;
    store.migrate(&ALL_TABLES).await?;
    Ok(Records::new(Arc::new(store), PAGE_SIZE))
}

pub async fn state_with(
    contacts: Arc<dyn ContactSync>,
    objects: Arc<dyn ObjectStore>,
) -> Result<GroveHostState> {
    Ok(GroveHostState::from_parts(
        records().await?,
        objects,
        contacts,
        PAGE_SIZE as usize,
    ))
}

pub async fn noop_state() -> Result<GroveHostState> {
    state_with(
        Arc::new(NoopContactSync),
        Arc::new(RecordingObjects::default()),
    )
    .await
}

pub fn new_branch(id: &str, creator: &str, parentid: &str) -> NewBranch {
    NewBranch {
        id: id.into(),
        name: format!("{id} branch"),
        creator: creator.into(),
        parentid: parentid.into(),
    }
}
