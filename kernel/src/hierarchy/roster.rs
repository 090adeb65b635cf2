//! Per-branch moderator membership.

use futures_util::future::try_join_all;
use tracing::debug;

use crate::hierarchy::error::HierarchyError;
use crate::model::{Mod, Validate};
use crate::store::{Key, RangeQuery, Records};

/// Moderator rows grouped by branch.
#[derive(Clone)]
pub struct ModRoster {
    records: Records,
}

impl ModRoster {
    /// Creates a roster over `records`.
    #[must_use]
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    /// Moderators of `branchid`, ordered by username.
    pub async fn find_by_branch(&self, branchid: &str) -> Result<Vec<Mod>, HierarchyError> {
        Ok(self.records.query_all(RangeQuery::primary(branchid)).await?)
    }

    /// Grants `m.username` moderation of `m.branchid`.
    pub async fn add(&self, m: &Mod) -> Result<(), HierarchyError> {
        m.check_all()?;
        self.records.put(m).await?;
        Ok(())
    }

    /// Revokes one moderator.
    pub async fn remove(&self, branchid: &str, username: &str) -> Result<(), HierarchyError> {
        self.records
            .delete::<Mod>(&Key::composite(branchid, username))
            .await?;
        Ok(())
    }

    /// Revokes every moderator of `branchid`, returning how many were removed.
    pub async fn remove_all(&self, branchid: &str) -> Result<usize, HierarchyError> {
        let mods = self.find_by_branch(branchid).await?;
        try_join_all(mods.iter().map(|m| self.records.remove(m))).await?;
        debug!(branchid, count = mods.len(), "mods removed");
        Ok(mods.len())
    }
}
