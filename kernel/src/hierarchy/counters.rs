//! Read-then-write counters.
//!
//! Neither the global constants nor the per-user tallies are updated
//! atomically: two concurrent increments can read the same value and one
//! update is lost.

use tracing::debug;

use crate::hierarchy::error::HierarchyError;
use crate::model::{Constant, User};
use crate::store::{Key, Records};

/// Global and per-user counters.
#[derive(Clone)]
pub struct Counters {
    records: Records,
}

impl Counters {
    /// Creates counters over `records`.
    #[must_use]
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    /// Current value of constant `id`; an absent row reads as zero.
    pub async fn get(&self, id: &str) -> Result<i64, HierarchyError> {
        Ok(self
            .records
            .get::<Constant>(&Key::hash(id))
            .await?
            .map_or(0, |c| c.data))
    }

    /// Adds `delta` to constant `id` and returns the new value.
    pub async fn increment(&self, id: &str, delta: i64) -> Result<i64, HierarchyError> {
        let data = self.get(id).await? + delta;
        self.records
            .put(&Constant {
                id: id.to_string(),
                data,
            })
            .await?;
        debug!(id, data, "constant updated");
        Ok(data)
    }

    /// Adds to a user's branch and moderator-position tallies.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NotFound`] if the user has no profile.
    pub async fn bump_user(
        &self,
        username: &str,
        branches: i64,
        mod_positions: i64,
    ) -> Result<User, HierarchyError> {
        let mut user = self
            .records
            .get::<User>(&Key::hash(username))
            .await?
            .ok_or_else(|| HierarchyError::NotFound(format!("user {username}")))?;
        user.num_branches += branches;
        user.num_mod_positions += mod_positions;
        self.records.put(&user).await?;
        Ok(user)
    }
}
