//! Multi-step structural operations on branches.
//!
//! Each operation is a fixed chain of dependent storage steps. A step starts
//! only after the previous one completed, and the first failure ends the
//! chain with [`HierarchyError::Step`]. Nothing is rolled back: steps that
//! already ran stay applied.

use chrono::Utc;
use futures_util::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::collaborators::{Bucket, ContactSync, ObjectStore};
use crate::hierarchy::counters::Counters;
use crate::hierarchy::error::HierarchyError;
use crate::hierarchy::fanout::NotificationFanout;
use crate::hierarchy::ledger::SubbranchRequestLedger;
use crate::hierarchy::listing::{self, DescendantQuery};
use crate::hierarchy::roster::ModRoster;
use crate::hierarchy::tags::{DetachReport, TagIndex};
use crate::infrastructure::audit::{AuditEvent, log_audit};
use crate::model::{
    BRANCH_COUNT, Branch, BranchImage, Field, ImageKind, Mod, ModLogEntry, PARENT_DATE_INDEX,
    ROOT, SubBranchRequest, Validate,
};
use crate::store::{Key, RangeQuery, Records};

/// Input of [`BranchLifecycle::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranch {
    /// Requested slug.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Creating user.
    pub creator: String,
    /// Requested parent, or `root`.
    pub parentid: String,
}

/// Fields [`BranchLifecycle::update`] may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPatch {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New rules.
    pub rules: Option<String>,
}

/// What permanent deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Image objects whose deletion was attempted.
    pub image_objects: usize,
    /// Mod-log entries removed.
    pub mod_log_entries: usize,
    /// Moderators removed.
    pub mods: usize,
    /// Own tag rows removed.
    pub tags: usize,
    /// Former children, now tree roots.
    pub reparented: Vec<String>,
    /// `branch_count` after the decrement.
    pub branch_count: i64,
}

/// Outcome of [`BranchLifecycle::detach_or_delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The branch was a tree root and is gone.
    Deleted(DeletionReport),
    /// The branch was cut from its ancestors and kept its subtree.
    Detached(DetachReport),
}

/// Orchestrates branch creation, update, detachment, and deletion.
#[derive(Clone)]
pub struct BranchLifecycle {
    records: Records,
    tags: TagIndex,
    roster: ModRoster,
    ledger: SubbranchRequestLedger,
    counters: Counters,
    objects: Arc<dyn ObjectStore>,
    contacts: Arc<dyn ContactSync>,
    page_size: usize,
}

/// Runs one step of a chain, tagging and logging its failure.
async fn step<T, F>(name: &'static str, fut: F) -> Result<T, HierarchyError>
where
    F: Future<Output = Result<T, HierarchyError>>,
{
    fut.await.map_err(|source| {
        error!(step = name, error = %source, "lifecycle step failed");
        HierarchyError::Step {
            step: name,
            source: Box::new(source),
        }
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl BranchLifecycle {
    /// Wires the engine over `records` and the external collaborators.
    /// `page_size` bounds each page of [`BranchLifecycle::list_descendants`].
    #[must_use]
    pub fn new(
        records: Records,
        objects: Arc<dyn ObjectStore>,
        contacts: Arc<dyn ContactSync>,
        page_size: usize,
    ) -> Self {
        let roster = ModRoster::new(records.clone());
        let fanout = NotificationFanout::new(records.clone());
        Self {
            tags: TagIndex::new(records.clone()),
            ledger: SubbranchRequestLedger::new(records.clone(), roster.clone(), fanout),
            counters: Counters::new(records.clone()),
            roster,
            records,
            objects,
            contacts,
            page_size: page_size.max(1),
        }
    }

    /// The tag index.
    #[must_use]
    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    /// The moderator roster.
    #[must_use]
    pub fn roster(&self) -> &ModRoster {
        &self.roster
    }

    /// The sub-branch request ledger.
    #[must_use]
    pub fn ledger(&self) -> &SubbranchRequestLedger {
        &self.ledger
    }

    /// Global and per-user counters.
    #[must_use]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Fetches a branch.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NotFound`] if no branch has this id.
    pub async fn get(&self, id: &str) -> Result<Branch, HierarchyError> {
        self.find(id)
            .await?
            .ok_or_else(|| HierarchyError::NotFound(format!("branch {id}")))
    }

    async fn find(&self, id: &str) -> Result<Option<Branch>, HierarchyError> {
        Ok(self.records.get(&Key::hash(id)).await?)
    }

    /// Creates a branch as a tree root, recording a sub-branch request when
    /// another parent was asked for.
    ///
    /// Validation, the id conflict check, and the parent check run before any
    /// write. The conflict check is not atomic with the writes: two concurrent
    /// creates of one id can both pass it.
    ///
    /// # Errors
    ///
    /// Validation, conflict, or not-found before any write; [`HierarchyError::Step`]
    /// once the chain has started.
    #[instrument(skip(self, new), fields(id = %new.id, parentid = %new.parentid))]
    pub async fn create(&self, new: NewBranch) -> Result<Branch, HierarchyError> {
        let started = Instant::now();
        let date = now_millis();
        let mut branch = Branch::new(new.id, new.name, new.creator, new.parentid, date);
        branch.check_all()?;

        if self.find(&branch.id).await?.is_some() {
            return Err(HierarchyError::Conflict(format!(
                "branch {} already exists",
                branch.id
            )));
        }
        let requested_parent = branch.parentid.clone();
        let request = if requested_parent == ROOT {
            None
        } else {
            if self.find(&requested_parent).await?.is_none() {
                return Err(HierarchyError::NotFound(format!(
                    "branch {requested_parent}"
                )));
            }
            let request = SubBranchRequest {
                parentid: requested_parent.clone(),
                childid: branch.id.clone(),
                date,
                creator: branch.creator.clone(),
            };
            request.check_all()?;
            Some(request)
        };
        let moderator = Mod::new(&branch.id, &branch.creator, date);
        moderator.check_all()?;

        if let Some(request) = &request {
            step("record_subbranch_request", self.ledger.record(request)).await?;
        }
        step("add_moderator", self.roster.add(&moderator)).await?;

        branch.parentid = ROOT.to_string();
        step("put_branch", async {
            self.records.put(&branch).await.map_err(HierarchyError::from)
        })
        .await?;
        step("tag_self", self.tags.tag_self(&branch.id)).await?;
        step("tag_root", self.tags.tag_root(&branch.id)).await?;

        let creator = step(
            "bump_creator_counts",
            self.counters.bump_user(&branch.creator, 1, 1),
        )
        .await?;
        step("sync_contact", async {
            self.contacts
                .add_contact(&creator, true)
                .await
                .map_err(HierarchyError::from)
        })
        .await?;
        step("increment_branch_count", self.counters.increment(BRANCH_COUNT, 1)).await?;

        metrics::counter!("grove_branches_created_total").increment(1);
        metrics::histogram!("grove_lifecycle_duration_seconds", "operation" => "create")
            .record(started.elapsed().as_secs_f64());
        log_audit(&AuditEvent::BranchCreated {
            branchid: branch.id.clone(),
            creator: branch.creator.clone(),
            requested_parent,
        });
        info!("branch created");
        Ok(branch)
    }

    /// Merges `patch` onto the stored branch. Only supplied fields are
    /// validated. Tags are untouched.
    ///
    /// # Errors
    ///
    /// Validation before the lookup; not-found if the branch is absent.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: BranchPatch) -> Result<Branch, HierarchyError> {
        let mut fields = Vec::new();
        let mut staged = Branch::new(id, "", "", ROOT, 0);
        if let Some(name) = &patch.name {
            staged.name.clone_from(name);
            fields.push(Field::Name);
        }
        if let Some(description) = &patch.description {
            staged.description.clone_from(description);
            fields.push(Field::Description);
        }
        if let Some(rules) = &patch.rules {
            staged.rules.clone_from(rules);
            fields.push(Field::Rules);
        }
        staged.check(&fields)?;

        let mut branch = self.get(id).await?;
        if let Some(name) = patch.name {
            branch.name = name;
        }
        if let Some(description) = patch.description {
            branch.description = description;
        }
        if let Some(rules) = patch.rules {
            branch.rules = rules;
        }
        self.records.put(&branch).await?;
        info!(fields = fields.len(), "branch updated");
        Ok(branch)
    }

    /// Permanently deletes a tree root, or detaches a child branch together
    /// with its subtree.
    ///
    /// # Errors
    ///
    /// Not-found if the branch is absent; [`HierarchyError::Step`] for any
    /// failure after the chain started.
    #[instrument(skip(self))]
    pub async fn detach_or_delete(&self, id: &str) -> Result<Removal, HierarchyError> {
        let mut branch = self.get(id).await?;
        let started = Instant::now();

        let removal = if branch.is_tree_root() {
            let report = self.delete_root(&branch).await?;
            metrics::counter!("grove_branches_deleted_total").increment(1);
            log_audit(&AuditEvent::BranchDeleted {
                branchid: branch.id.clone(),
                reparented: report.reparented.clone(),
            });
            Removal::Deleted(report)
        } else {
            branch.parentid = ROOT.to_string();
            step("reset_parent", async {
                self.records.put(&branch).await.map_err(HierarchyError::from)
            })
            .await?;
            let report = step("detach_tags", self.tags.detach(&branch.id)).await?;
            metrics::counter!("grove_branches_detached_total").increment(1);
            metrics::counter!("grove_tag_rows_removed_total").increment(report.deletions as u64);
            log_audit(&AuditEvent::BranchDetached {
                branchid: branch.id.clone(),
                former_ancestors: report.removed.clone(),
                descendants: report.descendants.len(),
            });
            Removal::Detached(report)
        };

        metrics::histogram!("grove_lifecycle_duration_seconds", "operation" => "remove")
            .record(started.elapsed().as_secs_f64());
        Ok(removal)
    }

    async fn delete_root(&self, branch: &Branch) -> Result<DeletionReport, HierarchyError> {
        let id = branch.id.as_str();
        step("delete_branch", async {
            self.records.remove(branch).await.map_err(HierarchyError::from)
        })
        .await?;

        let image_objects = step("delete_images", self.delete_images(id)).await?;

        let entries = step("load_mod_log", self.list_mod_log(id)).await?;
        step("delete_mod_log", async {
            try_join_all(entries.iter().map(|e| self.records.remove(e)))
            .await
            .map_err(HierarchyError::from)
        })
        .await?;

        let mods = step("delete_mods", self.roster.remove_all(id)).await?;
        let tags = step("delete_tags", self.tags.purge_own(id)).await?;
        metrics::counter!("grove_tag_rows_removed_total").increment(tags as u64);

        let children: Vec<Branch> = step("load_children", async {
            self.records
                .query_all(RangeQuery::on_index(PARENT_DATE_INDEX, id).descending())
                .await
                .map_err(HierarchyError::from)
        })
        .await?;
        step("reparent_children", async {
            try_join_all(children.iter().map(|child| {
                let mut child = child.clone();
                child.parentid = ROOT.to_string();
                async move { self.records.put(&child).await }
            }))
            .await
            .map_err(HierarchyError::from)
        })
        .await?;

        let branch_count =
            step("decrement_branch_count", self.counters.increment(BRANCH_COUNT, -1)).await?;

        let report = DeletionReport {
            image_objects,
            mod_log_entries: entries.len(),
            mods,
            tags,
            reparented: children.into_iter().map(|c| c.id).collect(),
            branch_count,
        };
        info!(
            mod_log_entries = report.mod_log_entries,
            mods = report.mods,
            tags = report.tags,
            children = report.reparented.len(),
            "branch deleted"
        );
        Ok(report)
    }

    /// Deletes both image kinds of `id`: every object variant, then the
    /// metadata row. Object storage failures are logged and skipped.
    async fn delete_images(&self, id: &str) -> Result<usize, HierarchyError> {
        let images = try_join_all(ImageKind::ALL.map(|kind| async move {
            let key = Key::hash(kind.image_id(id));
            let image: Option<BranchImage> = self.records.get(&key).await?;
            Ok::<_, HierarchyError>(image.map(|image| (kind, image)))
        }))
        .await?;

        let mut originals = Vec::new();
        let mut resized = Vec::new();
        for (kind, image) in images.iter().flatten() {
            originals.push(image.original_key());
            resized.extend(image.resized_keys(*kind));
        }
        let attempted = originals.len() + resized.len();

        for (bucket, keys) in [
            (Bucket::BranchImages, originals),
            (Bucket::BranchImagesResized, resized),
        ] {
            if keys.is_empty() {
                continue;
            }
            if let Err(e) = self.objects.delete_objects(bucket, &keys).await {
                warn!(bucket = bucket.as_str(), error = %e, "image deletion failed, continuing");
            }
        }

        try_join_all(ImageKind::ALL.map(|kind| {
            let key = Key::hash(kind.image_id(id));
            async move { self.records.delete::<BranchImage>(&key).await }
        }))
        .await?;
        Ok(attempted)
    }

    /// One page of the descendants of `query.tag`, ranked by `query.sort`,
    /// strictly after the cursor branch.
    ///
    /// # Errors
    ///
    /// Not-found if the cursor names a missing branch.
    #[instrument(skip(self, query), fields(tag = %query.tag, sort = %query.sort))]
    pub async fn list_descendants(
        &self,
        query: &DescendantQuery,
    ) -> Result<Vec<Branch>, HierarchyError> {
        let cursor = match &query.cursor {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };

        let ids = self.tags.descendants_of(&query.tag).await?;
        let branches = try_join_all(
            ids.iter()
                .filter(|id| **id != query.tag)
                .map(|id| self.find(id)),
        )
        .await?;

        Ok(listing::page(
            branches.into_iter().flatten().collect(),
            query,
            cursor.as_ref(),
            self.page_size,
        ))
    }

    /// Moderation log of `id`, newest first.
    pub async fn list_mod_log(&self, id: &str) -> Result<Vec<ModLogEntry>, HierarchyError> {
        Ok(self
            .records
            .query_all(RangeQuery::primary(id).descending())
            .await?)
    }
}
