//! Transitive-closure index over the branch forest.
//!
//! Every branch `B` owns one row `(B, t)` for each `t` in
//! `{B} ∪ ancestors(B) ∪ {root}`. Reading the primary key of `B` yields its
//! ancestor chain; reading the tag index under `B` yields every descendant of
//! `B`, `B` included. Structural changes keep the rows consistent by issuing
//! point deletes in a fixed order; there are no transactions.

use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use crate::hierarchy::error::HierarchyError;
use crate::model::{ROOT, TAG_BRANCH_INDEX, Tag, Validate};
use crate::store::{Key, RangeQuery, Records};

/// Outcome of detach propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetachReport {
    /// Former strict ancestors, now stripped from the subtree.
    pub removed: Vec<String>,
    /// Descendants that had their rows rewritten, excluding the detached node.
    pub descendants: Vec<String>,
    /// Number of tag rows deleted.
    pub deletions: usize,
}

/// Maintains and queries `(branchid, tag)` rows.
#[derive(Clone)]
pub struct TagIndex {
    records: Records,
}

impl TagIndex {
    /// Creates an index over `records`.
    #[must_use]
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    /// Upserts `(id, tag)`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed ids, or a store error.
    pub async fn tag(&self, id: &str, tag: &str) -> Result<(), HierarchyError> {
        let row = Tag::new(id, tag);
        row.check_all()?;
        self.records.put(&row).await?;
        Ok(())
    }

    /// Upserts `(id, id)`. Idempotent.
    pub async fn tag_self(&self, id: &str) -> Result<(), HierarchyError> {
        self.tag(id, id).await
    }

    /// Upserts `(id, root)`. Idempotent.
    pub async fn tag_root(&self, id: &str) -> Result<(), HierarchyError> {
        self.tag(id, ROOT).await
    }

    /// Tag rows owned by `id`, ordered by tag.
    pub async fn ancestors_of(&self, id: &str) -> Result<Vec<Tag>, HierarchyError> {
        Ok(self.records.query_all(RangeQuery::primary(id)).await?)
    }

    /// Ids of every branch tagged with `tag`, `tag` itself included.
    pub async fn descendants_of(&self, tag: &str) -> Result<Vec<String>, HierarchyError> {
        let rows: Vec<Tag> = self
            .records
            .query_all(RangeQuery::on_index(TAG_BRANCH_INDEX, tag))
            .await?;
        Ok(rows.into_iter().map(|row| row.branchid).collect())
    }

    /// Deletes exactly the row `(id, tag)`.
    pub async fn untag(&self, id: &str, tag: &str) -> Result<(), HierarchyError> {
        self.records.delete::<Tag>(&Key::composite(id, tag)).await?;
        Ok(())
    }

    /// Cuts `id` from its strict ancestors.
    ///
    /// With `A` the ancestors of `id` other than itself and root, deletes
    /// `(id, a)` for every `a` in `A`, then `(d, a)` for every strict
    /// descendant `d` of `id`. The subtree keeps its rows under `id` and root.
    #[instrument(skip(self))]
    pub async fn detach(&self, id: &str) -> Result<DetachReport, HierarchyError> {
        let removed: Vec<String> = self
            .ancestors_of(id)
            .await?
            .into_iter()
            .map(|row| row.tag)
            .filter(|tag| tag != id && tag != ROOT)
            .collect();

        try_join_all(removed.iter().map(|a| self.untag(id, a))).await?;
        debug!(count = removed.len(), "own ancestor rows removed");

        let descendants: Vec<String> = self
            .descendants_of(id)
            .await?
            .into_iter()
            .filter(|d| d != id)
            .collect();

        try_join_all(
            descendants
                .iter()
                .flat_map(|d| removed.iter().map(move |a| self.untag(d, a))),
        )
        .await?;

        let deletions = removed.len() * (descendants.len() + 1);
        debug!(
            descendants = descendants.len(),
            deletions, "detach propagated"
        );

        Ok(DetachReport {
            removed,
            descendants,
            deletions,
        })
    }

    /// Deletes every row owned by `id`. Rows of other branches that carry `id`
    /// as a tag are left alone.
    #[instrument(skip(self))]
    pub async fn purge_own(&self, id: &str) -> Result<usize, HierarchyError> {
        let rows = self.ancestors_of(id).await?;
        try_join_all(rows.iter().map(|row| self.records.remove(row))).await?;
        debug!(count = rows.len(), "own tag rows removed");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TAGS;
    use crate::store::{NamespacePolicy, SqlStore};
    use std::sync::Arc;

    async fn index() -> anyhow::Result<TagIndex> {
        let store = SqlStore::in_memory("test", Box::new(NamespacePolicy)).await?;
        store.migrate(&[&TAGS]).await?;
        Ok(TagIndex::new(Records::new(Arc::new(store), 2)))
    }

    async fn chain(tags: &TagIndex, id: &str, ancestors: &[&str]) -> anyhow::Result<()> {
        tags.tag_self(id).await?;
        tags.tag_root(id).await?;
        for a in ancestors {
            tags.tag(id, a).await?;
        }
        Ok(())
    }

    fn names(rows: &[Tag]) -> Vec<&str> {
        rows.iter().map(|r| r.tag.as_str()).collect()
    }

    #[tokio::test]
    async fn self_and_root_tags_are_idempotent() -> anyhow::Result<()> {
        let tags = index().await?;
        chain(&tags, "r1", &[]).await?;
        chain(&tags, "r1", &[]).await?;

        assert_eq!(names(&tags.ancestors_of("r1").await?), vec!["r1", "root"]);
        assert_eq!(tags.descendants_of("r1").await?, vec!["r1"]);
        Ok(())
    }

    #[tokio::test]
    async fn detach_strips_former_ancestors_from_subtree() -> anyhow::Result<()> {
        let tags = index().await?;
        chain(&tags, "g", &[]).await?;
        chain(&tags, "p", &["g"]).await?;
        chain(&tags, "x", &["p", "g"]).await?;
        chain(&tags, "y", &["x", "p", "g"]).await?;
        chain(&tags, "z", &["y", "x", "p", "g"]).await?;

        let report = tags.detach("x").await?;

        assert_eq!(report.removed, vec!["g", "p"]);
        assert_eq!(report.descendants, vec!["y", "z"]);
        assert_eq!(report.deletions, 6);
        assert_eq!(names(&tags.ancestors_of("x").await?), vec!["root", "x"]);
        assert_eq!(names(&tags.ancestors_of("y").await?), vec!["root", "x", "y"]);
        assert_eq!(
            names(&tags.ancestors_of("z").await?),
            vec!["root", "x", "y", "z"]
        );
        assert_eq!(tags.descendants_of("g").await?, vec!["g", "p"]);
        Ok(())
    }

    #[tokio::test]
    async fn purge_leaves_rows_of_other_branches() -> anyhow::Result<()> {
        let tags = index().await?;
        chain(&tags, "r", &[]).await?;
        chain(&tags, "k", &["r"]).await?;

        assert_eq!(tags.purge_own("r").await?, 2);
        assert!(tags.ancestors_of("r").await?.is_empty());
        assert_eq!(names(&tags.ancestors_of("k").await?), vec!["k", "r", "root"]);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_malformed_rows() -> anyhow::Result<()> {
        let tags = index().await?;
        let err = tags.tag("Not Valid", "root").await;
        assert!(matches!(err, Err(HierarchyError::Validation { .. })));
        Ok(())
    }
}
