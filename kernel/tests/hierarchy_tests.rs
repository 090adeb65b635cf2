//! Integration tests for branch lifecycle and the tag index.
//!
//! Runs every structural operation against an in-memory `SQLite` store and
//! checks the tag rows, rosters, notifications, and counters left behind.

#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{
    FailingContacts, FailingObjects, Harness, RecordingContacts, RecordingObjects, new_branch,
    state_with,
};
use grove_kernel::collaborators::Bucket;
use grove_kernel::hierarchy::{
    BranchPatch, DescendantQuery, HierarchyError, Removal, SortKey,
};
use grove_kernel::model::{
    BRANCH_COUNT, Branch, BranchImage, Field, ImageKind, Mod, ModLogEntry, Notification,
    NotificationKind, SubBranchRequest, USER_DATE_INDEX, User,
};
use grove_kernel::store::{Key, RangeQuery};
use std::sync::Arc;

async fn notifications_of(h: &Harness, user: &str) -> Result<Vec<Notification>> {
    Ok(h
        .records()
        .query_all(RangeQuery::on_index(USER_DATE_INDEX, user))
        .await?)
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_root_creation_tags_self_and_root() -> Result<()> {
    let h = Harness::new().await?;
    let branch = h.create_root("r1", "alice").await?;

    assert_eq!(branch.parentid, "root");
    assert_eq!(h.tags_of("r1").await?, vec!["r1", "root"]);
    assert_eq!(h.lifecycle().tags().descendants_of("r1").await?, vec!["r1"]);

    let mods = h.lifecycle().roster().find_by_branch("r1").await?;
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].username, "alice");

    let user: Option<User> = h.records().get(&Key::hash("alice")).await?;
    let user = user.unwrap();
    assert_eq!((user.num_branches, user.num_mod_positions), (1, 1));
    assert_eq!(*h.contacts.calls.lock(), vec![("alice".to_string(), true)]);
    assert_eq!(h.lifecycle().counters().get(BRANCH_COUNT).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_child_request_notifies_moderators_and_stays_root() -> Result<()> {
    let h = Harness::new().await?;
    h.create_root("p1", "alice").await?;
    h.seed_user("carol").await?;
    h.lifecycle()
        .roster()
        .add(&Mod::new("p1", "carol", 5))
        .await?;
    h.seed_user("bob").await?;

    let child = h
        .lifecycle()
        .create(new_branch("c1", "bob", "p1"))
        .await?;

    assert_eq!(child.parentid, "root");
    assert_eq!(h.lifecycle().get("c1").await?.parentid, "root");
    assert_eq!(h.tags_of("c1").await?, vec!["c1", "root"]);

    let request = h.lifecycle().ledger().find("p1", "c1").await?.unwrap();
    assert_eq!(request.creator, "bob");

    for moderator in ["alice", "carol"] {
        let received = notifications_of(&h, moderator).await?;
        assert_eq!(received.len(), 1, "{moderator}");
        assert_eq!(received[0].kind, NotificationKind::NewChildBranchRequest);
        assert_eq!(received[0].data["childid"], "c1");
        assert_eq!(received[0].data["parentid"], "p1");
        assert_eq!(received[0].data["username"], "bob");
        assert!(received[0].unread);
    }
    assert!(notifications_of(&h, "bob").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_id_conflicts_before_any_write() -> Result<()> {
    let h = Harness::new().await?;
    h.create_root("dup", "alice").await?;

    let err = h
        .lifecycle()
        .create(new_branch("dup", "alice", "root"))
        .await
        .unwrap_err();

    assert!(matches!(err, HierarchyError::Conflict(_)));
    assert_eq!(h.lifecycle().counters().get(BRANCH_COUNT).await?, 1);
    assert_eq!(h.contacts.calls.lock().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_parent_is_not_found_and_writes_nothing() -> Result<()> {
    let h = Harness::new().await?;
    h.seed_user("bob").await?;

    let err = h
        .lifecycle()
        .create(new_branch("orphan", "bob", "ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, HierarchyError::NotFound(_)));
    assert!(h.lifecycle().get("orphan").await.is_err());
    assert!(h.lifecycle().roster().find_by_branch("orphan").await?.is_empty());
    assert!(h.tags_of("orphan").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_validation_reports_first_offending_field() -> Result<()> {
    let h = Harness::new().await?;

    let err = h
        .lifecycle()
        .create(new_branch("Bad Id", "alice", "root"))
        .await
        .unwrap_err();
    assert!(matches!(err, HierarchyError::Validation { field: Field::Id }));

    let mut blank = new_branch("fine", "alice", "root");
    blank.name = "   ".into();
    let err = h.lifecycle().create(blank).await.unwrap_err();
    assert!(matches!(err, HierarchyError::Validation { field: Field::Name }));
    assert!(h.lifecycle().get("fine").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_failed_contact_sync_leaves_partial_state() -> Result<()> {
    let state = state_with(
        Arc::new(FailingContacts),
        Arc::new(RecordingObjects::default()),
    )
    .await?;
    state
        .records()
        .put(&User::new("alice", "alice@example.com"))
        .await?;

    let err = state
        .lifecycle()
        .create(new_branch("half", "alice", "root"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HierarchyError::Step {
            step: "sync_contact",
            ..
        }
    ));
    assert!(err.is_internal());
    // earlier steps stay applied
    assert!(state.lifecycle().get("half").await.is_ok());
    assert_eq!(
        state.lifecycle().tags().ancestors_of("half").await?.len(),
        2
    );
    // later steps never ran
    assert_eq!(state.lifecycle().counters().get(BRANCH_COUNT).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_recipient_aborts_create_before_any_notification() -> Result<()> {
    let h = Harness::new().await?;
    h.create_root("p1", "alice").await?;
    h.records().put(&Mod::new("p1", "carol", 5)).await?;
    // written around validation, as a legacy row would be
    h.records().put(&Mod::new("p1", "bad name", 5)).await?;
    h.seed_user("bob").await?;

    let err = h
        .lifecycle()
        .create(new_branch("c1", "bob", "p1"))
        .await
        .unwrap_err();

    let HierarchyError::Step { step, source } = &err else {
        panic!("expected a step failure, got {err:?}");
    };
    assert_eq!(*step, "record_subbranch_request");
    assert!(matches!(
        **source,
        HierarchyError::Validation { field: Field::User }
    ));
    assert!(h.lifecycle().ledger().find("p1", "c1").await?.is_none());
    for moderator in ["alice", "carol"] {
        assert!(notifications_of(&h, moderator).await?.is_empty(), "{moderator}");
    }
    assert!(matches!(
        h.lifecycle().get("c1").await,
        Err(HierarchyError::NotFound(_))
    ));
    assert!(h.lifecycle().roster().find_by_branch("c1").await?.is_empty());
    Ok(())
}

// =============================================================================
// Fan-out
// =============================================================================

#[tokio::test]
async fn test_moderator_of_both_branches_is_notified_once() -> Result<()> {
    let h = Harness::new().await?;
    let roster = h.lifecycle().roster();
    roster.add(&Mod::new("parent", "dana", 1)).await?;
    roster.add(&Mod::new("parent", "erin", 1)).await?;
    roster.add(&Mod::new("child", "dana", 1)).await?;

    let sent = h
        .lifecycle()
        .ledger()
        .record(&SubBranchRequest {
            parentid: "parent".into(),
            childid: "child".into(),
            date: 42,
            creator: "erin".into(),
        })
        .await?;

    let mut recipients: Vec<_> = sent.iter().map(|n| n.user.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["dana", "erin"]);
    assert_eq!(notifications_of(&h, "dana").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_request_aborts_before_notifying() -> Result<()> {
    let h = Harness::new().await?;
    h.lifecycle()
        .roster()
        .add(&Mod::new("parent", "dana", 1))
        .await?;

    let err = h
        .lifecycle()
        .ledger()
        .record(&SubBranchRequest {
            parentid: "parent".into(),
            childid: "child".into(),
            date: 0,
            creator: "erin".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HierarchyError::Validation { field: Field::Date }));
    assert!(notifications_of(&h, "dana").await?.is_empty());
    assert!(h.lifecycle().ledger().find("parent", "child").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_requests_list_newest_first() -> Result<()> {
    let h = Harness::new().await?;
    for (child, date) in [("a", 10), ("b", 30), ("c", 20)] {
        h.lifecycle()
            .ledger()
            .record(&SubBranchRequest {
                parentid: "parent".into(),
                childid: child.into(),
                date,
                creator: "erin".into(),
            })
            .await?;
    }

    let children: Vec<String> = h
        .lifecycle()
        .ledger()
        .find_by_branch("parent")
        .await?
        .into_iter()
        .map(|r| r.childid)
        .collect();
    assert_eq!(children, vec!["b", "c", "a"]);
    Ok(())
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_merges_supplied_fields_only() -> Result<()> {
    let h = Harness::new().await?;
    h.create_root("edit", "alice").await?;

    let updated = h
        .lifecycle()
        .update(
            "edit",
            BranchPatch {
                description: Some("All about editing".into()),
                ..BranchPatch::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "edit branch");
    assert_eq!(updated.description, "All about editing");

    let err = h
        .lifecycle()
        .update(
            "edit",
            BranchPatch {
                name: Some("x".repeat(31)),
                ..BranchPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HierarchyError::Validation { field: Field::Name }));

    let err = h
        .lifecycle()
        .update("absent", BranchPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HierarchyError::NotFound(_)));
    Ok(())
}

// =============================================================================
// Detach and delete
// =============================================================================

#[tokio::test]
async fn test_detach_strips_prior_ancestors_from_subtree() -> Result<()> {
    let h = Harness::new().await?;
    for id in ["g", "p", "x", "y"] {
        h.create_root(id, "alice").await?;
    }
    h.graft("p", &["g"]).await?;
    h.graft("x", &["p", "g"]).await?;
    h.graft("y", &["x", "p", "g"]).await?;

    let removal = h.lifecycle().detach_or_delete("x").await?;

    let Removal::Detached(report) = removal else {
        panic!("expected a detach");
    };
    assert_eq!(report.removed, vec!["g", "p"]);
    assert_eq!(report.descendants, vec!["y"]);
    assert_eq!(h.lifecycle().get("x").await?.parentid, "root");
    assert_eq!(h.tags_of("x").await?, vec!["root", "x"]);
    assert_eq!(h.tags_of("y").await?, vec!["root", "x", "y"]);
    // the old chain is untouched
    assert_eq!(h.tags_of("p").await?, vec!["g", "p", "root"]);
    assert_eq!(h.lifecycle().counters().get(BRANCH_COUNT).await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_detaching_twice_is_a_no_op_on_tags() -> Result<()> {
    let h = Harness::new().await?;
    for id in ["p", "x"] {
        h.create_root(id, "alice").await?;
    }
    h.graft("x", &["p"]).await?;

    h.lifecycle().detach_or_delete("x").await?;
    let after_first = h.tags_of("x").await?;
    let report = h.lifecycle().tags().detach("x").await?;

    assert!(report.removed.is_empty());
    assert_eq!(h.tags_of("x").await?, after_first);
    Ok(())
}

#[tokio::test]
async fn test_root_deletion_cleans_up_and_reparents_children() -> Result<()> {
    let h = Harness::new().await?;
    h.create_root("r", "alice").await?;
    h.create_root("k", "bob").await?;
    h.graft("k", &["r"]).await?;
    h.records()
        .put(&ModLogEntry {
            branchid: "r".into(),
            username: "alice".into(),
            date: 7,
            action: "answer-subbranch-request".into(),
            data: serde_json::json!({ "childid": "k" }),
        })
        .await?;
    h.records()
        .put(&BranchImage {
            id: ImageKind::Picture.image_id("r"),
            date: 8,
            extension: "jpg".into(),
        })
        .await?;

    let removal = h.lifecycle().detach_or_delete("r").await?;

    let Removal::Deleted(report) = removal else {
        panic!("expected a deletion");
    };
    assert_eq!(report.reparented, vec!["k"]);
    assert_eq!(report.mod_log_entries, 1);
    assert_eq!(report.mods, 1);
    assert_eq!(report.tags, 2);
    assert_eq!(report.image_objects, 3);
    assert_eq!(report.branch_count, 1);

    assert!(matches!(
        h.lifecycle().get("r").await,
        Err(HierarchyError::NotFound(_))
    ));
    assert_eq!(h.lifecycle().get("k").await?.parentid, "root");
    assert!(h.tags_of("r").await?.is_empty());
    assert!(h.lifecycle().roster().find_by_branch("r").await?.is_empty());
    assert!(h.lifecycle().list_mod_log("r").await?.is_empty());
    let image: Option<BranchImage> = h.records().get(&Key::hash("r-picture")).await?;
    assert!(image.is_none());
    // rows of other branches carrying the deleted root are left in place
    assert_eq!(h.tags_of("k").await?, vec!["k", "r", "root"]);

    let deleted = h.objects.deleted.lock().clone();
    assert_eq!(
        deleted,
        vec![
            (Bucket::BranchImages, vec!["r-picture-orig.jpg".to_string()]),
            (
                Bucket::BranchImagesResized,
                vec!["r-picture-640.jpg".to_string(), "r-picture-200.jpg".to_string()]
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_root_deletion_survives_object_store_failure() -> Result<()> {
    let objects = Arc::new(FailingObjects::default());
    let state = state_with(Arc::new(RecordingContacts::default()), objects.clone()).await?;
    state
        .records()
        .put(&User::new("alice", "alice@example.com"))
        .await?;
    state
        .lifecycle()
        .create(new_branch("r", "alice", "root"))
        .await?;
    for (kind, extension) in [(ImageKind::Picture, "jpg"), (ImageKind::Cover, "png")] {
        state
            .records()
            .put(&BranchImage {
                id: kind.image_id("r"),
                date: 8,
                extension: extension.into(),
            })
            .await?;
    }

    let removal = state.lifecycle().detach_or_delete("r").await?;

    let Removal::Deleted(report) = removal else {
        panic!("expected a deletion");
    };
    assert_eq!(report.image_objects, 6);
    assert_eq!(report.branch_count, 0);
    for id in ["r-picture", "r-cover"] {
        let image: Option<BranchImage> = state.records().get(&Key::hash(id)).await?;
        assert!(image.is_none(), "{id}");
    }
    assert_eq!(state.lifecycle().counters().get(BRANCH_COUNT).await?, 0);

    let mut attempted = objects.attempted.lock().clone();
    for (_, keys) in &mut attempted {
        keys.sort_unstable();
    }
    assert_eq!(
        attempted,
        vec![
            (
                Bucket::BranchImages,
                vec!["r-cover-orig.png".to_string(), "r-picture-orig.jpg".to_string()]
            ),
            (
                Bucket::BranchImagesResized,
                vec![
                    "r-cover-1920.png".to_string(),
                    "r-cover-800.png".to_string(),
                    "r-picture-200.jpg".to_string(),
                    "r-picture-640.jpg".to_string(),
                ]
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_removing_missing_branch_is_not_found() -> Result<()> {
    let h = Harness::new().await?;
    let err = h.lifecycle().detach_or_delete("nope").await.unwrap_err();
    assert!(matches!(err, HierarchyError::NotFound(_)));
    Ok(())
}

// =============================================================================
// Listing
// =============================================================================

async fn seed_descendants(h: &Harness) -> Result<()> {
    h.create_root("top", "alice").await?;
    for (id, date, posts) in [("d1", 100, 3), ("d2", 300, 1), ("d3", 200, 3), ("d4", 50, 9)] {
        let mut branch = Branch::new(id, id, "alice", "top", date);
        branch.post_count = posts;
        h.records().put(&branch).await?;
        h.lifecycle().tags().tag_self(id).await?;
        h.lifecycle().tags().tag_root(id).await?;
        h.lifecycle().tags().tag(id, "top").await?;
    }
    Ok(())
}

fn ids(branches: &[Branch]) -> Vec<&str> {
    branches.iter().map(|b| b.id.as_str()).collect()
}

#[tokio::test]
async fn test_descendants_page_newest_first_after_cursor() -> Result<()> {
    let h = Harness::new().await?;
    seed_descendants(&h).await?;

    let mut query = DescendantQuery::new("top");
    let first = h.lifecycle().list_descendants(&query).await?;
    assert_eq!(ids(&first), vec!["d2", "d3"]);

    query.cursor = Some("d3".into());
    let second = h.lifecycle().list_descendants(&query).await?;
    assert_eq!(ids(&second), vec!["d1", "d4"]);

    query.cursor = Some("d4".into());
    assert!(h.lifecycle().list_descendants(&query).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_descendants_sort_and_time_filter() -> Result<()> {
    let h = Harness::new().await?;
    seed_descendants(&h).await?;

    let mut query = DescendantQuery::new("top");
    query.sort = SortKey::PostCount;
    query.after = 100;
    let page = h.lifecycle().list_descendants(&query).await?;
    assert_eq!(ids(&page), vec!["d1", "d3"]);

    query.cursor = Some("d3".into());
    assert_eq!(ids(&h.lifecycle().list_descendants(&query).await?), vec!["d2"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_cursor_is_not_found() -> Result<()> {
    let h = Harness::new().await?;
    seed_descendants(&h).await?;

    let mut query = DescendantQuery::new("top");
    query.cursor = Some("ghost".into());
    let err = h.lifecycle().list_descendants(&query).await.unwrap_err();
    assert!(matches!(err, HierarchyError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_mod_log_lists_newest_first() -> Result<()> {
    let h = Harness::new().await?;
    for date in [3, 9, 5] {
        h.records()
            .put(&ModLogEntry {
                branchid: "b".into(),
                username: "alice".into(),
                date,
                action: "remove-post".into(),
                data: serde_json::json!({}),
            })
            .await?;
    }
    let dates: Vec<i64> = h
        .lifecycle()
        .list_mod_log("b")
        .await?
        .into_iter()
        .map(|e| e.date)
        .collect();
    assert_eq!(dates, vec![9, 5, 3]);
    Ok(())
}
