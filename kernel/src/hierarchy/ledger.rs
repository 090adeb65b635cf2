//! Append-only record of proposed parent/child linkages.

use futures_util::future::try_join;
use tracing::{info, instrument};

use crate::hierarchy::error::HierarchyError;
use crate::hierarchy::fanout::{Event, NotificationFanout};
use crate::hierarchy::roster::ModRoster;
use crate::model::{
    ChildBranchRequestData, Notification, NotificationKind, REQUEST_PARENT_DATE_INDEX,
    SubBranchRequest, Validate,
};
use crate::store::{Key, RangeQuery, Records};

/// Sub-branch requests, queryable by parent.
#[derive(Clone)]
pub struct SubbranchRequestLedger {
    records: Records,
    roster: ModRoster,
    fanout: NotificationFanout,
}

impl SubbranchRequestLedger {
    /// Creates a ledger that notifies moderators through `fanout`.
    #[must_use]
    pub fn new(records: Records, roster: ModRoster, fanout: NotificationFanout) -> Self {
        Self {
            records,
            roster,
            fanout,
        }
    }

    /// The request linking `childid` under `parentid`, if any.
    pub async fn find(
        &self,
        parentid: &str,
        childid: &str,
    ) -> Result<Option<SubBranchRequest>, HierarchyError> {
        Ok(self
            .records
            .get(&Key::composite(parentid, childid))
            .await?)
    }

    /// Requests addressed to `parentid`, newest first.
    pub async fn find_by_branch(
        &self,
        parentid: &str,
    ) -> Result<Vec<SubBranchRequest>, HierarchyError> {
        Ok(self
            .records
            .query_all(RangeQuery::on_index(REQUEST_PARENT_DATE_INDEX, parentid).descending())
            .await?)
    }

    /// Records `request` and notifies the moderators of both branches.
    ///
    /// Notifications are written before the request row; an invalid
    /// notification aborts before either.
    #[instrument(skip(self, request), fields(parentid = %request.parentid, childid = %request.childid))]
    pub async fn record(
        &self,
        request: &SubBranchRequest,
    ) -> Result<Vec<Notification>, HierarchyError> {
        request.check_all()?;

        let (parent_mods, child_mods) = try_join(
            self.roster.find_by_branch(&request.parentid),
            self.roster.find_by_branch(&request.childid),
        )
        .await?;

        let data = serde_json::to_value(ChildBranchRequestData {
            childid: request.childid.clone(),
            parentid: request.parentid.clone(),
            username: request.creator.clone(),
        })
        .map_err(crate::store::StoreError::from)?;
        let event = Event {
            kind: NotificationKind::NewChildBranchRequest,
            data,
            date: request.date,
        };

        let sent = self
            .fanout
            .deliver(
                &event,
                parent_mods
                    .iter()
                    .chain(child_mods.iter())
                    .map(|m| m.username.as_str()),
            )
            .await?;

        self.records.put(request).await?;
        info!(notified = sent.len(), "subbranch request recorded");
        Ok(sent)
    }
}
