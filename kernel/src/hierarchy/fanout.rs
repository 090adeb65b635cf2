//! Notification delivery to a set of moderators.

use futures_util::future::try_join_all;
use std::collections::HashSet;
use tracing::{debug, error};

use crate::hierarchy::error::HierarchyError;
use crate::model::{Notification, NotificationKind, Validate};
use crate::store::Records;

/// An event addressed to moderators.
#[derive(Debug, Clone)]
pub struct Event {
    /// Notification type.
    pub kind: NotificationKind,
    /// Structured payload; must be a JSON object.
    pub data: serde_json::Value,
    /// Event time in milliseconds.
    pub date: i64,
}

/// Writes one unread notification per distinct recipient.
#[derive(Clone)]
pub struct NotificationFanout {
    records: Records,
}

impl NotificationFanout {
    /// Creates a fan-out over `records`.
    #[must_use]
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    /// Delivers `event` to each distinct username in `recipients`.
    ///
    /// Every notification is validated before the first write; one invalid
    /// notification fails the whole delivery and nothing is written. Writes
    /// then run concurrently and the first failure fails the delivery.
    pub async fn deliver<I, S>(
        &self,
        event: &Event,
        recipients: I,
    ) -> Result<Vec<Notification>, HierarchyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let notifications: Vec<Notification> = recipients
            .into_iter()
            .filter(|user| seen.insert(user.as_ref().to_string()))
            .map(|user| Notification {
                id: Notification::id_for(user.as_ref(), event.date),
                user: user.as_ref().to_string(),
                date: event.date,
                kind: event.kind,
                data: event.data.clone(),
                unread: true,
            })
            .collect();

        for n in &notifications {
            if let Err(field) = n.check_all() {
                error!(user = %n.user, %field, "invalid notification, aborting delivery");
                return Err(HierarchyError::invalid(field));
            }
        }

        try_join_all(notifications.iter().map(|n| self.records.put(n))).await?;
        metrics::counter!("grove_notifications_sent_total").increment(notifications.len() as u64);
        debug!(count = notifications.len(), "notifications delivered");
        Ok(notifications)
    }
}
