//! Branch hierarchy engine.
//!
//! [`BranchLifecycle`] is the entry point for structural changes. It composes
//! the [`TagIndex`], [`ModRoster`], [`NotificationFanout`],
//! [`SubbranchRequestLedger`], and [`Counters`] over one [`crate::store::Records`].

pub mod counters;
pub mod error;
pub mod fanout;
pub mod ledger;
pub mod lifecycle;
pub mod listing;
pub mod roster;
pub mod tags;

pub use counters::Counters;
pub use error::HierarchyError;
pub use fanout::{Event, NotificationFanout};
pub use ledger::SubbranchRequestLedger;
pub use lifecycle::{BranchLifecycle, BranchPatch, DeletionReport, NewBranch, Removal};
pub use listing::{DescendantQuery, SortKey, UnknownSortKey};
pub use roster::ModRoster;
pub use tags::{DetachReport, TagIndex};
