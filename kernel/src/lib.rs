//! Grove Kernel - branch hierarchy engine for a forum of nested communities.
//!
//! Branches form a forest that changes shape over time: a branch may be
//! proposed under another, detached back to independence with its subtree,
//! or deleted. The crate keeps a transitive-closure tag index consistent
//! through those changes using only point and range lookups on a keyed store.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// HTTP surface over the hierarchy operations.
pub mod api;
/// Object storage and contact sync collaborators.
pub mod collaborators;
/// Tag index, moderator roster, notifications, and branch lifecycle.
pub mod hierarchy;
/// Host state wiring the store and engine together.
pub mod host;
/// Infrastructure components (config, server, telemetry, audit).
pub mod infrastructure;
/// Typed records and field validation.
pub mod model;
/// Keyed store over `SQLite` and its query policy.
pub mod store;
