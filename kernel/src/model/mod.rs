//! Typed records stored by the hierarchy engine.

pub mod branch;
pub mod image;
pub mod moderation;
pub mod notification;
pub mod request;
pub mod tag;
pub mod user;
pub mod validate;

pub use branch::{BRANCHES, Branch, PARENT_DATE_INDEX};
pub use image::{BRANCH_IMAGES, BranchImage, ImageKind};
pub use moderation::{MOD_LOG, MODS, Mod, ModLogEntry};
pub use notification::{
    ChildBranchRequestData, NOTIFICATIONS, Notification, NotificationKind, USER_DATE_INDEX,
};
pub use request::{REQUEST_PARENT_DATE_INDEX, SUBBRANCH_REQUESTS, SubBranchRequest};
pub use tag::{TAG_BRANCH_INDEX, TAGS, Tag};
pub use user::{BRANCH_COUNT, CONSTANTS, Constant, USERS, User};
pub use validate::{Field, Validate};

use crate::store::TableDef;

/// Sentinel parent and universal tag of every tree.
pub const ROOT: &str = "root";

/// Every table the engine declares, for migrations.
pub const ALL_TABLES: [&TableDef; 9] = [
    &BRANCHES,
    &TAGS,
    &MODS,
    &MOD_LOG,
    &SUBBRANCH_REQUESTS,
    &NOTIFICATIONS,
    &USERS,
    &CONSTANTS,
    &BRANCH_IMAGES,
];
