//! Request/Response Types for the Branch API

use serde::{Deserialize, Serialize};

use crate::hierarchy::{BranchPatch, Removal};

/// Body of `POST /v1/branch`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBranchRequest {
    /// Requested slug.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Requested parent, or `root`.
    pub parentid: String,
}

/// Body of `PUT /v1/branch/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBranchRequest {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New rules.
    pub rules: Option<String>,
}

/// Empty strings count as absent.
impl From<UpdateBranchRequest> for BranchPatch {
    fn from(req: UpdateBranchRequest) -> Self {
        let supplied = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            name: supplied(req.name),
            description: supplied(req.description),
            rules: supplied(req.rules),
        }
    }
}

/// Query of `GET /v1/branch/{id}/subbranches`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubbranchesQuery {
    /// Lower bound on creation time, in milliseconds. Required.
    pub timeafter: Option<i64>,
    /// Ranking attribute; `date` when absent.
    pub sort_by: Option<String>,
    /// Resume after this branch.
    pub last_branch_id: Option<String>,
}

/// Response of `DELETE /v1/branch/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemovalResponse {
    /// The branch was a tree root and is gone.
    Deleted {
        /// Former children, now tree roots.
        reparented: Vec<String>,
    },
    /// The branch now heads its own tree.
    Detached {
        /// Former strict ancestors.
        former_ancestors: Vec<String>,
    },
}

impl From<Removal> for RemovalResponse {
    fn from(removal: Removal) -> Self {
        match removal {
            Removal::Deleted(report) => Self::Deleted {
                reparented: report.reparented,
            },
            Removal::Detached(report) => Self::Detached {
                former_ancestors: report.removed,
            },
        }
    }
}
