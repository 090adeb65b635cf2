//! API Handler implementations for the branch hierarchy.

use axum::{
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::api::branches::types::{
    CreateBranchRequest, RemovalResponse, SubbranchesQuery, UpdateBranchRequest,
};
use crate::hierarchy::{DescendantQuery, HierarchyError, NewBranch, SortKey};
use crate::host::GroveHostState;
use crate::model::{Branch, Mod, ModLogEntry, SubBranchRequest};

/// Header carrying the username authenticated upstream.
pub const USERNAME_HEADER: &str = "x-username";

/// API errors for branch operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Domain-level hierarchy error.
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
    /// Malformed request outside field validation.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// No authenticated user on the request.
    #[error("No authenticated user")]
    MissingUser,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Hierarchy(HierarchyError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("Not found: {what}"))
            }
            ApiError::Hierarchy(HierarchyError::Validation { field }) => {
                (StatusCode::BAD_REQUEST, format!("Invalid {field}"))
            }
            ApiError::Hierarchy(HierarchyError::Conflict(msg)) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::MissingUser => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Hierarchy(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Caller(v.to_string()))
            .ok_or(ApiError::MissingUser)
    }
}

/// POST /v1/branch
///
/// Create a branch owned by the caller.
pub async fn create_branch(
    State(state): State<GroveHostState>,
    Caller(username): Caller,
    Json(req): Json<CreateBranchRequest>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state
        .lifecycle()
        .create(NewBranch {
            id: req.id,
            name: req.name,
            creator: username,
            parentid: req.parentid,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// GET /v1/branch/{id}
pub async fn get_branch(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.lifecycle().get(&id).await?))
}

/// PUT /v1/branch/{id}
///
/// Update name, description, or rules.
pub async fn update_branch(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBranchRequest>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.lifecycle().update(&id, req.into()).await?))
}

/// DELETE /v1/branch/{id}
///
/// Delete a tree root, or detach a child branch with its subtree.
pub async fn delete_branch(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
) -> Result<Json<RemovalResponse>, ApiError> {
    let removal = state.lifecycle().detach_or_delete(&id).await?;
    Ok(Json(removal.into()))
}

/// GET /v1/branch/{id}/subbranches?timeafter=&sortBy=&lastBranchId=
pub async fn list_subbranches(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
    Query(query): Query<SubbranchesQuery>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    let after = query
        .timeafter
        .ok_or_else(|| ApiError::BadRequest("Missing timeafter".into()))?;
    let sort = match query.sort_by.as_deref() {
        Some(s) => s
            .parse::<SortKey>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => SortKey::Date,
    };

    let branches = state
        .lifecycle()
        .list_descendants(&DescendantQuery {
            tag: id,
            after,
            sort,
            cursor: query.last_branch_id,
        })
        .await?;
    Ok(Json(branches))
}

/// GET /v1/branch/{id}/requests/subbranches
pub async fn list_subbranch_requests(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SubBranchRequest>>, ApiError> {
    Ok(Json(state.lifecycle().ledger().find_by_branch(&id).await?))
}

/// GET /v1/branch/{id}/modlog
pub async fn list_mod_log(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ModLogEntry>>, ApiError> {
    Ok(Json(state.lifecycle().list_mod_log(&id).await?))
}

/// GET /v1/branch/{id}/mods
pub async fn list_mods(
    State(state): State<GroveHostState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Mod>>, ApiError> {
    Ok(Json(state.lifecycle().roster().find_by_branch(&id).await?))
}
