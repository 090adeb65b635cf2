//! REST API routes for the branch hierarchy.

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::branches::handlers::{
    create_branch, delete_branch, get_branch, list_mod_log, list_mods, list_subbranch_requests,
    list_subbranches, update_branch,
};
use crate::host::GroveHostState;

/// API routes for the branch hierarchy, mounted at `/v1/branch`.
pub fn routes() -> Router<GroveHostState> {
    Router::new()
        .route("/v1/branch", post(create_branch))
        .route(
            "/v1/branch/{id}",
            get(get_branch).put(update_branch).delete(delete_branch),
        )
        .route("/v1/branch/{id}/subbranches", get(list_subbranches))
        .route(
            "/v1/branch/{id}/requests/subbranches",
            get(list_subbranch_requests),
        )
        .route("/v1/branch/{id}/modlog", get(list_mod_log))
        .route("/v1/branch/{id}/mods", get(list_mods))
}
