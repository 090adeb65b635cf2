//! REST API for the Grove kernel.
//!
//! Authentication happens upstream; the authenticated username arrives in the
//! `x-username` header.

pub mod branches;

pub use branches::ApiError;
pub use branches::routes as branch_routes;

use axum::Router;

use crate::host::GroveHostState;

/// Every API route, bound to `state`.
pub fn router(state: GroveHostState) -> Router {
    branch_routes().with_state(state)
}
