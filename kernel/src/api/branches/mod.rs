//! REST API endpoints for the branch hierarchy.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::{ApiError, Caller};
pub use routes::routes;
pub use types::{
    CreateBranchRequest, RemovalResponse, SubbranchesQuery, UpdateBranchRequest,
};
