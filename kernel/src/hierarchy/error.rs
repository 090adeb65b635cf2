//! Hierarchy engine errors.

use crate::collaborators::{ContactError, ObjectStoreError};
use crate::model::Field;
use crate::store::StoreError;

/// Hierarchy-related errors.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The first offending field of a request.
    #[error("Invalid {field}")]
    Validation {
        /// Offending field.
        field: Field,
    },
    /// The entity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Keyed store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Contact sync failure.
    #[error(transparent)]
    Contacts(#[from] ContactError),
    /// Object storage failure.
    #[error(transparent)]
    Objects(#[from] ObjectStoreError),
    /// A step of a multi-step operation failed; earlier steps stay applied.
    #[error("Step '{step}' failed: {source}")]
    Step {
        /// Step name.
        step: &'static str,
        /// Cause.
        #[source]
        source: Box<HierarchyError>,
    },
}

impl HierarchyError {
    /// Wraps a validation failure.
    #[must_use]
    pub fn invalid(field: Field) -> Self {
        Self::Validation { field }
    }

    /// Whether the error is opaque to callers.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            Self::NotFound(_) | Self::Validation { .. } | Self::Conflict(_)
        )
    }
}

impl From<Field> for HierarchyError {
    fn from(field: Field) -> Self {
        Self::invalid(field)
    }
}
