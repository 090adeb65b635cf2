//! External collaborators the hierarchy engine calls into.
//!
//! Only their call contracts matter to the engine; the implementations here
//! are the ones the binary wires up by default.

pub mod contacts;
pub mod objects;

pub use contacts::{ContactError, ContactSync, HttpContactSync, NoopContactSync};
pub use objects::{Bucket, LocalObjectStore, ObjectStore, ObjectStoreError};
