//! Host state shared by the HTTP surface and the binary.

pub mod state;

pub use state::GroveHostState;
