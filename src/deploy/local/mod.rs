//! In-memory clients
//!
//! Stand-ins for the remote services so jobs can run without network access.

pub mod analyzer;
pub mod sheet;
pub mod store;
pub mod summary;
