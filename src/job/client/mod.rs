//! Capabilities the jobs are written against
//!
//! Each remote collaborator is reached through one narrow trait so the jobs
//! can run against the in-memory clients in `deploy::local`.

pub mod analyzer;
pub mod sheet;
pub mod store;
pub mod summary;
