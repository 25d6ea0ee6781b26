//! Google Sheets access through a service account

pub mod auth;
pub mod sheets;
