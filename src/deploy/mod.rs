//! Concrete clients for the job capabilities

pub mod aws;
pub mod google;
pub mod local;
pub mod openai;
