//! Job execution module
//!
//! The batch job walks every PDF under a prefix; the invoice job extracts a
//! single document through queries and a summary. Both are written against
//! the capability traits in [`client`].

mod batch;
pub mod client;
mod invoice;

pub use batch::{BatchJob, BatchSource, DocumentOutcome, RunReport};
pub use invoice::{
    DATE_ALIAS, InvoiceColumn, InvoiceJob, InvoiceSpec, default_columns, default_queries,
};

use crate::normalize::InvalidInput;

/// Error type for job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobError<SE, AE, WE> {
    #[error("objstore: {0}")]
    Store(SE),
    #[error("analyze: {0}")]
    Analyze(AE),
    #[error("invalid input: {0}")]
    InvalidInput(InvalidInput),
    #[error("append failed: {0}")]
    AppendFailed(WE),
    #[error("read header: {0}")]
    ReadHeader(WE),
}
