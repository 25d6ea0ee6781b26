use serde::{Deserialize, Serialize};

use crate::{model::DocumentReference, textract::RawResponse};

/// A question asked of the document, answered under `alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub alias: String,
}

impl Query {
    pub fn new(text: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alias: alias.into(),
        }
    }
}

/// A custom analysis model variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adapter {
    pub id: String,
    pub version: String,
}

pub trait Client {
    type Error;

    /// Analyze key/value pairs and tables.
    fn analyze_forms(
        &self,
        document: &DocumentReference,
    ) -> impl Future<Output = Result<RawResponse, Self::Error>> + Send;

    /// Answer `queries`, optionally through a custom adapter.
    fn analyze_queries(
        &self,
        document: &DocumentReference,
        queries: &[Query],
        adapter: Option<&Adapter>,
    ) -> impl Future<Output = Result<RawResponse, Self::Error>> + Send;
}
