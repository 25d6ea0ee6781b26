use std::collections::HashMap;

use crate::{
    job::client::analyzer::{self, Adapter, Query},
    model::DocumentReference,
    textract::RawResponse,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no analysis prepared for {0}")]
    UnknownDocument(String),
}

/// One analyze call as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub key: String,
    pub queries: Vec<Query>,
    pub adapter: Option<Adapter>,
}

/// Answers each document key with a prepared response.
#[derive(Default)]
pub struct Client {
    responses: HashMap<String, RawResponse>,
    requests: tokio::sync::Mutex<Vec<Request>>,
}

impl Client {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_response(mut self, key: impl Into<String>, response: RawResponse) -> Self {
        self.responses.insert(key.into(), response);
        self
    }

    /// Prepare a response from an `AnalyzeDocument` JSON body.
    pub fn with_json(self, key: impl Into<String>, json: &str) -> Result<Self, serde_json::Error> {
        Ok(self.with_response(key, serde_json::from_str(json)?))
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }

    async fn answer(
        &self,
        document: &DocumentReference,
        queries: &[Query],
        adapter: Option<&Adapter>,
    ) -> Result<RawResponse, Error> {
        self.requests.lock().await.push(Request {
            key: document.key.clone(),
            queries: queries.to_vec(),
            adapter: adapter.cloned(),
        });
        self.responses
            .get(&document.key)
            .cloned()
            .ok_or_else(|| Error::UnknownDocument(document.key.clone()))
    }
}

impl analyzer::Client for Client {
    type Error = Error;

    async fn analyze_forms(&self, document: &DocumentReference) -> Result<RawResponse, Self::Error> {
        self.answer(document, &[], None).await
    }

    async fn analyze_queries(
        &self,
        document: &DocumentReference,
        queries: &[Query],
        adapter: Option<&Adapter>,
    ) -> Result<RawResponse, Self::Error> {
        self.answer(document, queries, adapter).await
    }
}
