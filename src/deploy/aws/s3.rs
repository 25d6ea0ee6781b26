use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use crate::{
    job::client::store::{self, is_pdf},
    model::DocumentReference,
};

pub struct Client {
    client: aws_sdk_s3::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to list objects in {bucket}: {message}")]
    List { bucket: String, message: String },
    #[error("Failed to head object s3://{bucket}/{key}: {message}")]
    Head {
        bucket: String,
        key: String,
        message: String,
    },
}

impl Client {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

impl store::Client for Client {
    type Error = Error;

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<DocumentReference>, Self::Error> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();
        let mut documents = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|error| Error::List {
                bucket: bucket.to_owned(),
                message: DisplayErrorContext(&error).to_string(),
            })?;
            let keys = page.contents().iter().filter_map(|object| object.key());
            for key in keys {
                if is_pdf(key) {
                    documents.push(DocumentReference::new(bucket, key));
                } else {
                    debug!(key, "skip non-PDF object");
                }
            }
        }
        Ok(documents)
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<DocumentReference, Self::Error> {
        self.client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| Error::Head {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                message: DisplayErrorContext(&error).to_string(),
            })?;
        Ok(DocumentReference::new(bucket, key))
    }
}
