use crate::{
    job::client::store::{self, is_pdf},
    model::DocumentReference,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no such object: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("bucket unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
pub struct Client {
    objects: Vec<DocumentReference>,
    unavailable: bool,
}

impl Client {
    pub fn new<K: Into<String>>(bucket: &str, keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            objects: keys
                .into_iter()
                .map(|key| DocumentReference::new(bucket, key))
                .collect(),
            unavailable: false,
        }
    }

    /// A store whose every request fails.
    pub fn unavailable() -> Self {
        Self {
            objects: Vec::new(),
            unavailable: true,
        }
    }
}

impl store::Client for Client {
    type Error = Error;

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<DocumentReference>, Self::Error> {
        if self.unavailable {
            return Err(Error::Unavailable(bucket.to_owned()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|object| {
                object.bucket == bucket && object.key.starts_with(prefix) && is_pdf(&object.key)
            })
            .cloned()
            .collect())
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<DocumentReference, Self::Error> {
        if self.unavailable {
            return Err(Error::Unavailable(bucket.to_owned()));
        }
        self.objects
            .iter()
            .find(|object| object.bucket == bucket && object.key == key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
    }
}
