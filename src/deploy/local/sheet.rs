use indexmap::IndexMap;

use crate::{job::client::sheet, model::SheetTarget};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("append to {target} rejected: row contains {value:?}")]
    Rejected { target: SheetTarget, value: String },
    #[error("unauthorized")]
    Unauthorized,
}

/// Spreadsheet tabs held in memory.
#[derive(Default)]
pub struct Client {
    tabs: tokio::sync::Mutex<IndexMap<SheetTarget, Vec<Vec<String>>>>,
    reject: Option<String>,
    unauthorized: bool,
}

impl Client {
    pub fn new() -> Self {
        Default::default()
    }

    /// Fail every append carrying a cell equal to `value`.
    pub fn rejecting(mut self, value: impl Into<String>) -> Self {
        self.reject = Some(value.into());
        self
    }

    /// Fail every request.
    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    pub fn with_rows(mut self, target: &SheetTarget, rows: Vec<Vec<String>>) -> Self {
        self.tabs.get_mut().insert(target.clone(), rows);
        self
    }

    pub async fn rows(&self, target: &SheetTarget) -> Vec<Vec<String>> {
        self.tabs
            .lock()
            .await
            .get(target)
            .cloned()
            .unwrap_or_default()
    }
}

impl sheet::Client for Client {
    type Error = Error;

    async fn header(&self, target: &SheetTarget) -> Result<Vec<String>, Self::Error> {
        if self.unauthorized {
            return Err(Error::Unauthorized);
        }
        Ok(self
            .tabs
            .lock()
            .await
            .get(target)
            .and_then(|rows| rows.first())
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, target: &SheetTarget, rows: &[Vec<String>]) -> Result<(), Self::Error> {
        if self.unauthorized {
            return Err(Error::Unauthorized);
        }
        if let Some(value) = &self.reject {
            if rows.iter().flatten().any(|cell| cell == value) {
                return Err(Error::Rejected {
                    target: target.clone(),
                    value: value.clone(),
                });
            }
        }
        self.tabs
            .lock()
            .await
            .entry(target.clone())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }
}
