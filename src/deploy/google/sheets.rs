use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use super::auth::{self, TokenSource};
use crate::{job::client::sheet, model::SheetTarget};

pub const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authorization: {0}")]
    Auth(auth::Error),
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("invalid request url: {0}")]
    Url(url::ParseError),
    #[error("request to {target} failed. status: {code}, message: {message}")]
    Fail {
        target: SheetTarget,
        code: reqwest::StatusCode,
        message: String,
    },
}

pub struct Client {
    auth: TokenSource,
    client: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest<'a> {
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<UpdateSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSummary {
    updated_range: Option<String>,
    updated_rows: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Client {
    pub fn new(auth: TokenSource) -> Result<Self, url::ParseError> {
        Ok(Self {
            auth,
            client: reqwest::Client::new(),
            base: API_BASE.parse()?,
        })
    }

    fn values_url(&self, target: &SheetTarget, range: &str, suffix: &str) -> Result<Url, Error> {
        self.base
            .join(&format!(
                "{}/values/{}{suffix}",
                urlencoding::encode(&target.spreadsheet_id),
                urlencoding::encode(range),
            ))
            .map_err(Error::Url)
    }

    async fn check(
        target: &SheetTarget,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Error> {
        let code = response.status();
        if code.is_success() {
            return Ok(response);
        }
        let body = response.text().await.map_err(Error::Transport)?;
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|response| response.error.message)
            .unwrap_or(body);
        Err(Error::Fail {
            target: target.clone(),
            code,
            message,
        })
    }
}

impl sheet::Client for Client {
    type Error = Error;

    async fn header(&self, target: &SheetTarget) -> Result<Vec<String>, Self::Error> {
        let url = self.values_url(target, &target.header_range(), "")?;
        let token = self.auth.token().await.map_err(Error::Auth)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(Error::Transport)?;
        let range = Self::check(target, response)
            .await?
            .json::<ValueRange>()
            .await
            .map_err(Error::Transport)?;
        let header = range
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(cell_text)
            .collect::<Vec<_>>();
        trace!(%target, ?header, "read header row");
        Ok(header)
    }

    async fn append(&self, target: &SheetTarget, rows: &[Vec<String>]) -> Result<(), Self::Error> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = self.values_url(target, &format!("{}!A1", target.range()), ":append")?;
        let token = self.auth.token().await.map_err(Error::Auth)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&AppendRequest {
                major_dimension: "ROWS",
                values: rows,
            })
            .send()
            .await
            .map_err(Error::Transport)?;
        let response = Self::check(target, response)
            .await?
            .json::<AppendResponse>()
            .await
            .map_err(Error::Transport)?;
        let updates = response.updates;
        debug!(
            %target,
            rows = rows.len(),
            updated_range = ?updates.as_ref().and_then(|u| u.updated_range.clone()),
            updated_rows = ?updates.as_ref().and_then(|u| u.updated_rows),
            "appended rows"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(serde_json::json!("Total")), "Total");
        assert_eq!(cell_text(serde_json::json!(42)), "42");
        assert_eq!(cell_text(serde_json::Value::Null), "");
    }

    #[test]
    fn test_append_request_shape() {
        let rows = vec![vec!["a".to_owned(), "".to_owned()]];
        let body = serde_json::to_value(AppendRequest {
            major_dimension: "ROWS",
            values: &rows,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"majorDimension": "ROWS", "values": [["a", ""]]})
        );
    }
}
