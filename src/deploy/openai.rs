//! Summaries through the OpenAI chat completions API

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::job::client::summary;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const SYSTEM_PROMPT: &str = "You are a concise summarizer.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("summarization failed. status: {code}, message: {message}")]
    Fail {
        code: reqwest::StatusCode,
        message: String,
    },
    #[error("empty completion")]
    EmptyCompletion,
}

#[derive(derive_debug::Dbg)]
pub struct Client {
    #[dbg(skip)]
    api_key: String,
    model: String,
    max_tokens: u32,
    url: Url,
    #[dbg(skip)]
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl Client {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            url: ENDPOINT.parse()?,
            client: reqwest::Client::new(),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl summary::Client for Client {
    type Error = Error;

    async fn summarize(&self, text: &str) -> Result<String, Self::Error> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&Request {
                model: &self.model,
                messages: [
                    Message {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    Message {
                        role: "user",
                        content: text,
                    },
                ],
                max_tokens: self.max_tokens,
            })
            .send()
            .await
            .map_err(Error::Transport)?;
        let code = response.status();
        let body = response.text().await.map_err(Error::Transport)?;
        trace!(body, "completion response");
        if !code.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|response| response.error.message)
                .unwrap_or(body);
            return Err(Error::Fail { code, message });
        }
        let response = serde_json::from_str::<Response>(&body).map_err(|error| Error::Fail {
            code,
            message: error.to_string(),
        })?;
        let summary = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(Error::EmptyCompletion)?;
        debug!(model = self.model, chars = summary.len(), "summarized document");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(Request {
            model: DEFAULT_MODEL,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: "Invoice 123",
                },
            ],
            max_tokens: DEFAULT_MAX_TOKENS,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You are a concise summarizer."},
                    {"role": "user", "content": "Invoice 123"}
                ],
                "max_tokens": 150
            })
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = Client::new("sk-secret", DEFAULT_MODEL).unwrap();
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
