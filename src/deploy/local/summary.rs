use crate::job::client::summary;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("summarization service unavailable")]
    Unavailable,
}

/// Replies with a fixed summary, or fails when none is set.
#[derive(Default)]
pub struct Client {
    reply: Option<String>,
    inputs: tokio::sync::Mutex<Vec<String>>,
}

impl Client {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Default::default()
    }

    /// Texts received so far.
    pub async fn inputs(&self) -> Vec<String> {
        self.inputs.lock().await.clone()
    }
}

impl summary::Client for Client {
    type Error = Error;

    async fn summarize(&self, text: &str) -> Result<String, Self::Error> {
        self.inputs.lock().await.push(text.to_owned());
        self.reply.clone().ok_or(Error::Unavailable)
    }
}
