//! OAuth2 service-account flow
//!
//! A JWT signed with the account's private key is exchanged for a bearer
//! token, which is reused until shortly before it expires.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

/// The JSON key file of a service account.
#[derive(Deserialize, derive_debug::Dbg, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    #[dbg(skip)]
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read service account key: {0}")]
    ReadKey(std::io::Error),
    #[error("Failed to parse service account key: {0}")]
    ParseKey(serde_json::Error),
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(jsonwebtoken::errors::Error),
    #[error("Failed to sign assertion: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("token request rejected. status: {code}, body: {body}")]
    Rejected {
        code: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>) -> Result<Self, Error> {
        let encoding_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(Error::InvalidPrivateKey)?;
        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        })
    }

    pub async fn from_file(path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self, Error> {
        let key = tokio::fs::read_to_string(path)
            .await
            .map_err(Error::ReadKey)?;
        let key = serde_json::from_str::<ServiceAccountKey>(&key).map_err(Error::ParseKey)?;
        Self::new(key, scope)
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A bearer token valid for at least another minute.
    pub async fn token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached
            .as_ref()
            .filter(|token| token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now)
        {
            return Ok(token.token.clone());
        }

        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(Error::Sign)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(Error::Transport)?;
        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rejected { code, body });
        }
        let response = response
            .json::<TokenResponse>()
            .await
            .map_err(Error::Transport)?;
        let lifetime = Duration::seconds(response.expires_in.unwrap_or(TOKEN_LIFETIME_SECS));
        debug!(
            account = self.key.client_email,
            expires_in = lifetime.num_seconds(),
            "obtained access token"
        );
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: now + lifetime,
        });
        Ok(response.access_token)
    }
}
