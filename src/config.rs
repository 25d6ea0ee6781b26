//! Command line and environment configuration
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it.

use std::path::PathBuf;

use clap::{Args, Parser};
use tracing::debug;

use crate::{
    deploy::{
        aws::{self, StaticCredentials},
        google::{
            auth::{self, TokenSource},
            sheets,
        },
        openai,
    },
    job::{
        BatchSource, InvoiceSpec,
        client::analyzer::Adapter,
    },
    model::SheetTarget,
};

#[derive(Args, derive_debug::Dbg, Clone)]
pub struct AwsOpts {
    #[clap(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,
    #[clap(long, env = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<String>,
    #[dbg(skip)]
    #[clap(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,
    #[dbg(skip)]
    #[clap(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,
}

impl AwsOpts {
    pub fn credentials(&self) -> Option<StaticCredentials> {
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: self.aws_session_token.clone(),
            }),
            _ => None,
        }
    }

    pub async fn load(&self) -> aws_config::SdkConfig {
        aws::load_config(&self.region, self.credentials()).await
    }
}

#[derive(Args, Debug, Clone)]
pub struct SheetOpts {
    #[clap(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: String,
    /// Service account key file
    #[clap(long, env = "GOOGLE_SHEETS_KEYFILE", default_value = "credentials.json")]
    pub credentials: PathBuf,
    #[clap(long, env = "FORM_TAB", default_value = "Form Data")]
    pub form_tab: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SheetSetupError {
    #[error("{0}")]
    Auth(auth::Error),
    #[error("invalid Sheets endpoint: {0}")]
    Url(url::ParseError),
}

impl SheetOpts {
    pub fn form_target(&self) -> SheetTarget {
        SheetTarget::new(&self.spreadsheet_id, &self.form_tab)
    }

    pub async fn client(&self) -> Result<sheets::Client, SheetSetupError> {
        let auth = TokenSource::from_file(&self.credentials, sheets::SCOPE)
            .await
            .map_err(SheetSetupError::Auth)?;
        debug!(
            account = auth.client_email(),
            spreadsheet = self.spreadsheet_id,
            "loaded service account"
        );
        sheets::Client::new(auth).map_err(SheetSetupError::Url)
    }
}

/// Append form fields and table rows of every PDF under a prefix.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct BatchOpts {
    #[clap(long, env = "S3_BUCKET")]
    pub bucket: String,
    #[clap(long, env = "S3_PREFIX", default_value = "")]
    pub prefix: String,
    #[clap(long, env = "TABLE_TAB", default_value = "Table Data")]
    pub table_tab: String,
    /// Print one line per document instead of progress bars
    #[clap(long)]
    pub plain: bool,
    #[clap(flatten)]
    pub aws: AwsOpts,
    #[clap(flatten)]
    pub sheets: SheetOpts,
}

impl BatchOpts {
    pub fn source(&self) -> BatchSource {
        BatchSource {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
        }
    }

    pub fn table_target(&self) -> SheetTarget {
        SheetTarget::new(&self.sheets.spreadsheet_id, &self.table_tab)
    }
}

/// Extract one invoice through queries, summarize it and append one row.
#[derive(Parser, derive_debug::Dbg)]
#[clap(version)]
pub struct InvoiceOpts {
    /// Object key of the PDF
    pub key: String,
    #[clap(long, env = "S3_BUCKET")]
    pub bucket: String,
    #[dbg(skip)]
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,
    #[clap(long, env = "OPENAI_MODEL", default_value = openai::DEFAULT_MODEL)]
    pub model: String,
    /// Upper bound on the summary length
    #[clap(long, env = "OPENAI_MAX_TOKENS", default_value_t = openai::DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    #[clap(long, env = "TEXTRACT_ADAPTER_ID")]
    pub adapter_id: Option<String>,
    #[clap(long, env = "TEXTRACT_ADAPTER_VERSION", default_value = "1")]
    pub adapter_version: String,
    #[clap(flatten)]
    pub aws: AwsOpts,
    #[clap(flatten)]
    pub sheets: SheetOpts,
}

impl InvoiceOpts {
    pub fn adapter(&self) -> Option<Adapter> {
        self.adapter_id.as_ref().map(|id| Adapter {
            id: id.clone(),
            version: self.adapter_version.clone(),
        })
    }

    pub fn spec(&self) -> InvoiceSpec {
        InvoiceSpec {
            adapter: self.adapter(),
            ..InvoiceSpec::new(&self.bucket, self.sheets.form_target())
        }
    }

    pub fn summarizer(&self) -> Result<openai::Client, url::ParseError> {
        Ok(openai::Client::new(&self.openai_api_key, &self.model)?.with_max_tokens(self.max_tokens))
    }
}
