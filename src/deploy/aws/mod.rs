//! AWS clients: S3 for listing documents, Textract for analyzing them

use aws_config::{BehaviorVersion, Region, SdkConfig};

pub mod s3;
pub mod textract;

/// Static credentials. When absent the default provider chain is used.
#[derive(derive_debug::Dbg, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    #[dbg(skip)]
    pub secret_access_key: String,
    #[dbg(skip)]
    pub session_token: Option<String>,
}

pub async fn load_config(region: &str, credentials: Option<StaticCredentials>) -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));
    let loader = match credentials {
        Some(credentials) => loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            credentials.session_token,
            None,
            "docsheet",
        )),
        None => loader,
    };
    loader.load().await
}
