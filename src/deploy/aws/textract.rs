use aws_config::SdkConfig;
use aws_sdk_textract::{
    error::{BuildError, DisplayErrorContext},
    types::{
        Adapter as SdkAdapter, AdaptersConfig, Block, Document, FeatureType, QueriesConfig,
        Query as SdkQuery, S3Object,
    },
};
use tracing::debug;

use crate::{
    job::client::analyzer::{self, Adapter, Query},
    model::DocumentReference,
    textract::{RawBlock, RawQuery, RawRelationship, RawResponse},
};

pub struct Client {
    client: aws_sdk_textract::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to analyze {document}: {message}")]
    Analyze { document: String, message: String },
    #[error("Invalid analyze request: {0}")]
    Build(#[from] BuildError),
}

impl Client {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_textract::Client::new(config),
        }
    }
}

fn s3_document(reference: &DocumentReference) -> Document {
    Document::builder()
        .s3_object(
            S3Object::builder()
                .bucket(&reference.bucket)
                .name(&reference.key)
                .build(),
        )
        .build()
}

fn raw_block(block: &Block) -> RawBlock {
    RawBlock {
        id: block.id().unwrap_or_default().to_owned(),
        block_type: block
            .block_type()
            .map(|t| t.as_str().to_owned())
            .unwrap_or_default(),
        text: block.text().map(ToOwned::to_owned),
        entity_types: block
            .entity_types()
            .iter()
            .map(|t| t.as_str().to_owned())
            .collect(),
        relationships: block
            .relationships()
            .iter()
            .map(|rel| RawRelationship {
                kind: rel.r#type().map(|t| t.as_str().to_owned()).unwrap_or_default(),
                ids: rel.ids().to_vec(),
            })
            .collect(),
        row_index: block.row_index().and_then(|i| u32::try_from(i).ok()),
        column_index: block.column_index().and_then(|i| u32::try_from(i).ok()),
        selection_status: block.selection_status().map(|s| s.as_str().to_owned()),
        query: block.query().map(|q| RawQuery {
            text: q.text().to_owned(),
            alias: q.alias().map(ToOwned::to_owned),
        }),
    }
}

fn raw_response(blocks: Option<Vec<Block>>) -> RawResponse {
    RawResponse {
        blocks: blocks.map(|blocks| blocks.iter().map(raw_block).collect()),
    }
}

impl analyzer::Client for Client {
    type Error = Error;

    async fn analyze_forms(&self, document: &DocumentReference) -> Result<RawResponse, Self::Error> {
        let output = self
            .client
            .analyze_document()
            .document(s3_document(document))
            .feature_types(FeatureType::Tables)
            .feature_types(FeatureType::Forms)
            .send()
            .await
            .map_err(|error| Error::Analyze {
                document: document.to_string(),
                message: DisplayErrorContext(&error).to_string(),
            })?;
        debug!(%document, blocks = output.blocks.as_ref().map(Vec::len), "analyzed forms");
        Ok(raw_response(output.blocks))
    }

    async fn analyze_queries(
        &self,
        document: &DocumentReference,
        queries: &[Query],
        adapter: Option<&Adapter>,
    ) -> Result<RawResponse, Self::Error> {
        let queries = queries
            .iter()
            .map(|query| {
                SdkQuery::builder()
                    .text(&query.text)
                    .alias(&query.alias)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut request = self
            .client
            .analyze_document()
            .document(s3_document(document))
            .feature_types(FeatureType::Queries)
            .queries_config(QueriesConfig::builder().set_queries(Some(queries)).build()?);
        if let Some(adapter) = adapter {
            debug!(adapter = adapter.id, version = adapter.version, "using adapter");
            request = request.adapters_config(
                AdaptersConfig::builder()
                    .adapters(
                        SdkAdapter::builder()
                            .adapter_id(&adapter.id)
                            .version(&adapter.version)
                            .build()?,
                    )
                    .build()?,
            );
        }
        let output = request.send().await.map_err(|error| Error::Analyze {
            document: document.to_string(),
            message: DisplayErrorContext(&error).to_string(),
        })?;
        debug!(%document, blocks = output.blocks.as_ref().map(Vec::len), "analyzed queries");
        Ok(raw_response(output.blocks))
    }
}
