//! Single invoice extraction through queries and a summary

use tracing::{debug, info, warn};

use crate::{
    model::{NormalizedFormRow, SheetTarget},
    normalize::{normalize_date, normalize_queries},
};

use super::{
    JobError,
    client::{
        analyzer::{self, Adapter, Query},
        sheet, store, summary,
    },
};

/// Alias whose answer is rewritten as `YYYY/MM/DD`.
pub const DATE_ALIAS: &str = "Date";

pub fn default_queries() -> Vec<Query> {
    vec![
        Query::new("Title", "Title"),
        Query::new("Date", DATE_ALIAS),
        Query::new("Volume/Issue Number", "VolumeIssueNumber"),
    ]
}

/// One cell of the appended row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceColumn {
    /// Answer of the query with this alias
    Query(String),
    /// The generated summary
    Summary,
}

pub fn default_columns() -> Vec<InvoiceColumn> {
    vec![
        InvoiceColumn::Query("Title".into()),
        InvoiceColumn::Query(DATE_ALIAS.into()),
        InvoiceColumn::Summary,
        InvoiceColumn::Query("VolumeIssueNumber".into()),
    ]
}

#[derive(Debug, Clone)]
pub struct InvoiceSpec {
    pub bucket: String,
    pub queries: Vec<Query>,
    pub adapter: Option<Adapter>,
    pub columns: Vec<InvoiceColumn>,
    pub date_alias: Option<String>,
    pub form_tab: SheetTarget,
}

impl InvoiceSpec {
    pub fn new(bucket: impl Into<String>, form_tab: SheetTarget) -> Self {
        Self {
            bucket: bucket.into(),
            queries: default_queries(),
            adapter: None,
            columns: default_columns(),
            date_alias: Some(DATE_ALIAS.into()),
            form_tab,
        }
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.alias.as_str()).collect()
    }
}

fn render_row(columns: &[InvoiceColumn], fields: &NormalizedFormRow, summary: &str) -> Vec<String> {
    columns
        .iter()
        .map(|column| match column {
            InvoiceColumn::Query(alias) => fields.get(alias).unwrap_or_default().to_owned(),
            InvoiceColumn::Summary => summary.to_owned(),
        })
        .collect()
}

/// Invoice job over a document store, an analyzer, a spreadsheet and a summarizer.
pub struct InvoiceJob<S, A, W, M> {
    pub store: S,
    pub analyzer: A,
    pub sheets: W,
    pub summarizer: M,
}

impl<S: store::Client, A: analyzer::Client, W: sheet::Client, M: summary::Client>
    InvoiceJob<S, A, W, M>
where
    M::Error: std::fmt::Display,
{
    async fn summarize(&self, key: &str, text: &str) -> String {
        if text.trim().is_empty() {
            debug!(key, "nothing to summarize");
            return String::new();
        }
        match self.summarizer.summarize(text).await {
            Ok(summary) => summary,
            Err(error) => {
                warn!(key, %error, "summarization failed, appending without summary");
                String::new()
            }
        }
    }

    /// Extract `key` and append one row to the form tab.
    ///
    /// Returns the appended row. A failed summary leaves its column empty;
    /// every other failure aborts the document.
    pub async fn run(
        &self,
        spec: &InvoiceSpec,
        key: &str,
    ) -> Result<Vec<String>, JobError<S::Error, A::Error, W::Error>> {
        let document = self
            .store
            .fetch(&spec.bucket, key)
            .await
            .map_err(JobError::Store)?;
        info!(%document, "analyzing document");
        let analysis = self
            .analyzer
            .analyze_queries(&document, &spec.queries, spec.adapter.as_ref())
            .await
            .map_err(JobError::Analyze)?
            .into_analysis()
            .map_err(JobError::InvalidInput)?;

        let mut fields = normalize_queries(&analysis, &spec.aliases());
        if let Some(date) = spec
            .date_alias
            .as_ref()
            .and_then(|alias| fields.0.get_mut(alias))
        {
            *date = normalize_date(date);
        }

        let text = analysis.full_text();
        let text = if text.trim().is_empty() {
            fields.render_text()
        } else {
            text
        };
        let summary = self.summarize(key, &text).await;

        let row = render_row(&spec.columns, &fields, &summary);
        self.sheets
            .append(&spec.form_tab, std::slice::from_ref(&row))
            .await
            .map_err(JobError::AppendFailed)?;
        info!(key, tab = spec.form_tab.tab, "row appended");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_row_places_summary() {
        let fields = [("Title", "Quarterly"), ("Date", "2024/03/05")]
            .into_iter()
            .collect::<NormalizedFormRow>();
        assert_eq!(
            render_row(&default_columns(), &fields, "A short report."),
            vec!["Quarterly", "2024/03/05", "A short report.", ""]
        );
    }
}
