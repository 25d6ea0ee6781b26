//! Batch extraction of every PDF under a prefix

use tracing::{debug, error, info, warn};

use crate::{
    model::{DocumentReference, SheetTarget},
    normalize::{FormLayout, normalize},
    progress::{BatchPhase, DocumentStatus, ProgressReporter},
};

use super::{
    JobError,
    client::{analyzer, sheet, store},
};

/// Where the batch job reads documents from.
#[derive(Debug, Clone)]
pub struct BatchSource {
    pub bucket: String,
    pub prefix: String,
}

/// Rows appended for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub form_rows: usize,
    pub table_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub form_rows: usize,
    pub table_rows: usize,
    /// Keys of the documents that failed, in processing order.
    pub failed: Vec<String>,
    /// Form columns appended to the right of the header row. Their cells
    /// carry values but no label.
    pub unlabeled_columns: Vec<String>,
}

struct FormState {
    layout: FormLayout,
    header_written: bool,
}

/// Batch job over a document store, an analyzer and a spreadsheet.
pub struct BatchJob<S, A, W, P> {
    pub store: S,
    pub analyzer: A,
    pub sheets: W,
    pub progress: P,
}

impl<S: store::Client, A: analyzer::Client, W: sheet::Client, P: ProgressReporter>
    BatchJob<S, A, W, P>
{
    async fn process(
        &self,
        document: &DocumentReference,
        state: &mut FormState,
        unlabeled: &mut Vec<String>,
        form_tab: &SheetTarget,
        table_tab: &SheetTarget,
    ) -> Result<DocumentOutcome, JobError<S::Error, A::Error, W::Error>> {
        self.progress
            .update_document(&document.key, DocumentStatus::Analyzing);
        let analysis = self
            .analyzer
            .analyze_forms(document)
            .await
            .map_err(JobError::Analyze)?
            .into_analysis()
            .map_err(JobError::InvalidInput)?;
        let normalized = normalize(&analysis);
        debug!(
            key = document.key,
            fields = normalized.form.len(),
            table_rows = normalized.tables.len(),
            "normalized document"
        );

        self.progress
            .update_document(&document.key, DocumentStatus::Appending);
        let mut outcome = DocumentOutcome::default();
        if !normalized.form.is_empty() {
            let added = state.layout.extend(&normalized.form);
            if state.header_written && !added.is_empty() {
                warn!(
                    key = document.key,
                    columns = ?added,
                    first_column = state.layout.columns().len() - added.len() + 1,
                    "form columns missing from header row, appending them unlabeled"
                );
                unlabeled.extend(added);
            }
            let mut rows = Vec::with_capacity(2);
            if !state.header_written {
                rows.push(state.layout.columns().to_vec());
            }
            rows.push(state.layout.render(&normalized.form));
            self.sheets
                .append(form_tab, &rows)
                .await
                .map_err(JobError::AppendFailed)?;
            state.header_written = true;
            outcome.form_rows = 1;
        }

        let table_rows = normalized
            .tables
            .into_iter()
            .map(|cells| std::iter::once(document.key.clone()).chain(cells).collect())
            .collect::<Vec<Vec<String>>>();
        if !table_rows.is_empty() {
            self.sheets
                .append(table_tab, &table_rows)
                .await
                .map_err(JobError::AppendFailed)?;
            outcome.table_rows = table_rows.len();
        }
        Ok(outcome)
    }

    /// Process every document under `source`.
    ///
    /// A failing document is logged and counted; the run goes on with the
    /// next one. Only listing the documents and reading the form header are
    /// fatal.
    pub async fn run(
        &self,
        source: &BatchSource,
        form_tab: &SheetTarget,
        table_tab: &SheetTarget,
    ) -> Result<RunReport, JobError<S::Error, A::Error, W::Error>>
    where
        S::Error: std::error::Error,
        A::Error: std::error::Error,
        W::Error: std::error::Error,
    {
        self.progress.set_phase(BatchPhase::ListingDocuments);
        let documents = self
            .store
            .list(&source.bucket, &source.prefix)
            .await
            .map_err(JobError::Store)
            .inspect_err(|error| {
                error!(%error, bucket = source.bucket, prefix = source.prefix, "failed to list documents");
                self.progress.set_phase(BatchPhase::Failed(error.to_string()));
            })?;
        info!(count = documents.len(), bucket = source.bucket, "listed documents");

        self.progress.set_phase(BatchPhase::ReadingHeader);
        let header = self
            .sheets
            .header(form_tab)
            .await
            .map_err(JobError::ReadHeader)
            .inspect_err(|error| {
                error!(%error, tab = form_tab.tab, "failed to read form header");
                self.progress.set_phase(BatchPhase::Failed(error.to_string()));
            })?;
        let mut state = FormState {
            header_written: !header.is_empty(),
            layout: FormLayout::from_header(header),
        };

        self.progress.set_phase(BatchPhase::ProcessingDocuments);
        self.progress
            .register_documents(documents.iter().map(|d| d.key.clone()).collect());
        let mut report = RunReport::default();
        for document in &documents {
            info!(key = document.key, "processing document");
            match self
                .process(document, &mut state, &mut report.unlabeled_columns, form_tab, table_tab)
                .await
            {
                Ok(outcome) => {
                    report.processed += 1;
                    report.form_rows += outcome.form_rows;
                    report.table_rows += outcome.table_rows;
                    self.progress.update_document(
                        &document.key,
                        DocumentStatus::Done {
                            rows: outcome.form_rows + outcome.table_rows,
                        },
                    );
                }
                Err(error) => {
                    error!(key = document.key, %error, "failed to process document");
                    self.progress
                        .update_document(&document.key, DocumentStatus::Failed(error.to_string()));
                    report.failed.push(document.key.clone());
                }
            }
        }
        if !report.unlabeled_columns.is_empty() {
            info!(
                tab = form_tab.tab,
                columns = ?report.unlabeled_columns,
                "header row does not label these columns, add them by hand"
            );
        }
        self.progress.set_phase(BatchPhase::Completed);
        self.progress.finish();
        info!(
            processed = report.processed,
            failed = report.failed.len(),
            form_rows = report.form_rows,
            table_rows = report.table_rows,
            "batch finished"
        );
        Ok(report)
    }
}
