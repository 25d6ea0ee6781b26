use crate::{
    deploy::local,
    job::{BatchJob, BatchSource, InvoiceJob, InvoiceSpec, JobError, client::analyzer::Adapter},
    model::SheetTarget,
    progress::NullReporter,
};

const BUCKET: &str = "scans";
const INVOICE: &str = "invoices/invoice.pdf";
const RECEIPT: &str = "invoices/receipt.pdf";

async fn fixture(name: &str) -> String {
    tokio::fs::read_to_string(format!("src/tests/fixtures/{name}"))
        .await
        .unwrap()
}

fn form_tab() -> SheetTarget {
    SheetTarget::new("sheet-1", "Form Data")
}

fn table_tab() -> SheetTarget {
    SheetTarget::new("sheet-1", "Table Data")
}

fn source() -> BatchSource {
    BatchSource {
        bucket: BUCKET.into(),
        prefix: "invoices/".into(),
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

async fn form_analyzer() -> local::analyzer::Client {
    local::analyzer::Client::new()
        .with_json(INVOICE, &fixture("invoice_form.json").await)
        .unwrap()
        .with_json(RECEIPT, &fixture("receipt_form.json").await)
        .unwrap()
}

fn batch_job(
    analyzer: local::analyzer::Client,
    sheets: local::sheet::Client,
) -> BatchJob<local::store::Client, local::analyzer::Client, local::sheet::Client, NullReporter> {
    BatchJob {
        store: local::store::Client::new(
            BUCKET,
            [INVOICE, "invoices/notes.txt", RECEIPT, "archive/old.pdf"],
        ),
        analyzer,
        sheets,
        progress: NullReporter,
    }
}

#[tokio::test]
async fn test_batch_appends_forms_and_tables() {
    let job = batch_job(form_analyzer().await, local::sheet::Client::new());
    let report = job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.form_rows, 2);
    assert_eq!(report.table_rows, 1);
    assert!(report.failed.is_empty());
    assert_eq!(report.unlabeled_columns, vec!["Vendor".to_owned()]);

    assert_eq!(
        job.sheets.rows(&form_tab()).await,
        vec![
            row(&["Invoice No", "Total"]),
            row(&["INV-001", "$10.00"]),
            row(&["", "$5.00", "Acme"]),
        ]
    );
    assert_eq!(
        job.sheets.rows(&table_tab()).await,
        vec![row(&[INVOICE, "Widget", "10.00"])]
    );
}

#[tokio::test]
async fn test_batch_follows_existing_header() {
    let sheets = local::sheet::Client::new().with_rows(&form_tab(), vec![row(&["Total", "Invoice No"])]);
    let job = batch_job(form_analyzer().await, sheets);
    let report = job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    assert_eq!(report.unlabeled_columns, vec!["Vendor".to_owned()]);
    assert_eq!(
        job.sheets.rows(&form_tab()).await,
        vec![
            row(&["Total", "Invoice No"]),
            row(&["$10.00", "INV-001"]),
            row(&["$5.00", "", "Acme"]),
        ]
    );
}

#[tokio::test]
async fn test_batch_header_covering_all_keys_leaves_nothing_unlabeled() {
    let sheets = local::sheet::Client::new().with_rows(
        &form_tab(),
        vec![row(&["Vendor", "Invoice No", "Total"])],
    );
    let job = batch_job(form_analyzer().await, sheets);
    let report = job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    assert!(report.unlabeled_columns.is_empty());
    assert_eq!(
        job.sheets.rows(&form_tab()).await[1..],
        [row(&["", "INV-001", "$10.00"]), row(&["Acme", "", "$5.00"])]
    );
}

#[tokio::test]
async fn test_batch_rerun_duplicates_rows() {
    let job = batch_job(form_analyzer().await, local::sheet::Client::new());
    job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    let first = job.sheets.rows(&form_tab()).await;
    job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    let second = job.sheets.rows(&form_tab()).await;

    assert_eq!(second.len(), first.len() + 2);
    assert_eq!(second[0], first[0]);
    assert_eq!(&second[first.len()..], &first[1..]);
    assert_eq!(job.sheets.rows(&table_tab()).await.len(), 2);
}

#[tokio::test]
async fn test_batch_continues_after_failed_append() {
    let job = batch_job(
        form_analyzer().await,
        local::sheet::Client::new().rejecting("INV-001"),
    );
    let report = job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    assert_eq!(report.failed, vec![INVOICE.to_owned()]);
    assert_eq!(report.processed, 1);
    // the header went out with the receipt and already names every column
    assert!(report.unlabeled_columns.is_empty());

    let form = job.sheets.rows(&form_tab()).await;
    assert_eq!(form.len(), 2);
    assert_eq!(form[1].last().map(String::as_str), Some("Acme"));
    assert!(job.sheets.rows(&table_tab()).await.is_empty());
}

#[tokio::test]
async fn test_batch_skips_empty_and_malformed_documents() {
    let analyzer = local::analyzer::Client::new()
        .with_json(INVOICE, r#"{"Blocks": []}"#)
        .unwrap()
        .with_json(RECEIPT, r#"{"DocumentMetadata": {"Pages": 1}}"#)
        .unwrap();
    let job = batch_job(analyzer, local::sheet::Client::new());
    let report = job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.form_rows, 0);
    assert_eq!(report.failed, vec![RECEIPT.to_owned()]);
    assert!(job.sheets.rows(&form_tab()).await.is_empty());
    assert!(job.sheets.rows(&table_tab()).await.is_empty());
}

#[tokio::test]
async fn test_batch_only_analyzes_pdfs_under_prefix() {
    let job = batch_job(form_analyzer().await, local::sheet::Client::new());
    job.run(&source(), &form_tab(), &table_tab()).await.unwrap();
    let analyzed = job
        .analyzer
        .requests()
        .await
        .into_iter()
        .map(|request| request.key)
        .collect::<Vec<_>>();
    assert_eq!(analyzed, vec![INVOICE.to_owned(), RECEIPT.to_owned()]);
}

#[tokio::test]
async fn test_batch_listing_failure_is_fatal() {
    let job = BatchJob {
        store: local::store::Client::unavailable(),
        analyzer: form_analyzer().await,
        sheets: local::sheet::Client::new(),
        progress: NullReporter,
    };
    let result = job.run(&source(), &form_tab(), &table_tab()).await;
    assert!(matches!(result, Err(JobError::Store(_))));
    assert!(job.analyzer.requests().await.is_empty());
}

#[tokio::test]
async fn test_batch_header_failure_is_fatal() {
    let job = batch_job(form_analyzer().await, local::sheet::Client::new().unauthorized());
    let result = job.run(&source(), &form_tab(), &table_tab()).await;
    assert!(matches!(result, Err(JobError::ReadHeader(_))));
}

async fn invoice_job(
    summarizer: local::summary::Client,
    sheets: local::sheet::Client,
) -> InvoiceJob<local::store::Client, local::analyzer::Client, local::sheet::Client, local::summary::Client>
{
    InvoiceJob {
        store: local::store::Client::new(BUCKET, [INVOICE]),
        analyzer: local::analyzer::Client::new()
            .with_json(INVOICE, &fixture("invoice_queries.json").await)
            .unwrap(),
        sheets,
        summarizer,
    }
}

#[tokio::test]
async fn test_invoice_appends_one_row() {
    let job = invoice_job(
        local::summary::Client::replying("A quarterly report."),
        local::sheet::Client::new(),
    )
    .await;
    let spec = InvoiceSpec {
        adapter: Some(Adapter {
            id: "abc123".into(),
            version: "1".into(),
        }),
        ..InvoiceSpec::new(BUCKET, form_tab())
    };
    let appended = job.run(&spec, INVOICE).await.unwrap();

    let expected = row(&["Quarterly Report", "2024/03/05", "A quarterly report.", "Vol. 3"]);
    assert_eq!(appended, expected);
    assert_eq!(job.sheets.rows(&form_tab()).await, vec![expected]);

    let requests = job.analyzer.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].queries, spec.queries);
    assert_eq!(requests[0].adapter, spec.adapter);
    assert_eq!(
        job.summarizer.inputs().await,
        vec!["Quarterly Report\nVol. 3, issued March 5, 2024".to_owned()]
    );
}

#[tokio::test]
async fn test_invoice_summary_failure_leaves_column_empty() {
    let job = invoice_job(local::summary::Client::failing(), local::sheet::Client::new()).await;
    let appended = job.run(&InvoiceSpec::new(BUCKET, form_tab()), INVOICE).await.unwrap();
    assert_eq!(appended, row(&["Quarterly Report", "2024/03/05", "", "Vol. 3"]));
    assert_eq!(job.sheets.rows(&form_tab()).await.len(), 1);
}

#[tokio::test]
async fn test_invoice_without_lines_summarizes_fields() {
    let job = InvoiceJob {
        store: local::store::Client::new(BUCKET, [INVOICE]),
        analyzer: local::analyzer::Client::new()
            .with_json(
                INVOICE,
                r#"{"Blocks": [
                    {"Id": "q1", "BlockType": "QUERY", "Query": {"Text": "Title", "Alias": "Title"},
                     "Relationships": [{"Type": "ANSWER", "Ids": ["a1"]}]},
                    {"Id": "a1", "BlockType": "QUERY_RESULT", "Text": "Spring issue"}
                ]}"#,
            )
            .unwrap(),
        sheets: local::sheet::Client::new(),
        summarizer: local::summary::Client::replying("Spring."),
    };
    let appended = job.run(&InvoiceSpec::new(BUCKET, form_tab()), INVOICE).await.unwrap();
    assert_eq!(appended, row(&["Spring issue", "", "Spring.", ""]));
    assert_eq!(
        job.summarizer.inputs().await,
        vec!["Title: Spring issue\nDate: \nVolumeIssueNumber: ".to_owned()]
    );
}

#[tokio::test]
async fn test_invoice_unknown_key() {
    let job = invoice_job(local::summary::Client::replying("-"), local::sheet::Client::new()).await;
    let result = job
        .run(&InvoiceSpec::new(BUCKET, form_tab()), "invoices/missing.pdf")
        .await;
    assert!(matches!(result, Err(JobError::Store(_))));
    assert!(job.sheets.rows(&form_tab()).await.is_empty());
}

#[tokio::test]
async fn test_invoice_missing_blocks_is_invalid_input() {
    let job = InvoiceJob {
        store: local::store::Client::new(BUCKET, [INVOICE]),
        analyzer: local::analyzer::Client::new()
            .with_json(INVOICE, r#"{"DocumentMetadata": {"Pages": 1}}"#)
            .unwrap(),
        sheets: local::sheet::Client::new(),
        summarizer: local::summary::Client::replying("-"),
    };
    let result = job.run(&InvoiceSpec::new(BUCKET, form_tab()), INVOICE).await;
    assert!(matches!(result, Err(JobError::InvalidInput(_))));
    assert!(job.summarizer.inputs().await.is_empty());
}

#[tokio::test]
async fn test_invoice_append_failure() {
    let job = invoice_job(
        local::summary::Client::replying("A quarterly report."),
        local::sheet::Client::new().rejecting("Vol. 3"),
    )
    .await;
    let result = job.run(&InvoiceSpec::new(BUCKET, form_tab()), INVOICE).await;
    assert!(matches!(result, Err(JobError::AppendFailed(_))));
}
