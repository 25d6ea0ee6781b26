use anyhow::Context;
use clap::Parser;
use docsheet::{
    config::BatchOpts,
    deploy::aws::{s3, textract},
    job::BatchJob,
    progress::create_reporter,
};
use tracing::{error, info};

async fn run(opts: BatchOpts) -> anyhow::Result<()> {
    let aws = opts.aws.load().await;
    let sheets = opts
        .sheets
        .client()
        .await
        .with_context(|| format!("load credentials from {}", opts.sheets.credentials.display()))?;
    let job = BatchJob {
        store: s3::Client::new(&aws),
        analyzer: textract::Client::new(&aws),
        sheets,
        progress: create_reporter(opts.plain),
    };
    let report = job
        .run(&opts.source(), &opts.sheets.form_target(), &opts.table_target())
        .await
        .context("batch run")?;
    if !report.failed.is_empty() {
        info!(failed = ?report.failed, "some documents were skipped");
    }
    Ok(())
}

fn main() {
    let opts = BatchOpts::parse();
    docsheet::init_tracing();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(opts)) {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
