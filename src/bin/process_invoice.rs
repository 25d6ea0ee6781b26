use anyhow::Context;
use clap::Parser;
use docsheet::{
    config::InvoiceOpts,
    deploy::aws::{s3, textract},
    job::InvoiceJob,
};
use tracing::{error, info};

async fn run(opts: InvoiceOpts) -> anyhow::Result<()> {
    let aws = opts.aws.load().await;
    let sheets = opts
        .sheets
        .client()
        .await
        .with_context(|| format!("load credentials from {}", opts.sheets.credentials.display()))?;
    let job = InvoiceJob {
        store: s3::Client::new(&aws),
        analyzer: textract::Client::new(&aws),
        sheets,
        summarizer: opts.summarizer().context("build summarizer")?,
    };
    let row = job
        .run(&opts.spec(), &opts.key)
        .await
        .with_context(|| format!("process {}", opts.key))?;
    info!(key = opts.key, ?row, "invoice processed");
    Ok(())
}

fn main() {
    let opts = InvoiceOpts::parse();
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
