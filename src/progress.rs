//! Batch progress on stderr
//!
//! [`crate::job::BatchJob`] only talks to [`ProgressReporter`]; what ends up
//! on the terminal is picked by [`create_reporter`].

use std::sync::{Arc, RwLock};

/// Status of a single document being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Analyzing,
    Appending,
    /// Form and table rows appended for the document
    Done { rows: usize },
    Failed(String),
}

/// Phase of the overall batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPhase {
    ListingDocuments,
    ReadingHeader,
    ProcessingDocuments,
    Completed,
    Failed(String),
}

pub trait ProgressReporter: Send + Sync {
    fn set_phase(&self, phase: BatchPhase);

    /// Announce the documents of the run, before the first update.
    fn register_documents(&self, keys: Vec<String>);

    fn update_document(&self, key: &str, status: DocumentStatus);

    fn finish(&self);
}

impl<T: ProgressReporter + ?Sized> ProgressReporter for Arc<T> {
    fn set_phase(&self, phase: BatchPhase) {
        (**self).set_phase(phase)
    }

    fn register_documents(&self, keys: Vec<String>) {
        (**self).register_documents(keys)
    }

    fn update_document(&self, key: &str, status: DocumentStatus) {
        (**self).update_document(key, status)
    }

    fn finish(&self) {
        (**self).finish()
    }
}

/// Discards every report.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_phase(&self, _: BatchPhase) {}
    fn register_documents(&self, _: Vec<String>) {}
    fn update_document(&self, _: &str, _: DocumentStatus) {}
    fn finish(&self) {}
}

/// Tallies shared by both visible reporters.
#[derive(Debug)]
struct Tally {
    documents: usize,
    succeeded: usize,
    failed: usize,
    rows: usize,
    started: std::time::Instant,
}

impl Tally {
    fn start() -> RwLock<Self> {
        RwLock::new(Self {
            documents: 0,
            succeeded: 0,
            failed: 0,
            rows: 0,
            started: std::time::Instant::now(),
        })
    }

    fn record(&mut self, status: &DocumentStatus) {
        if let DocumentStatus::Done { rows } = status {
            self.succeeded += 1;
            self.rows += rows;
        } else if let DocumentStatus::Failed(_) = status {
            self.failed += 1;
        }
    }

    fn print(&self) {
        let rule = "─".repeat(40);
        eprintln!();
        eprintln!("{rule}");
        eprintln!(
            "   {} of {} documents appended, {} failed",
            self.succeeded, self.documents, self.failed
        );
        eprintln!(
            "   {} rows in {:.2}s",
            self.rows,
            self.started.elapsed().as_secs_f64()
        );
        eprintln!("{rule}");
    }
}

fn phase_message(phase: &BatchPhase) -> String {
    match phase {
        BatchPhase::ListingDocuments => "🔎 Listing PDFs...".into(),
        BatchPhase::ReadingHeader => "📋 Reading form header...".into(),
        BatchPhase::ProcessingDocuments => "📄 Extracting...".into(),
        BatchPhase::Completed => "✅ Done".into(),
        BatchPhase::Failed(e) => format!("❌ {e}"),
    }
}

/// One line per finished document on stderr, for logs and pipes.
pub struct LineReporter {
    tally: RwLock<Tally>,
}

impl Default for LineReporter {
    fn default() -> Self {
        Self {
            tally: Tally::start(),
        }
    }
}

impl ProgressReporter for LineReporter {
    fn set_phase(&self, phase: BatchPhase) {
        eprintln!("{}", phase_message(&phase));
    }

    fn register_documents(&self, keys: Vec<String>) {
        self.tally.write().unwrap().documents = keys.len();
        eprintln!("   {} PDFs to extract", keys.len());
    }

    fn update_document(&self, key: &str, status: DocumentStatus) {
        self.tally.write().unwrap().record(&status);
        match status {
            DocumentStatus::Done { rows } => eprintln!("   ✓ {key} ({rows} rows)"),
            DocumentStatus::Failed(ref e) => eprintln!("   ✗ {key}: {e}"),
            _ => {}
        }
    }

    fn finish(&self) {
        self.tally.read().unwrap().print();
    }
}

/// Spinner for the phase and the current document plus an overall bar.
pub struct BarReporter {
    multi: indicatif::MultiProgress,
    phase: indicatif::ProgressBar,
    current: indicatif::ProgressBar,
    overall: RwLock<Option<indicatif::ProgressBar>>,
    tally: RwLock<Tally>,
}

impl BarReporter {
    const TICK: std::time::Duration = std::time::Duration::from_millis(120);

    pub fn new() -> Self {
        let multi = indicatif::MultiProgress::new();
        let style = indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap();
        let phase = multi.add(indicatif::ProgressBar::new_spinner().with_style(style.clone()));
        phase.enable_steady_tick(Self::TICK);
        let current = multi.add(indicatif::ProgressBar::new_spinner().with_style(style));
        Self {
            multi,
            phase,
            current,
            overall: RwLock::new(None),
            tally: Tally::start(),
        }
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn status_label(status: &DocumentStatus) -> String {
    match status {
        DocumentStatus::Analyzing => "analyzing".into(),
        DocumentStatus::Appending => "appending".into(),
        DocumentStatus::Done { rows } => format!("{rows} rows"),
        DocumentStatus::Failed(e) => format!("failed: {e}"),
    }
}

impl ProgressReporter for BarReporter {
    fn set_phase(&self, phase: BatchPhase) {
        let terminal = matches!(phase, BatchPhase::Completed | BatchPhase::Failed(_));
        let message = phase_message(&phase);
        if terminal {
            self.phase.finish_with_message(message);
        } else {
            self.phase.set_message(message);
        }
    }

    fn register_documents(&self, keys: Vec<String>) {
        self.tally.write().unwrap().documents = keys.len();
        let bar = indicatif::ProgressBar::new(keys.len() as u64).with_style(
            indicatif::ProgressStyle::default_bar()
                .template("   [{bar:32.green/white}] {pos}/{len} PDFs, {elapsed}")
                .unwrap()
                .progress_chars("=> "),
        );
        *self.overall.write().unwrap() = Some(self.multi.add(bar));
    }

    fn update_document(&self, key: &str, status: DocumentStatus) {
        let label = status_label(&status);
        let finished = matches!(status, DocumentStatus::Done { .. } | DocumentStatus::Failed(_));
        if !finished {
            self.current.set_message(format!("{key}: {label}"));
            self.current.enable_steady_tick(Self::TICK);
            return;
        }
        self.tally.write().unwrap().record(&status);
        if let Some(bar) = self.overall.read().unwrap().as_ref() {
            bar.inc(1);
        }
        if let DocumentStatus::Failed(_) = status {
            self.multi.println(format!("   ✗ {key}: {label}")).ok();
        }
        self.current.disable_steady_tick();
        self.current.set_message("");
    }

    fn finish(&self) {
        self.current.finish_and_clear();
        if let Some(bar) = self.overall.read().unwrap().as_ref() {
            bar.finish_and_clear();
        }
        self.phase.finish_and_clear();
        self.tally.read().unwrap().print();
    }
}

/// Bars on an interactive stderr, plain lines otherwise or when `plain` is set.
pub fn create_reporter(plain: bool) -> Arc<dyn ProgressReporter> {
    if !plain && console::Term::stderr().is_term() {
        Arc::new(BarReporter::new())
    } else {
        Arc::new(LineReporter::default())
    }
}
