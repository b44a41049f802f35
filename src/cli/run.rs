use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Args;

use crate::cli::price::{ensure_completed, print_report};
use crate::cli::{CatalogSource, MatchingArgs, OutputFormat};
use crate::core::tender::{TenderCandidate, DUE_DATE_FORMAT};
use crate::pipeline::discovery::{
    DiscoveryError, DiscoveryWindow, JsonTenderSource, TenderSource, DEFAULT_WINDOW_DAYS,
};
use crate::pipeline::extraction::{
    default_requirements, RetryPolicy, RetryingExtractor, RuleBasedExtractor,
};
use crate::pipeline::orchestrator::Pipeline;

#[derive(Args)]
pub struct RunArgs {
    /// Tender listing (JSON array of {title, due_date, organization, source, document})
    #[arg(long, required = true)]
    pub tenders: PathBuf,

    /// Scope document for tenders whose listing carries none
    #[arg(long)]
    pub document: Option<PathBuf>,

    /// Reference date for the due-date window (YYYY-MM-DD, defaults to today in UTC)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,

    /// Accept tenders due within this many days
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: u32,

    /// Price the default two-cable requirement list when the scope yields nothing
    #[arg(long)]
    pub fallback: bool,

    #[command(flatten)]
    pub catalog: CatalogSource,

    #[command(flatten)]
    pub matching: MatchingArgs,
}

/// Execute run subcommand
///
/// # Errors
///
/// Returns an error if the document or catalog cannot be loaded, or if the run
/// halts before producing priced items (after printing the report).
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RunArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let document = args
        .document
        .as_ref()
        .map(std::fs::read_to_string)
        .transpose()?;
    let source = WithDocument {
        inner: JsonTenderSource::new(&args.tenders),
        document,
    };

    let window = match args.today {
        Some(today) => DiscoveryWindow::new(today, args.window_days),
        None => DiscoveryWindow::from_today(args.window_days),
    };
    if verbose {
        eprintln!(
            "Selecting tenders due after {} and by {}",
            window.today,
            window.cutoff()
        );
    }

    // Rule-based extraction is deterministic, so a single attempt suffices
    let single = RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::ZERO,
    };
    let mut extractor = RetryingExtractor::new(RuleBasedExtractor::new(), single);
    if args.fallback {
        extractor = extractor.with_fallback(default_requirements());
    }

    let store = args.catalog.store()?;
    let report = Pipeline::new(&source, &extractor, store.as_ref(), window)
        .with_matching_config(args.matching.config())
        .run();

    print_report(&report, format, verbose)?;
    ensure_completed(&report)
}

/// Fills in a scope document for candidates that have none
struct WithDocument<S> {
    inner: S,
    document: Option<String>,
}

impl<S: TenderSource> TenderSource for WithDocument<S> {
    fn discover(&self) -> Result<Vec<TenderCandidate>, DiscoveryError> {
        let mut candidates = self.inner.discover()?;
        if let Some(document) = &self.document {
            for candidate in &mut candidates {
                candidate.document.get_or_insert_with(|| document.clone());
            }
        }
        Ok(candidates)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DUE_DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
