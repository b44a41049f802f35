use std::path::PathBuf;

use clap::Args;

use crate::cli::{read_input, CatalogSource, MatchingArgs, OutputFormat};
use crate::pipeline::orchestrator::{run_pricing_json, PipelineReport};
use crate::pricing::calculator::PricingCalculator;

#[derive(Args)]
pub struct PriceArgs {
    /// Requirements file (JSON array of attribute objects)
    /// Use '-' for stdin
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogSource,

    #[command(flatten)]
    pub matching: MatchingArgs,
}

/// Execute price subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read, or if the run halts before
/// producing priced items (after printing the report).
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: PriceArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;
    let store = args.catalog.store()?;

    let report = run_pricing_json(
        &input,
        store.as_ref(),
        args.matching.config(),
        &PricingCalculator::new(),
    );
    print_report(&report, format, verbose)?;
    ensure_completed(&report)
}

/// Render a pipeline report in the requested format
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_report(
    report: &PipelineReport,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if let Some(tender) = &report.tender {
                println!("Tender:   {}", tender.title);
                println!("Due:      {}", tender.due_date);
                if let Some(org) = &tender.organization {
                    println!("Issuer:   {org}");
                }
                println!();
            }
            println!("Status: {}", report.status);
            if verbose {
                if let Some(reason) = &report.reason {
                    println!("Reason: {reason}");
                }
            }
            if report.items.is_empty() {
                return Ok(());
            }

            println!(
                "\n{:<8} {:<20} {:>7} {:>12} {:>12} {:>12}",
                "Item", "SKU", "Score", "Unit Price", "Test Cost", "Total"
            );
            println!("{}", "-".repeat(76));
            for item in &report.items {
                println!(
                    "{:<8} {:<20} {:>6.1}% {:>12.2} {:>12.2} {:>12.2}",
                    item.item_label,
                    item.recommended_sku.as_ref().map_or("-", |s| s.as_str()),
                    item.match_score,
                    item.unit_price,
                    item.test_cost,
                    item.total_cost
                );
            }
            println!("{}", "-".repeat(76));
            println!("{:<63} {:>12.2}", "Grand total", report.grand_total());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Tsv => {
            println!("item_label\trecommended_sku\tmatch_score\tunit_price\ttest_cost\ttotal_cost");
            for item in &report.items {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    item.item_label,
                    item.recommended_sku.as_ref().map_or("", |s| s.as_str()),
                    item.match_score,
                    item.unit_price,
                    item.test_cost,
                    item.total_cost
                );
            }
        }
    }
    Ok(())
}

/// Turn a halted report into a process error
///
/// # Errors
///
/// Returns an error naming the status unless the run completed.
pub fn ensure_completed(report: &PipelineReport) -> anyhow::Result<()> {
    if report.status.is_completed() {
        return Ok(());
    }
    match &report.reason {
        Some(reason) => anyhow::bail!("Run halted with status {}: {reason}", report.status),
        None => anyhow::bail!("Run halted with status {}", report.status),
    }
}
