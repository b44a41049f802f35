use std::path::PathBuf;

use clap::Args;

use crate::catalog::store::CatalogSnapshot;
use crate::cli::{read_input, truncate, CatalogSource, MatchingArgs, OutputFormat};
use crate::core::requirement::RequirementSet;
use crate::matching::engine::{Candidate, MatchResult, Matcher};

#[derive(Args)]
pub struct MatchArgs {
    /// Requirements file (JSON array of attribute objects)
    /// Use '-' for stdin
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogSource,

    #[command(flatten)]
    pub matching: MatchingArgs,

    /// Also show the N best-scoring alternatives per requirement
    #[arg(short = 'n', long, default_value = "0")]
    pub alternatives: usize,
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the requirements or the catalog cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let requirements = RequirementSet::from_json(&read_input(&args.input)?)?;
    let catalog = args.catalog.load()?;

    if verbose {
        eprintln!(
            "Matching {} requirements against {} products",
            requirements.len(),
            catalog.len()
        );
    }
    if catalog.is_empty() {
        eprintln!("Warning: Catalog is empty, no products to match against.");
    }

    let matcher = Matcher::with_config(catalog.products(), args.matching.config());
    let rows: Vec<(MatchResult, Vec<Candidate>)> = requirements
        .iter()
        .map(|r| (matcher.match_one(r), matcher.rank(r, args.alternatives)))
        .collect();

    match format {
        OutputFormat::Text => print_text(&rows, &catalog),
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = rows
                .iter()
                .map(|(m, alternatives)| {
                    let mut json = serde_json::json!({
                        "item_label": m.item_label,
                        "recommended_sku": m.recommended_sku,
                        "match_score": m.match_score,
                        "matched_fields": m.matched_fields,
                        "total_fields": m.total_fields,
                        "quality": m.quality().to_string(),
                    });
                    if !alternatives.is_empty() {
                        json["alternatives"] = serde_json::json!(alternatives);
                    }
                    json
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("item_label\trecommended_sku\tmatch_score\tmatched_fields\ttotal_fields");
            for (m, _) in &rows {
                println!(
                    "{}\t{}\t{:.1}\t{}\t{}",
                    m.item_label,
                    m.recommended_sku.as_ref().map_or("", |s| s.as_str()),
                    m.match_score,
                    m.matched_fields,
                    m.total_fields
                );
            }
        }
    }

    Ok(())
}

fn print_text(rows: &[(MatchResult, Vec<Candidate>)], catalog: &CatalogSnapshot) {
    let sku_width = rows
        .iter()
        .filter_map(|(m, _)| m.recommended_sku.as_ref().map(|s| s.as_str().len()))
        .max()
        .unwrap_or(3)
        .max(3);

    println!("Match Results ({} requirements)\n", rows.len());
    println!(
        "{:<8} {:<sku_w$} {:<30} {:>7}  Quality",
        "Item",
        "SKU",
        "Product",
        "Score",
        sku_w = sku_width
    );
    println!("{}", "-".repeat(sku_width + 58));

    for (m, alternatives) in rows {
        let (sku, name) = match &m.recommended_sku {
            Some(sku) => (
                sku.as_str(),
                catalog.get(sku).map_or("", |p| p.display_name()),
            ),
            None => ("-", ""),
        };
        println!(
            "{:<8} {:<sku_w$} {:<30} {:>6.1}%  {} ({}/{})",
            m.item_label,
            sku,
            truncate(name, 30),
            m.match_score,
            m.quality(),
            m.matched_fields,
            m.total_fields,
            sku_w = sku_width
        );
        for alt in alternatives {
            println!(
                "  └─ {} {:.1}% ({}/{})",
                alt.sku, alt.match_score, alt.score.matched, alt.score.total
            );
        }
    }
}
