//! Command-line interface for bid-matcher.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: Recommend a catalog product for each requirement
//! - **price**: Match and price a requirement list
//! - **run**: Select a tender from a listing, extract its scope, match and price it
//! - **catalog**: List, show, or export the product catalog
//! - **serve**: Start the HTTP API
//!
//! ## Usage
//!
//! ```text
//! # Match requirements against the embedded sample catalog
//! bid-matcher match requirements.json
//!
//! # Pipe requirements in and price them against CSV tables
//! cat requirements.json | bid-matcher price - --products products.csv --tests tests.csv
//!
//! # Full run over a tender listing
//! bid-matcher run --tenders listing.json --today 2025-10-13 --format json
//!
//! # Start the API
//! bid-matcher serve --port 8080
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::catalog::store::{
    CatalogSnapshot, CatalogStore, InMemoryCatalog, JsonFileCatalog, TableCatalog,
};
use crate::matching::engine::{MatchingConfig, ScoreThreshold};

pub mod catalog;
pub mod match_cmd;
pub mod price;
pub mod run;

#[derive(Parser)]
#[command(name = "bid-matcher")]
#[command(version)]
#[command(about = "Match tender requirements to catalog products and price the response")]
#[command(
    long_about = "bid-matcher turns the technical scope of a tender into a priced response.\n\nFor each requirement it recommends the catalog product with the most matching attributes, then prices it as:\n- the product's unit price\n- plus the test and compliance costs listed in the catalog"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a product for each requirement
    Match(match_cmd::MatchArgs),

    /// Match and price a requirement list
    Price(price::PriceArgs),

    /// Run the full pipeline over a tender listing
    Run(run::RunArgs),

    /// Inspect the product catalog
    Catalog(catalog::CatalogArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Path to custom catalog file served by the API
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Where to read the catalog from
#[derive(Args, Debug, Clone, Default)]
pub struct CatalogSource {
    /// Path to custom catalog file (JSON)
    #[arg(long, conflicts_with_all = ["products", "tests"])]
    pub catalog: Option<PathBuf>,

    /// Product table (CSV, or TSV with a .tsv extension)
    #[arg(long, requires = "tests")]
    pub products: Option<PathBuf>,

    /// Test cost table (CSV, or TSV with a .tsv extension)
    #[arg(long, requires = "products")]
    pub tests: Option<PathBuf>,
}

impl CatalogSource {
    /// A store for the selected catalog.
    ///
    /// File-backed stores are read lazily, so an unreadable file surfaces as
    /// a pricing failure rather than a CLI error.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded catalog cannot be loaded.
    pub fn store(&self) -> anyhow::Result<Box<dyn CatalogStore>> {
        Ok(match (&self.catalog, &self.products, &self.tests) {
            (Some(path), _, _) => Box::new(JsonFileCatalog::new(path)),
            (None, Some(products), Some(tests)) => Box::new(TableCatalog::new(
                products,
                tests,
                delimiter_for(products),
            )),
            _ => Box::new(InMemoryCatalog::new(CatalogSnapshot::load_embedded()?)),
        })
    }

    /// Load the selected catalog eagerly.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or is invalid.
    pub fn load(&self) -> anyhow::Result<Arc<CatalogSnapshot>> {
        Ok(self.store()?.snapshot()?)
    }
}

/// Score threshold options
#[derive(Args, Debug, Clone, Copy)]
pub struct MatchingArgs {
    /// Minimum match score (percent) for a product to be recommended
    #[arg(long, default_value = "0", value_parser = parse_percent)]
    pub min_score: f64,

    /// Recommend products scoring exactly --min-score
    #[arg(long)]
    pub inclusive: bool,
}

impl MatchingArgs {
    #[must_use]
    pub fn config(&self) -> MatchingConfig {
        let threshold = if self.inclusive {
            ScoreThreshold::AtLeast(self.min_score)
        } else {
            ScoreThreshold::Above(self.min_score)
        };
        MatchingConfig { threshold }
    }
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside 0-100"))
    }
}

/// Tab for `.tsv`/`.tab` files, comma otherwise
#[must_use]
pub fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => '\t',
        _ => ',',
    }
}

/// Read a file, or stdin when the path is `-`
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Truncate for fixed-width columns
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
