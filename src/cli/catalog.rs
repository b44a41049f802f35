use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::cli::{truncate, CatalogSource, OutputFormat};
use crate::core::product::Product;
use crate::core::types::Sku;
use crate::pricing::policy::aggregate_test_cost;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List all products in the catalog
    List {
        #[command(flatten)]
        catalog: CatalogSource,

        /// Filter by attribute, e.g. "ConductorMaterial=Copper"
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<(String, String)>,
    },

    /// Show details of a specific product
    Show {
        /// Product SKU
        #[arg(required = true)]
        sku: String,

        #[command(flatten)]
        catalog: CatalogSource,
    },

    /// List test and compliance costs
    Tests {
        #[command(flatten)]
        catalog: CatalogSource,
    },

    /// Export the catalog to a JSON file
    Export {
        /// Output file path
        #[arg(required = true)]
        output: PathBuf,

        #[command(flatten)]
        catalog: CatalogSource,
    },
}

/// Execute catalog subcommand
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the SKU is unknown, or
/// the export cannot be written.
pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        CatalogCommands::List { catalog, filter } => run_list(&catalog, &filter, format, verbose),
        CatalogCommands::Show { sku, catalog } => run_show(&sku, &catalog, format),
        CatalogCommands::Tests { catalog } => run_tests(&catalog, format),
        CatalogCommands::Export { output, catalog } => run_export(&output, &catalog),
    }
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn matches_filter(product: &Product, filter: &[(String, String)]) -> bool {
    filter
        .iter()
        .all(|(key, value)| product.attribute(key).trim().eq_ignore_ascii_case(value))
}

fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"))
}

fn run_list(
    source: &CatalogSource,
    filter: &[(String, String)],
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let catalog = source.load()?;

    if verbose {
        eprintln!(
            "Loaded catalog with {} products and {} tests",
            catalog.len(),
            catalog.tests().len()
        );
    }

    let filtered: Vec<&Product> = catalog
        .products()
        .iter()
        .filter(|p| matches_filter(p, filter))
        .collect();

    // Union of attribute names, for stable TSV columns
    let attribute_names: Vec<&str> = filtered
        .iter()
        .flat_map(|p| p.attributes.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    match format {
        OutputFormat::Text => {
            let sku_width = filtered
                .iter()
                .map(|p| p.sku.as_str().len())
                .max()
                .unwrap_or(3)
                .max(3);
            let name_width = filtered
                .iter()
                .map(|p| p.display_name().len().min(35))
                .max()
                .unwrap_or(4)
                .max(4);
            let total_width = sku_width + name_width + 12 + 2;

            println!("Product Catalog ({} products)\n", filtered.len());
            println!(
                "{:<sku_w$} {:<name_w$} {:>12}",
                "SKU",
                "Name",
                "Unit Price",
                sku_w = sku_width,
                name_w = name_width
            );
            println!("{}", "-".repeat(total_width));

            for p in &filtered {
                println!(
                    "{:<sku_w$} {:<name_w$} {:>12}",
                    p.sku,
                    truncate(p.display_name(), name_width),
                    format_price(p.unit_price),
                    sku_w = sku_width,
                    name_w = name_width
                );
                if verbose {
                    let attrs: Vec<String> = p
                        .attributes
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    println!("  └─ {}", attrs.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
        OutputFormat::Tsv => {
            let mut header = vec!["sku", "name", "unit_price"];
            header.extend(attribute_names.iter().copied());
            println!("{}", header.join("\t"));
            for p in &filtered {
                let mut row = vec![
                    p.sku.to_string(),
                    p.name.clone().unwrap_or_default(),
                    p.unit_price.map(|v| v.to_string()).unwrap_or_default(),
                ];
                row.extend(attribute_names.iter().map(|k| p.attribute(k).to_string()));
                println!("{}", row.join("\t"));
            }
        }
    }

    Ok(())
}

fn run_show(sku: &str, source: &CatalogSource, format: OutputFormat) -> anyhow::Result<()> {
    let catalog = source.load()?;
    let product = catalog
        .get(&Sku::new(sku))
        .ok_or_else(|| anyhow::anyhow!("Product '{}' not found", sku))?;

    match format {
        OutputFormat::Text => {
            println!("Product: {}\n", product.display_name());
            println!("SKU:        {}", product.sku);
            println!("Unit Price: {}", format_price(product.unit_price));
            println!("\nAttributes:");
            for (key, value) in &product.attributes {
                println!("  {key:<20} {value}");
            }
            println!(
                "\nTest cost per item: {:.2}",
                aggregate_test_cost(catalog.tests())
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(product)?);
        }
        OutputFormat::Tsv => {
            println!("attribute\tvalue");
            for (key, value) in &product.attributes {
                println!("{key}\t{value}");
            }
        }
    }

    Ok(())
}

fn run_tests(source: &CatalogSource, format: OutputFormat) -> anyhow::Result<()> {
    let catalog = source.load()?;
    let tests = catalog.tests();

    match format {
        OutputFormat::Text => {
            println!("Tests ({})\n", tests.len());
            println!("{:<35} {:>12}", "Name", "Cost");
            println!("{}", "-".repeat(48));
            for t in tests {
                println!("{:<35} {:>12.2}", truncate(&t.name, 35), t.cost);
            }
            println!("{}", "-".repeat(48));
            println!("{:<35} {:>12.2}", "Total", aggregate_test_cost(tests));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tests)?);
        }
        OutputFormat::Tsv => {
            println!("name\tcost");
            for t in tests {
                println!("{}\t{}", t.name, t.cost);
            }
        }
    }

    Ok(())
}

fn run_export(output: &Path, source: &CatalogSource) -> anyhow::Result<()> {
    let catalog = source.load()?;

    let json = catalog.to_json()?;
    std::fs::write(output, json)?;

    println!(
        "Exported {} products and {} tests to {}",
        catalog.len(),
        catalog.tests().len(),
        output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("ConductorMaterial = Copper").unwrap(),
            ("ConductorMaterial".to_string(), "Copper".to_string())
        );
        assert!(parse_filter("Copper").is_err());
    }

    #[test]
    fn test_matches_filter() {
        let product = Product::new("A", Some(1.0)).with_attribute("ConductorMaterial", " Copper ");
        let copper = vec![("ConductorMaterial".to_string(), "copper".to_string())];
        let aluminium = vec![("ConductorMaterial".to_string(), "Aluminium".to_string())];
        assert!(matches_filter(&product, &copper));
        assert!(!matches_filter(&product, &aluminium));
        assert!(matches_filter(&product, &[]));
    }
}
