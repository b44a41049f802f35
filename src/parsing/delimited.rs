use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::core::product::{Product, TestItem};
use crate::utils::validation::{check_row_limit, parse_amount};

/// Column holding the product key
pub const SKU_COLUMN: &str = "SKU";
/// Optional display-name column
pub const NAME_COLUMN: &str = "ProductName";
/// Column holding the unit price; may be absent from a product table
pub const UNIT_PRICE_COLUMN: &str = "UnitPrice";
/// Test table key column
pub const TEST_NAME_COLUMN: &str = "TestName";
/// Test table cost column
pub const TEST_COST_COLUMN: &str = "TestCost";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table format: {0}")]
    InvalidFormat(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Too many rows: {0} exceeds maximum allowed (100000)")]
    TooManyRows(usize),
}

/// Products parsed from a delimited table
#[derive(Debug, Clone)]
pub struct ProductTable {
    pub products: Vec<Product>,
    /// Whether the header carried a `UnitPrice` column at all
    pub has_price_column: bool,
}

/// Parse a product table file (CSV or TSV)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_product_file(path: &Path, delimiter: char) -> Result<ProductTable, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_product_text(&content, delimiter)
}

/// Parse a product table with a header row.
///
/// `SKU` is required. `UnitPrice` and `ProductName` are optional; every other
/// column becomes a product attribute. Blank cells are treated as absent
/// attributes. Fields may be double-quoted to hold the delimiter.
///
/// # Errors
///
/// Returns `ParseError::MissingColumn` if there is no `SKU` column,
/// `ParseError::InvalidFormat` for ragged rows, unbalanced quotes, blank SKUs
/// or bad prices, and `ParseError::TooManyRows` if the row limit is exceeded.
pub fn parse_product_text(text: &str, delimiter: char) -> Result<ProductTable, ParseError> {
    let mut rows = data_rows(text, delimiter);
    let Some((_, header)) = rows.next().transpose()? else {
        return Err(ParseError::InvalidFormat("Empty product table".to_string()));
    };
    let columns = column_positions(&header);

    let sku_col = *columns
        .get(SKU_COLUMN)
        .ok_or(ParseError::MissingColumn(SKU_COLUMN))?;
    let price_col = columns.get(UNIT_PRICE_COLUMN).copied();
    let name_col = columns.get(NAME_COLUMN).copied();

    let mut products = Vec::new();
    for row in rows {
        let (line_num, fields) = row?;
        if fields.len() != header.len() {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has {} fields, expected {}",
                fields.len(),
                header.len()
            )));
        }

        let sku = fields[sku_col].as_str();
        if sku.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has an empty {SKU_COLUMN}"
            )));
        }

        let unit_price = match price_col {
            Some(col) => parse_amount(&fields[col]).map_err(|bad| {
                ParseError::InvalidFormat(format!("Invalid price on line {line_num}: '{bad}'"))
            })?,
            None => None,
        };

        let mut product = Product::new(sku, unit_price);
        for (col, name) in header.iter().enumerate() {
            if col == sku_col || Some(col) == price_col {
                continue;
            }
            let value = &fields[col];
            if value.is_empty() {
                continue;
            }
            if Some(col) == name_col {
                product.name = Some(value.clone());
            } else {
                product.attributes.insert(name.clone(), value.clone());
            }
        }

        if check_row_limit(products.len()).is_some() {
            return Err(ParseError::TooManyRows(products.len()));
        }
        products.push(product);
    }

    Ok(ProductTable {
        products,
        has_price_column: price_col.is_some(),
    })
}

/// Parse a test table file (CSV or TSV)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_test_file(path: &Path, delimiter: char) -> Result<Vec<TestItem>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_test_text(&content, delimiter)
}

/// Parse a test table with `TestName` and `TestCost` columns.
///
/// A blank cost counts as zero, matching how a column sum skips missing cells.
///
/// # Errors
///
/// Returns `ParseError::MissingColumn` if either column is absent,
/// `ParseError::InvalidFormat` for ragged rows or bad costs, and
/// `ParseError::TooManyRows` if the row limit is exceeded.
pub fn parse_test_text(text: &str, delimiter: char) -> Result<Vec<TestItem>, ParseError> {
    let mut rows = data_rows(text, delimiter);
    let Some((_, header)) = rows.next().transpose()? else {
        return Ok(Vec::new());
    };
    let columns = column_positions(&header);

    let name_col = *columns
        .get(TEST_NAME_COLUMN)
        .ok_or(ParseError::MissingColumn(TEST_NAME_COLUMN))?;
    let cost_col = *columns
        .get(TEST_COST_COLUMN)
        .ok_or(ParseError::MissingColumn(TEST_COST_COLUMN))?;

    let mut tests = Vec::new();
    for row in rows {
        let (line_num, fields) = row?;
        if fields.len() != header.len() {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has {} fields, expected {}",
                fields.len(),
                header.len()
            )));
        }

        let cost = parse_amount(&fields[cost_col]).map_err(|bad| {
            ParseError::InvalidFormat(format!("Invalid test cost on line {line_num}: '{bad}'"))
        })?;
        let cost = cost.unwrap_or_else(|| {
            warn!("Test '{}' on line {line_num} has no cost", fields[name_col]);
            0.0
        });

        if check_row_limit(tests.len()).is_some() {
            return Err(ParseError::TooManyRows(tests.len()));
        }
        tests.push(TestItem::new(fields[name_col].as_str(), cost));
    }

    Ok(tests)
}

type Row = (usize, Vec<String>);

/// Non-empty, non-comment lines split into trimmed fields, with 1-based line numbers
fn data_rows(
    text: &str,
    delimiter: char,
) -> impl Iterator<Item = Result<Row, ParseError>> + '_ {
    text.lines().enumerate().filter_map(move |(i, line)| {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }
        let line_num = i + 1;
        let row = split_record(line, delimiter).ok_or_else(|| {
            ParseError::InvalidFormat(format!("Line {line_num} has an unterminated quoted field"))
        });
        Some(row.map(|fields| (line_num, fields)))
    })
}

/// Split one record on `delimiter`, honouring RFC 4180 double quotes.
///
/// A quoted field may contain the delimiter, and `""` inside it stands for a
/// literal quote. Quoted fields cannot span lines. Returns `None` if a quote
/// is left open.
fn split_record(line: &str, delimiter: char) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c != '"' {
                field.push(c);
            } else if chars.peek() == Some(&'"') {
                chars.next();
                field.push('"');
            } else {
                in_quotes = false;
            }
        } else if c == '"' && field.trim().is_empty() {
            field.clear();
            in_quotes = true;
        } else if c == delimiter {
            fields.push(field.trim().to_string());
            field.clear();
        } else {
            field.push(c);
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(field.trim().to_string());
    Some(fields)
}

fn column_positions(header: &[String]) -> HashMap<&str, usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_csv() {
        let csv = "SKU,ProductName,VoltageRating,ConductorMaterial,UnitPrice
SKU-CU,Copper Armoured,1.1 kV,Copper,1100
SKU-AL,Aluminium Armoured,1.1 kV,Aluminium,1050.5
";
        let table = parse_product_text(csv, ',').unwrap();
        assert!(table.has_price_column);
        assert_eq!(table.products.len(), 2);

        let cu = &table.products[0];
        assert_eq!(cu.sku.as_str(), "SKU-CU");
        assert_eq!(cu.name.as_deref(), Some("Copper Armoured"));
        assert_eq!(cu.attribute("ConductorMaterial"), "Copper");
        assert_eq!(cu.unit_price, Some(1100.0));
        assert!(!cu.attributes.contains_key("UnitPrice"));
        assert_eq!(table.products[1].unit_price, Some(1050.5));
    }

    #[test]
    fn test_parse_product_tsv_without_price_column() {
        let tsv = "SKU\tVoltageRating\nSKU-1\t11 kV\n";
        let table = parse_product_text(tsv, '\t').unwrap();
        assert!(!table.has_price_column);
        assert_eq!(table.products[0].unit_price, None);
    }

    #[test]
    fn test_blank_price_and_nan_price() {
        let csv = "SKU,UnitPrice\nA,\nB,NaN\n";
        let table = parse_product_text(csv, ',').unwrap();
        assert_eq!(table.products[0].unit_price, None);
        assert!(table.products[1].unit_price.unwrap().is_nan());
    }

    #[test]
    fn test_product_table_requires_sku() {
        let err = parse_product_text("Name,UnitPrice\nx,1\n", ',').unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(SKU_COLUMN)));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = parse_product_text("SKU,UnitPrice\nA,1,extra\n", ',').unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_bad_price_rejected() {
        let err = parse_product_text("SKU,UnitPrice\nA,cheap\n", ',').unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_quoted_field_holds_delimiter() {
        let csv = "SKU,ProductName,VoltageRating,UnitPrice
SKU-CU,\"Cable, copper armoured\",1.1 kV,1100
SKU-AL,\"Cable \"\"AL\"\" armoured\",1.1 kV,\"1050\"
";
        let table = parse_product_text(csv, ',').unwrap();
        assert_eq!(table.products.len(), 2);

        let cu = &table.products[0];
        assert_eq!(cu.name.as_deref(), Some("Cable, copper armoured"));
        assert_eq!(cu.attribute("VoltageRating"), "1.1 kV");
        assert_eq!(cu.unit_price, Some(1100.0));

        let al = &table.products[1];
        assert_eq!(al.name.as_deref(), Some("Cable \"AL\" armoured"));
        assert_eq!(al.unit_price, Some(1050.0));
    }

    #[test]
    fn test_unterminated_quote_rejected() {
        let err = parse_product_text("SKU,ProductName\nA,\"open, quote\n", ',').unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_split_record() {
        assert_eq!(split_record("a, \"b,c\" ,d", ',').unwrap(), vec!["a", "b,c", "d"]);
        assert_eq!(split_record("\"x\ty\"\tz", '\t').unwrap(), vec!["x\ty", "z"]);
        assert_eq!(split_record("\"\"", ',').unwrap(), vec![""]);
        assert_eq!(split_record("in\"ch", ',').unwrap(), vec!["in\"ch"]);
    }

    #[test]
    fn test_parse_tests_table() {
        let csv = "# compliance tests
TestName,TestCost
Load Test,200
Performance Test,300
Compliance Test,150
";
        let tests = parse_test_text(csv, ',').unwrap();
        assert_eq!(tests.len(), 3);
        assert_eq!(tests[0].name, "Load Test");
        let total: f64 = tests.iter().map(|t| t.cost).sum();
        assert!((total - 650.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tests_table_requires_cost() {
        let err = parse_test_text("TestName\nLoad Test\n", ',').unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(TEST_COST_COLUMN)));
    }

    #[test]
    fn test_empty_tests_table() {
        assert!(parse_test_text("", ',').unwrap().is_empty());
    }
}
