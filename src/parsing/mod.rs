//! Parsers for catalog tables and extraction replies.
//!
//! This module provides parsers for:
//!
//! - **Delimited tables** (CSV/TSV): product and test relations with a header row
//! - **Model replies**: the first fenced JSON block of a free-form reply
//!
//! ## Product Table Columns
//!
//! | Column | Description | Required |
//! |--------|-------------|----------|
//! | SKU | Product key | Yes |
//! | UnitPrice | Unit price | No (pricing fails without it) |
//! | ProductName | Display name | No |
//! | *any other* | Matchable attribute | No |
//!
//! ## Test Table Columns
//!
//! | Column | Description | Required |
//! |--------|-------------|----------|
//! | TestName | Test identifier | Yes |
//! | TestCost | Flat cost | Yes |
//!
//! Cells may be wrapped in double quotes to contain the delimiter; `""`
//! inside a quoted cell is a literal quote. A quoted cell cannot span lines.

pub mod delimited;
pub mod reply;
