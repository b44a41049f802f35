//! Product catalog storage and indexing.
//!
//! The catalog holds two relations: **products** (keyed by SKU, with open
//! descriptive attributes and a unit price) and **tests** (named compliance
//! items with a flat cost). The matcher and pricing calculator only ever see
//! an immutable [`CatalogSnapshot`](store::CatalogSnapshot) taken through the
//! [`CatalogStore`](store::CatalogStore) trait.
//!
//! ## Backends
//!
//! - [`InMemoryCatalog`](store::InMemoryCatalog): a snapshot held in memory
//! - [`JsonFileCatalog`](store::JsonFileCatalog): a JSON catalog file
//! - [`TableCatalog`](store::TableCatalog): CSV/TSV product and test tables
//!
//! An embedded sample catalog of armoured power cables is compiled into the
//! binary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bid_matcher::catalog::store::{CatalogSnapshot, CatalogStore, JsonFileCatalog};
//! use bid_matcher::core::types::Sku;
//!
//! // Load embedded catalog
//! let catalog = CatalogSnapshot::load_embedded().unwrap();
//! for product in catalog.products() {
//!     println!("{} {:?}", product.sku, product.unit_price);
//! }
//! let cu = catalog.get(&Sku::new("SKU-CU-XLPE-SWA"));
//!
//! // Or read through a store
//! let store = JsonFileCatalog::new("my_catalog.json");
//! let snapshot = store.snapshot().unwrap();
//! ```

pub mod index;
pub mod store;
