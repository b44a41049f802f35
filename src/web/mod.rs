//! HTTP API for pricing requirement lists and running the tender pipeline.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! bid-matcher serve
//!
//! # Serve a custom catalog file on another port
//! bid-matcher serve --port 3000 --catalog my_catalog.json
//!
//! # Bind to all interfaces
//! bid-matcher serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /` - Liveness message
//! - `GET /api/catalog` - Products and tests in the catalog
//! - `POST /api/price` - Match and price a JSON array of requirements
//! - `POST /api/tenders/select` - Pick the first tender due within the window
//! - `POST /api/analysis/run` - Full pipeline over a posted tender listing
//!
//! `/api/price` and `/api/analysis/run` accept `min_score` and `inclusive`
//! query parameters and answer with a pipeline report whose `status` is one
//! of `completed`, `no_tenders_found`, `technical_analysis_failed` or
//! `pricing_failed`.

pub mod server;
