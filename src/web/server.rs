use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::catalog::store::{CatalogSnapshot, CatalogStore, InMemoryCatalog, JsonFileCatalog};
use crate::cli::ServeArgs;
use crate::core::tender::{TenderCandidate, DUE_DATE_FORMAT};
use crate::matching::engine::{MatchingConfig, ScoreThreshold};
use crate::pipeline::discovery::{DiscoveryWindow, StaticTenderSource, DEFAULT_WINDOW_DAYS};
use crate::pipeline::extraction::{
    default_requirements, RetryPolicy, RetryingExtractor, RuleBasedExtractor,
};
use crate::pipeline::orchestrator::{run_pricing_with, Pipeline, PipelineReport};
use crate::pricing::calculator::PricingCalculator;
use crate::pricing::policy::aggregate_test_cost;

/// Maximum accepted request body
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Maximum tender candidates accepted in one request
pub const MAX_TENDER_CANDIDATES: usize = 1_000;

/// Shared application state
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
}

/// Error body returned by every failing endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that doesn't leak internal details
#[must_use]
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    // Log detailed error server-side for debugging (not exposed to client)
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn error_response(status: StatusCode, error: ErrorResponse) -> Response {
    (status, Json(error)).into_response()
}

/// Start the web server
///
/// # Errors
///
/// Returns an error if the runtime cannot be created, the catalog cannot be
/// loaded, or the server fails to bind.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// Build the application router over the embedded catalog or a catalog file
///
/// # Errors
///
/// Returns an error if the embedded catalog is invalid or the rate limiter
/// cannot be configured.
pub fn create_router(catalog_path: Option<&Path>) -> anyhow::Result<Router> {
    let catalog: Arc<dyn CatalogStore> = match catalog_path {
        Some(path) => Arc::new(JsonFileCatalog::new(path)),
        None => Arc::new(InMemoryCatalog::new(CatalogSnapshot::load_embedded()?)),
    };
    create_router_with_state(Arc::new(AppState { catalog }))
}

/// Build the application router over the given state
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn create_router_with_state(state: Arc<AppState>) -> anyhow::Result<Router> {
    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?;

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/price", post(price_handler))
        .route("/api/tenders/select", post(select_tender_handler))
        .route("/api/analysis/run", post(analysis_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // Security headers
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("cache-control"),
                    HeaderValue::from_static("no-store"),
                ))
                // IP-based rate limiting
                .layer(GovernorLayer {
                    config: Arc::new(governor_conf),
                })
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(ConcurrencyLimitLayer::new(100))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        );

    Ok(app)
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let app = create_router(args.catalog.as_deref())?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting bid-matcher API at http://{addr}");

    if args.open {
        let _ = open::that(format!("http://{addr}"));
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Liveness check
async fn index_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "bid-matcher is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Return products and tests in the catalog
async fn catalog_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = match state.catalog.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                create_safe_error_response(
                    "catalog_unavailable",
                    "The product catalog could not be read",
                    Some(&e.to_string()),
                ),
            )
        }
    };

    Json(serde_json::json!({
        "count": snapshot.len(),
        "products": snapshot.products(),
        "tests": snapshot.tests(),
        "test_cost_per_item": aggregate_test_cost(snapshot.tests()),
    }))
    .into_response()
}

/// Matching options accepted as query parameters
#[derive(Debug, Default, Deserialize)]
struct MatchingParams {
    min_score: Option<f64>,
    inclusive: Option<bool>,
}

impl MatchingParams {
    fn config(&self) -> Result<MatchingConfig, Response> {
        let Some(min_score) = self.min_score else {
            return Ok(MatchingConfig::default());
        };
        if !(0.0..=100.0).contains(&min_score) {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                create_safe_error_response(
                    "invalid_parameter",
                    "min_score must be between 0 and 100",
                    None,
                ),
            ));
        }
        let threshold = if self.inclusive.unwrap_or(false) {
            ScoreThreshold::AtLeast(min_score)
        } else {
            ScoreThreshold::Above(min_score)
        };
        Ok(MatchingConfig { threshold })
    }
}

fn json_rejection(rejection: &JsonRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        create_safe_error_response("invalid_json", &rejection.body_text(), None),
    )
}

fn report_response(result: Result<PipelineReport, tokio::task::JoinError>) -> Response {
    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            create_safe_error_response(
                "internal_error",
                "The request could not be processed",
                Some(&e.to_string()),
            ),
        ),
    }
}

/// Match and price a posted requirement list
async fn price_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchingParams>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(requirements) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection),
    };
    let matching = match params.config() {
        Ok(config) => config,
        Err(response) => return response,
    };

    let catalog = Arc::clone(&state.catalog);
    let result = tokio::task::spawn_blocking(move || {
        run_pricing_with(
            &requirements,
            catalog.as_ref(),
            matching,
            &PricingCalculator::new(),
        )
    })
    .await;
    report_response(result)
}

/// A tender listing with an optional reference date and window
#[derive(Debug, Deserialize)]
struct TenderListing {
    tenders: Vec<TenderCandidate>,
    #[serde(default)]
    today: Option<String>,
    #[serde(default)]
    window_days: Option<u32>,
    /// Scope document for tenders whose listing carries none
    #[serde(default)]
    document: Option<String>,
    /// Price the default requirement list when the scope yields nothing
    #[serde(default)]
    fallback: bool,
}

impl TenderListing {
    fn window(&self) -> Result<DiscoveryWindow, Response> {
        if self.tenders.len() > MAX_TENDER_CANDIDATES {
            return Err(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                create_safe_error_response(
                    "too_many_tenders",
                    &format!("At most {MAX_TENDER_CANDIDATES} tenders per request"),
                    None,
                ),
            ));
        }
        let window_days = self.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
        match &self.today {
            None => Ok(DiscoveryWindow::from_today(window_days)),
            Some(today) => NaiveDate::parse_from_str(today, DUE_DATE_FORMAT)
                .map(|today| DiscoveryWindow::new(today, window_days))
                .map_err(|_| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        create_safe_error_response(
                            "invalid_parameter",
                            "today must be a YYYY-MM-DD date",
                            None,
                        ),
                    )
                }),
        }
    }
}

/// Select the first tender due within the window
async fn select_tender_handler(body: Result<Json<TenderListing>, JsonRejection>) -> Response {
    let Json(listing) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection),
    };
    let window = match listing.window() {
        Ok(window) => window,
        Err(response) => return response,
    };

    match window.select(&listing.tenders) {
        Some(tender) => Json(serde_json::json!({
            "status": "selected",
            "tender": tender,
        }))
        .into_response(),
        None => Json(serde_json::json!({ "status": "no_tenders_found" })).into_response(),
    }
}

/// Run the full pipeline over a posted tender listing
async fn analysis_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchingParams>,
    body: Result<Json<TenderListing>, JsonRejection>,
) -> Response {
    let Json(mut listing) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection),
    };
    let window = match listing.window() {
        Ok(window) => window,
        Err(response) => return response,
    };
    let matching = match params.config() {
        Ok(config) => config,
        Err(response) => return response,
    };

    if let Some(document) = listing.document.take() {
        for candidate in &mut listing.tenders {
            candidate.document.get_or_insert_with(|| document.clone());
        }
    }
    info!("Running analysis over {} tenders", listing.tenders.len());

    let catalog = Arc::clone(&state.catalog);
    let result = tokio::task::spawn_blocking(move || {
        let source = StaticTenderSource::new(listing.tenders);
        let single = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        };
        let mut extractor = RetryingExtractor::new(RuleBasedExtractor::new(), single);
        if listing.fallback {
            extractor = extractor.with_fallback(default_requirements());
        }
        Pipeline::new(&source, &extractor, catalog.as_ref(), window)
            .with_matching_config(matching)
            .run()
    })
    .await;
    report_response(result)
}
