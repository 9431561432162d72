use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use label_layout::batch::{self, BatchSummary, ItemReport, ItemRequest, deserialize_quantity};
use label_layout::descriptor::detect_roll_width_mm;
use label_layout::{EngineConfig, Label, OptimizationOutcome, Solver};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    height_mm: f64,
    width_mm: f64,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    quantity: u64,
    #[serde(default)]
    roll_width_mm: Option<f64>,
    #[serde(default)]
    component_name: Option<String>,
}

#[derive(Deserialize)]
struct BatchRequest {
    items: Vec<ItemRequest>,
}

#[derive(Serialize)]
struct BatchResponse {
    items: Vec<ItemReport>,
    summary: BatchSummary,
}

/// Malformed or mistyped bodies are the caller's fault, whatever axum's
/// default status for them.
fn bad_request(rejection: JsonRejection) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, rejection.body_text())
}

async fn optimize(
    State(solver): State<Arc<Solver>>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<OptimizationOutcome>, (StatusCode, String)> {
    let Json(req) = payload.map_err(bad_request)?;
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let label = Label::new(req.height_mm, req.width_mm)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let detected = req
        .roll_width_mm
        .or_else(|| req.component_name.as_deref().and_then(detect_roll_width_mm));

    Ok(Json(solver.solve(label, req.quantity, detected)))
}

async fn optimize_batch(
    State(solver): State<Arc<Solver>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, (StatusCode, String)> {
    let Json(req) = payload.map_err(bad_request)?;
    tracing::info!(items = req.items.len(), "POST /optimize/batch");

    let items = tokio::task::spawn_blocking(move || batch::run_batch(&solver, &req.items))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let summary = BatchSummary::from_reports(&items);
    Ok(Json(BatchResponse { items, summary }))
}

fn load_config() -> EngineConfig {
    match std::env::var("LABEL_LAYOUT_CONFIG") {
        Ok(path) => match EngineConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Err(_) => EngineConfig::default(),
    }
}

fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve());
}

async fn serve() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let solver = Arc::new(Solver::new(load_config()));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/optimize/batch", post(optimize_batch))
        .with_state(solver)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
