//! Axum JSON surface over the balance engine.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::error;
use vbal_core::Category;
use vbal_engine::{BalanceEngine, EngineError};

pub const CRATE_NAME: &str = "vbal-web";

pub const DEFAULT_REPORT_DAYS: u32 = 7;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BalanceEngine>,
}

impl AppState {
    pub fn new(engine: Arc<BalanceEngine>) -> Self {
        Self { engine }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/sync", post(sync_handler))
        .route("/report", get(report_handler))
        .route("/recommendations", get(recommendations_handler))
        .route("/data", delete(delete_data_handler))
        .with_state(state)
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("VBAL_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let engine = vbal_engine::engine_from_env().await?;
    let state = AppState::new(Arc::new(engine));
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
struct ReportQuery {
    days: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RecommendationsQuery {
    category: Option<String>,
}

async fn healthz_handler() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}

async fn sync_handler(State(state): State<AppState>) -> Response {
    match state.engine.sync_history().await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn report_handler(State(state): State<AppState>, Query(query): Query<ReportQuery>) -> Response {
    let days = query.days.unwrap_or(DEFAULT_REPORT_DAYS).max(1);
    match state.engine.balance_report(days).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => engine_error_response(err),
    }
}

/// With no `category` parameter, recommends for the weakest category of a
/// fresh default-window report.
async fn recommendations_handler(
    State(state): State<AppState>,
    Query(query): Query<RecommendationsQuery>,
) -> Response {
    let category = match &query.category {
        Some(name) => Category::from_str_or_default(name),
        None => match state.engine.balance_report(DEFAULT_REPORT_DAYS).await {
            Ok(report) => report.lowest_category,
            Err(err) => return engine_error_response(err),
        },
    };

    match state.engine.recommendations(category).await {
        Ok(recommendations) => Json(serde_json::json!({
            "category": category,
            "recommendations": recommendations,
        }))
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn delete_data_handler(State(state): State<AppState>) -> Response {
    match state.engine.delete_all_local_data().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => engine_error_response(err),
    }
}

fn engine_error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::HistoryUnavailable => StatusCode::CONFLICT,
        EngineError::Catalog(_) => StatusCode::BAD_GATEWAY,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(%err, "engine operation failed");
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}
