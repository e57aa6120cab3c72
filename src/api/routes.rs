use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::state::AppState;
use crate::backfill::{query_setup_instructions, BackfillReport};
use crate::error::TrackerError;
use crate::history::types::{now_ms, HistoryReport, Observation};
use crate::ingestion::FloorSnapshot;
use crate::provider::DuneClient;
use crate::store::SampleStore;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/floor", get(current_price))
        .route("/api/history", get(history))
        .route("/api/backfill", get(backfill))
        .route("/api/ingest", get(ingest).post(ingest))
        .route("/api/rates", get(rates))
        .route("/health", get(health))
}

/// GET /api/floor: live floor, supply and market cap. Nothing is stored.
async fn current_price(State(state): State<Arc<AppState>>) -> Result<Json<FloorSnapshot>, TrackerError> {
    let snapshot = state.ingestor.fetch_snapshot(now_ms()).await?;
    Ok(Json(snapshot))
}

/// GET /api/history: always 200; faults come back in the report's `error` field.
async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report: HistoryReport = state.history.get_history(now_ms()).await;
    ([(header::CACHE_CONTROL, NO_STORE)], Json(report))
}

#[derive(Debug, Deserialize)]
struct BackfillParams {
    dune_key: Option<String>,
    query_id: Option<String>,
}

/// GET /api/backfill?dune_key=...&query_id=...
async fn backfill(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BackfillParams>,
) -> Result<Json<BackfillReport>, TrackerError> {
    let key = params
        .dune_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| state.config.dune_api_key.clone())
        .ok_or_else(|| TrackerError::Configuration {
            message: "Dune API key required. Pass as ?dune_key=YOUR_KEY or set DUNE_API_KEY".to_string(),
            instructions: query_setup_instructions(&state.config.contract),
        })?;
    let query_id = params.query_id.unwrap_or_default();

    let dune = DuneClient::new(state.http.clone(), state.config.dune_base_url.clone(), key);
    let report = state.backfiller.run(&dune, &query_id).await?;
    Ok(Json(report))
}

/// GET|POST /api/ingest: record one observation now.
async fn ingest(State(state): State<Arc<AppState>>) -> Result<Json<Observation>, TrackerError> {
    let observation = state.ingestor.ingest_one(now_ms()).await?;
    Ok(Json(observation))
}

/// GET /api/rates: ETH → USD/GBP/EUR/BTC.
async fn rates(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, TrackerError> {
    let rates = state.rates.get(now_ms()).await?;
    Ok(([(header::CACHE_CONTROL, NO_STORE)], Json(rates)))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let samples = state.store.len().await.ok();
    Json(json!({ "status": "ok", "samples": samples }))
}
