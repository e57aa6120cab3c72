//! HTTP surface (axum)
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /api/floor` | live floor price, supply, market cap |
//! | `GET /api/history` | filtered series + window changes |
//! | `GET /api/backfill` | one-time historical import |
//! | `GET\|POST /api/ingest` | record one observation |
//! | `GET /api/rates` | ETH fiat rates |
//! | `GET /health` | liveness |

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Assemble the full application router with state attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
