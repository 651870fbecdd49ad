//! Health Check Endpoint
//!
//! Liveness plus cache counters. No store round-trip.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::services::KnightService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHealth {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
    pub hit_rate: f64,
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache: CacheHealth,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - Process liveness check
pub async fn liveness(
    State(knights): State<Arc<KnightService>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let stats = knights.cache_stats();
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        cache: CacheHealth {
            hits: stats.hits,
            misses: stats.misses,
            entry_count: stats.entry_count,
            hit_rate: stats.hit_rate(),
        },
    };
    (StatusCode::OK, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(liveness))
}
