//! Knight REST API Routes
//!
//! Thin handlers over `KnightService`. Responses are the stored records as
//! JSON; errors are `ApiError` bodies.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use knights_core::{KnightDraft, KnightPatch};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathKnightId},
    services::KnightService,
    state::AppState,
};

/// `filter` value that lists the hall of heroes instead of live knights.
pub const HEROES_FILTER: &str = "heroes";

/// Query parameters for `GET /knights`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListKnightsQuery {
    pub filter: Option<String>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /knights - Create a new knight
pub async fn create_knight(
    State(knights): State<Arc<KnightService>>,
    JsonBody(draft): JsonBody<KnightDraft>,
) -> ApiResult<impl IntoResponse> {
    let knight = knights.create(draft).await?;
    Ok((StatusCode::CREATED, Json(knight)))
}

/// GET /knights - List knights, or heroes with `?filter=heroes`
///
/// Any other filter value lists live knights.
pub async fn list_knights(
    State(knights): State<Arc<KnightService>>,
    Query(params): Query<ListKnightsQuery>,
) -> ApiResult<impl IntoResponse> {
    let list = if params.filter.as_deref() == Some(HEROES_FILTER) {
        knights.find_heroes().await?
    } else {
        knights.find_all().await?
    };
    Ok(Json(list))
}

/// GET /knights/:id - Get knight by ID
pub async fn get_knight(
    State(knights): State<Arc<KnightService>>,
    PathKnightId(id): PathKnightId,
) -> ApiResult<impl IntoResponse> {
    let knight = knights.find_one(id).await?;
    Ok(Json(knight))
}

/// PUT /knights/:id - Merge the given fields into a knight
pub async fn update_knight(
    State(knights): State<Arc<KnightService>>,
    PathKnightId(id): PathKnightId,
    JsonBody(patch): JsonBody<KnightPatch>,
) -> ApiResult<impl IntoResponse> {
    let knight = knights.update(id, patch).await?;
    Ok(Json(knight))
}

/// DELETE /knights/:id - Delete a knight and archive it as a hero
pub async fn delete_knight(
    State(knights): State<Arc<KnightService>>,
    PathKnightId(id): PathKnightId,
) -> ApiResult<impl IntoResponse> {
    let knight = knights.remove(id).await?;
    Ok(Json(knight))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_knights).post(create_knight))
        .route(
            "/:id",
            get(get_knight).put(update_knight).delete(delete_knight),
        )
}
