//! Request extractors that reject with structured `ApiError` bodies.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use knights_core::KnightId;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Extractor for a knight id path parameter.
///
/// Unlike `Path<Uuid>`, a malformed id is rejected with an `INVALID_FORMAT`
/// error body instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct PathKnightId(pub KnightId);

#[async_trait]
impl<S> FromRequestParts<S> for PathKnightId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_format("id", &format!("path parameter: {}", e)))?;

        let id = raw.parse::<KnightId>()?;
        Ok(PathKnightId(id))
    }
}

/// JSON body extractor whose rejection is an `INVALID_INPUT` error body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
