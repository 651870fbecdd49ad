//! Knights API - Record Service and REST Layer
//!
//! Hosts the record service that keeps the primary store, the cache and the
//! hall of heroes consistent, and exposes it over an Axum router.

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::{ApiConfig, LogFormat, StorageBackend};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use services::KnightService;
pub use state::AppState;
