//! Service Layer
//!
//! Business logic between the HTTP routes and the stores.

mod knight_service;

pub use knight_service::*;
