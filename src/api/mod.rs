//! HTTP API for the allocation advisor.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/analysis` - Generate allocation proposals (auth)
//! - `GET /api/ai/cache-stats` - Cache statistics (auth)
//! - `DELETE /api/ai/cache-stats` - Clear the cache (auth)

pub mod auth;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
