//! # allocation_advisor
//!
//! AI advisory core for advertising-budget allocation simulations.
//!
//! ## Architecture
//! - `cache`: bounded, TTL-limited store of completed analyses
//! - `llm`: resilient generation client with retry and backoff
//! - `advisor`: prompt building, response validation, orchestration
//! - `api`: HTTP surface (advisory endpoint, cache administration)

pub mod advisor;
pub mod api;
pub mod cache;
pub mod config;
pub mod llm;

pub use config::Config;
