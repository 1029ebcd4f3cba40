//! HTTP API server for Satchel.
//!
//! This crate provides the transfer surface:
//! - Single-shot and chunked upload endpoints
//! - Encrypted download streaming
//! - File metadata lookup
//! - Background sweep of expired staged chunks

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use sweep::spawn_sweep_task;
