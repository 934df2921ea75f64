//! # gateway-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the REST API under `/api` (`/api/system`, `/api/devices/{id}/action`,
//!   `/api/scenario/...`, `/api/room/...`, ...)
//! - Serve SSE event streams under `/api/events/{channel}`
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results into HTTP responses (JSON)
//!
//! ## Dependency rule
//! Depends on `gateway-app` (for port traits and services) and `gateway-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
mod error;
pub mod router;
pub mod state;

pub use error::ApiError;
