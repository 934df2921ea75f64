//! # gateway-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement [`gateway_app::ports::StateRepository`] against a single
//!   key-value `state` table
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations
//!
//! ## Dependency rule
//! Depends on `gateway-app` (for port traits) and `gateway-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

mod error;
mod pool;
mod state_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use state_repo::SqliteStateRepository;
