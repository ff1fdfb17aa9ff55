//! Pezzottify Stats Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod stats;
pub mod user;

// Re-export commonly used types for convenience
pub use catalog::{CatalogClient, FakeCatalogClient, HttpCatalogClient};
pub use server::{run_server, RequestsLoggingLevel};
pub use stats::{FieldCapabilities, SqliteStatsStore, StatsStore};
pub use user::{SqliteUserStore, UserRole, UserStore};
