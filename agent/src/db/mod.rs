//! Durable local store backed by SQLite.
//!
//! Three tables, one per collection: `dashboard_cache`, `pending_operations`
//! and `sync_log`. The query functions take any SQLite executor so callers can
//! run them on the pool or inside a transaction.

pub mod cache;
pub mod operations;
mod pool;
pub mod sync_log;

pub use pool::*;
