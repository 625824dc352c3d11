//! SQLite backend for the Triage policy store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs inside a single
//! `BEGIN IMMEDIATE` transaction, which is what keeps policy positions
//! consistent under concurrent create, reorder and compact calls.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqlitePolicyStore;
