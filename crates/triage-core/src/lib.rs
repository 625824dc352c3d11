//! Core types and trait definitions for the Triage SLA engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::PolicyStore`]; the evaluator and the
//! deadline monitor depend only on that abstraction.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod monitor;
pub mod policy;
pub mod store;
pub mod ticket;

pub use error::{DomainError, Error, Result};
