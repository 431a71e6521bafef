//! JSON HTTP API.
//!
//! Thin handlers over [`Engine`](crate::application::Engine). Errors are
//! rendered as `{"error": {"kind", "message"}}` with a status derived from
//! the error kind.

mod arbitrage;
mod error;
mod event;
mod ingest;
mod mapping;
mod router;

pub use error::{status_for, ApiError};
pub use router::router;
