//! Infrastructure layer.
//!
//! Configuration loading and the composition root. No business logic.

pub mod bootstrap;
pub mod config;
