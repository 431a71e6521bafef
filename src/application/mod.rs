//! Application services (use cases).
//!
//! These services orchestrate domain logic over the outbound ports. None of
//! them knows which store or venue adapter it is talking to.

pub mod arbitrage;
pub mod engine;
pub mod event;
pub mod ingestion;
pub mod matcher;

pub use engine::Engine;
