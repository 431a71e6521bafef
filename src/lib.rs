//! Linesman - cross-venue sports prediction market arbitrage detection.
//!
//! Ingests markets and quotes from several prediction-market venues, maps
//! each venue market onto a canonical sports event, and searches every
//! event's outcome groups for cross-venue stake allocations that pay out
//! more than they cost whatever the result.
//!
//! # Architecture
//!
//! - [`domain`] - Pure types and algorithms: price normalization, market
//!   question parsing, match scoring, the arbitrage solver
//! - [`port`] - Store and venue feed traits
//! - [`application`] - Use cases: event lifecycle, matcher, scanner,
//!   ingestion
//! - [`adapter`] - HTTP API, CLI, memory and SQLite stores, venue clients
//! - [`infrastructure`] - Configuration, logging and the composition root
//! - [`error`] - Layered error types with stable kinds

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
