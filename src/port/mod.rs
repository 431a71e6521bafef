//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!   HTTP / CLI  ──▶  application services  ──▶  Store      (memory, sqlite)
//!                                          └─▶  VenueFeed  (polymarket, kalshi)
//! ```

pub mod outbound;
