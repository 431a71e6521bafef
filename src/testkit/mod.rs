//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for events, markets, quotes and opportunities,
//!   plus seeders that write them through a [`Store`](crate::port::outbound::store::Store).
//! - [`store`] - `FaultyStore`, a memory store that fails reads for chosen events.
//! - [`venue`] - `StaticFeed`, an in-memory [`VenueFeed`](crate::port::outbound::venue::VenueFeed).

pub mod domain;
pub mod store;
pub mod venue;
