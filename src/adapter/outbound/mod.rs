//! Outbound adapters (driven side).

pub mod memory;
pub mod sqlite;
pub mod venue;
