//! SQLite persistence adapter.
//!
//! Implements every store port over one Diesel connection pool. Operations
//! that touch several tables run inside an `IMMEDIATE` transaction so that
//! concurrent writers serialize on the database lock.

pub mod database;
mod store;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use store::SqliteStore;
