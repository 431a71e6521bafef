//! In-process store adapter.

mod store;

pub use store::MemoryStore;
