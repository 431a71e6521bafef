use std::sync::Arc;

use linesman::adapter::outbound::sqlite::SqliteStore;
use tempfile::TempDir;

/// Temporary SQLite database for integration tests. The directory and its
/// WAL files go away on drop.
pub struct TempDb {
    // Keeps the directory alive for the store's lifetime.
    _dir: TempDir,
    store: Arc<SqliteStore>,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("linesman-{name}-"))
            .tempdir()
            .expect("create temp dir");
        let path = dir.path().join("linesman.db");
        let store = SqliteStore::open(&path.display().to_string()).expect("open sqlite store");
        Self {
            _dir: dir,
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::clone(&self.store)
    }
}
