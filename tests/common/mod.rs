//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple
//! integration test files.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tgcontacts::{DatabaseHandle, DatabaseLocation, MigrationManager};

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Create a temporary test database path
///
/// The file itself does not exist yet; the handle creates it on connect.
/// Keep the returned TempDir alive for as long as the path is used.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let db_path = dir.path().join("data").join("contacts.db");
    (dir, db_path)
}

/// Handle onto a file database at `path`.
#[allow(dead_code)]
pub fn file_db(path: &std::path::Path) -> Arc<DatabaseHandle> {
    Arc::new(DatabaseHandle::new(DatabaseLocation::File(path.to_path_buf())))
}

/// In-memory database with the built-in migrations applied.
#[allow(dead_code)]
pub async fn migrated_db() -> (Arc<DatabaseHandle>, MigrationManager) {
    let db = Arc::new(DatabaseHandle::in_memory());
    let manager = MigrationManager::with_builtin_migrations(Arc::clone(&db)).expect("built-in migrations");
    manager.apply_pending().await.expect("failed to apply migrations");
    (db, manager)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
