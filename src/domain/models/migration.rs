//! Read models for the migration ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `_migrations` ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: String,
    pub name: String,
    pub description: String,
    pub applied_at: DateTime<Utc>,
    /// Reserved; never populated.
    pub checksum: Option<String>,
}

/// A registered migration and whether the ledger records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub version: String,
    pub name: String,
    pub description: String,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Row count for one table; `rows` is `None` when counting failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowCount {
    pub table: String,
    pub rows: Option<i64>,
}
