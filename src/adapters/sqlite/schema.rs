//! Base schema for the contact store, installed as migration `001`.

use async_trait::async_trait;
use tracing::{info, warn};

use super::connection::{DatabaseHandle, DatabaseResult};
use super::migrations::Migration;

/// Tables created by [`InitialSchema`], parents first.
pub const BASE_TABLES: [&str; 8] = [
    "contacts",
    "groups",
    "tags",
    "contact_tags",
    "contact_groups",
    "messages",
    "session_config",
    "sync_log",
];

const TABLES: [(&str, &str); 8] = [
    (
        "contacts",
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER UNIQUE NOT NULL,
            username TEXT,
            first_name TEXT,
            last_name TEXT,
            display_name TEXT NOT NULL,
            phone TEXT,
            profile_photo_path TEXT,
            bio TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "groups",
        "CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER UNIQUE NOT NULL,
            name TEXT NOT NULL,
            member_count INTEGER DEFAULT 0,
            profile_photo_path TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "tags",
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            color TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "contact_tags",
        "CREATE TABLE IF NOT EXISTS contact_tags (
            contact_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (contact_id, tag_id),
            FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
    ),
    (
        "contact_groups",
        "CREATE TABLE IF NOT EXISTS contact_groups (
            contact_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            joined_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (contact_id, group_id),
            FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
        )",
    ),
    (
        "messages",
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_message_id INTEGER,
            contact_id INTEGER NOT NULL,
            is_outgoing BOOLEAN NOT NULL,
            content TEXT,
            timestamp TIMESTAMP NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE
        )",
    ),
    (
        "session_config",
        "CREATE TABLE IF NOT EXISTS session_config (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "sync_log",
        "CREATE TABLE IF NOT EXISTS sync_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sync_type TEXT NOT NULL,
            status TEXT NOT NULL,
            records_processed INTEGER DEFAULT 0,
            error_message TEXT,
            started_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            completed_at TIMESTAMP
        )",
    ),
];

/// `(index, table, indexed columns)`
pub const INDEXES: [(&str, &str, &str); 15] = [
    ("idx_contacts_telegram_id", "contacts", "telegram_id"),
    ("idx_contacts_username", "contacts", "username"),
    ("idx_contacts_display_name", "contacts", "display_name"),
    ("idx_groups_telegram_id", "groups", "telegram_id"),
    ("idx_groups_name", "groups", "name"),
    ("idx_messages_contact_id", "messages", "contact_id"),
    ("idx_messages_timestamp", "messages", "timestamp DESC"),
    ("idx_messages_is_outgoing", "messages", "is_outgoing"),
    ("idx_contact_tags_tag_id", "contact_tags", "tag_id"),
    ("idx_contact_tags_contact_id", "contact_tags", "contact_id"),
    ("idx_contact_groups_group_id", "contact_groups", "group_id"),
    ("idx_contact_groups_contact_id", "contact_groups", "contact_id"),
    ("idx_tags_name", "tags", "name"),
    ("idx_sync_log_sync_type", "sync_log", "sync_type"),
    ("idx_sync_log_status", "sync_log", "status"),
];

/// `(trigger, table, key column)`; each bumps `updated_at` after an update.
pub const TIMESTAMP_TRIGGERS: [(&str, &str, &str); 3] = [
    ("update_contacts_timestamp", "contacts", "id"),
    ("update_groups_timestamp", "groups", "id"),
    ("update_session_config_timestamp", "session_config", "key"),
];

/// Children before parents so foreign keys never block a drop.
pub(super) const DROP_ORDER: [&str; 8] = [
    "contact_tags",
    "contact_groups",
    "messages",
    "sync_log",
    "session_config",
    "tags",
    "groups",
    "contacts",
];

/// Migration `001`: tables, indexes and timestamp triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialSchema;

#[async_trait]
impl Migration for InitialSchema {
    fn version(&self) -> &str {
        "001"
    }

    fn name(&self) -> &str {
        "initial_schema"
    }

    fn description(&self) -> &str {
        "Create base database schema with contacts, groups, tags, messages, and configuration tables"
    }

    async fn apply(&self, db: &DatabaseHandle) -> DatabaseResult<()> {
        info!("Creating initial database schema");

        for (table, ddl) in TABLES {
            db.execute(ddl, &[]).await?;
            info!(table, "Created table");
        }

        for (index, table, columns) in INDEXES {
            db.execute(&format!("CREATE INDEX IF NOT EXISTS {index} ON {table}({columns})"), &[])
                .await?;
        }
        info!(count = INDEXES.len(), "Created indexes");

        for (trigger, table, key) in TIMESTAMP_TRIGGERS {
            db.execute(
                &format!(
                    "CREATE TRIGGER IF NOT EXISTS {trigger}
                     AFTER UPDATE ON {table}
                     FOR EACH ROW
                     BEGIN
                         UPDATE {table} SET updated_at = CURRENT_TIMESTAMP
                         WHERE {key} = NEW.{key};
                     END"
                ),
                &[],
            )
            .await?;
        }
        info!(count = TIMESTAMP_TRIGGERS.len(), "Created triggers");

        Ok(())
    }

    async fn revert(&self, db: &DatabaseHandle) -> DatabaseResult<()> {
        warn!("Dropping initial schema tables");
        for table in DROP_ORDER {
            db.execute(&format!("DROP TABLE IF EXISTS {table}"), &[]).await?;
            info!(table, "Dropped table");
        }
        Ok(())
    }
}
