//! Tag domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-defined label attached to contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// Unique, compared case-insensitively on lookup
    pub name: String,
    /// Display color, e.g. `#ff0000`
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating or updating a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: Option<String>,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("tag name cannot be empty".to_string());
        }
        Ok(())
    }
}
