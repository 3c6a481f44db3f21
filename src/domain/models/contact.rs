//! Contact domain model.
//!
//! A contact is a Telegram user known to the local store, keyed by its
//! Telegram user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored Telegram contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Local database id
    pub id: i64,
    /// Telegram user id (unique)
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Name shown in listings; required
    pub display_name: String,
    pub phone: Option<String>,
    pub profile_photo_path: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating or updating a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub phone: Option<String>,
    pub profile_photo_path: Option<String>,
    pub bio: Option<String>,
}

impl NewContact {
    pub fn new(telegram_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            telegram_id,
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("display_name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl From<&Contact> for NewContact {
    fn from(contact: &Contact) -> Self {
        Self {
            telegram_id: contact.telegram_id,
            username: contact.username.clone(),
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            display_name: contact.display_name.clone(),
            phone: contact.phone.clone(),
            profile_photo_path: contact.profile_photo_path.clone(),
            bio: contact.bio.clone(),
        }
    }
}
