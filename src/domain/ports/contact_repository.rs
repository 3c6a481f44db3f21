//! Contact repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Contact, NewContact};

/// Repository interface for Contact persistence.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Create a contact. Fails with `DuplicateContact` if the Telegram id is taken.
    async fn create(&self, contact: &NewContact) -> DomainResult<Contact>;

    /// Get a contact by local id.
    async fn get(&self, id: i64) -> DomainResult<Option<Contact>>;

    /// Get a contact by Telegram user id.
    async fn get_by_telegram_id(&self, telegram_id: i64) -> DomainResult<Option<Contact>>;

    /// List contacts, optionally paginated.
    async fn list(&self, limit: Option<u32>, offset: u32) -> DomainResult<Vec<Contact>>;

    /// Replace a contact's fields. Returns `None` if it does not exist.
    async fn update(&self, id: i64, contact: &NewContact) -> DomainResult<Option<Contact>>;

    /// Delete a contact and, by cascade, its tags, group memberships and messages.
    async fn delete(&self, id: i64) -> DomainResult<bool>;

    /// Case-insensitive substring search over names, username, phone and bio.
    async fn search(&self, query: &str, limit: u32, offset: u32) -> DomainResult<Vec<Contact>>;

    /// Whether a contact with this Telegram id exists.
    async fn exists(&self, telegram_id: i64) -> DomainResult<bool>;
}
