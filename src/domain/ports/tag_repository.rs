//! Tag repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Contact, NewTag, Tag};

/// Repository interface for tags and the contact-tag association.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag. Fails with `DuplicateTag` if the name is taken.
    async fn create(&self, tag: &NewTag) -> DomainResult<Tag>;

    async fn get(&self, id: i64) -> DomainResult<Option<Tag>>;

    /// Case-insensitive lookup by name.
    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Tag>>;

    /// All tags ordered by name, optionally paginated.
    async fn list(&self, limit: Option<u32>, offset: u32) -> DomainResult<Vec<Tag>>;

    /// Returns `None` if the tag does not exist.
    async fn update(&self, id: i64, tag: &NewTag) -> DomainResult<Option<Tag>>;

    /// Delete a tag; its contact associations go with it.
    async fn delete(&self, id: i64) -> DomainResult<bool>;

    /// Tags attached to a contact, ordered by name.
    async fn tags_for_contact(&self, contact_id: i64) -> DomainResult<Vec<Tag>>;

    /// Attach a tag. `false` if already attached; not-found errors if
    /// either side is missing.
    async fn add_tag_to_contact(&self, contact_id: i64, tag_id: i64) -> DomainResult<bool>;

    /// Detach a tag. `false` if it was not attached.
    async fn remove_tag_from_contact(&self, contact_id: i64, tag_id: i64) -> DomainResult<bool>;

    /// Contacts carrying a tag, ordered by display name.
    async fn contacts_by_tag(&self, tag_id: i64) -> DomainResult<Vec<Contact>>;

    /// Contacts carrying any of the tags, each once, ordered by display name.
    async fn contacts_by_tags(&self, tag_ids: &[i64]) -> DomainResult<Vec<Contact>>;

    async fn tag_count_for_contact(&self, contact_id: i64) -> DomainResult<i64>;

    async fn contact_count_for_tag(&self, tag_id: i64) -> DomainResult<i64>;

    async fn exists_by_name(&self, name: &str) -> DomainResult<bool>;
}
