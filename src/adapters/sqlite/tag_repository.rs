//! SQLite implementation of the TagRepository.
//!
//! Associations live in `contact_tags`; deleting either a contact or a tag
//! removes its rows there through `ON DELETE CASCADE`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::connection::{DatabaseHandle, SqlValue};
use super::contact_repository::{decode_contacts, CONTACT_COLUMNS};
use super::{is_unique_violation, parse_timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Contact, NewTag, Tag};
use crate::domain::ports::TagRepository;

const TAG_COLUMNS: &str = "tags.id, tags.name, tags.color, tags.created_at";

pub struct SqliteTagRepository {
    db: Arc<DatabaseHandle>,
}

impl SqliteTagRepository {
    pub fn new(db: Arc<DatabaseHandle>) -> Self {
        Self { db }
    }

    async fn contact_exists(&self, contact_id: i64) -> DomainResult<bool> {
        let row = self
            .db
            .fetch_one("SELECT 1 FROM contacts WHERE id = ?", &[contact_id.into()])
            .await?;
        Ok(row.is_some())
    }

    async fn count(&self, query: &str, id: i64) -> DomainResult<i64> {
        let row = self.db.fetch_one(query, &[id.into()]).await?;
        Ok(match row {
            Some(row) => row.try_get::<i64, _>(0)?,
            None => 0,
        })
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn create(&self, tag: &NewTag) -> DomainResult<Tag> {
        tag.validate().map_err(DomainError::ValidationFailed)?;

        let result = self
            .db
            .execute(
                "INSERT INTO tags (name, color) VALUES (?, ?)",
                &[tag.name.as_str().into(), tag.color.clone().into()],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateTag(tag.name.clone())
                } else {
                    e.into()
                }
            })?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or(DomainError::TagNotFound(id))
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Tag>> {
        let row = self
            .db
            .fetch_one(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?"), &[id.into()])
            .await?;

        row.as_ref().map(decode_tag).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Tag>> {
        let row = self
            .db
            .fetch_one(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE lower(name) = lower(?)"),
                &[name.into()],
            )
            .await?;

        row.as_ref().map(decode_tag).transpose()
    }

    async fn list(&self, limit: Option<u32>, offset: u32) -> DomainResult<Vec<Tag>> {
        let rows = match limit {
            Some(limit) => {
                self.db
                    .fetch_all(
                        &format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name LIMIT ? OFFSET ?"),
                        &[i64::from(limit).into(), i64::from(offset).into()],
                    )
                    .await?
            }
            None => {
                self.db
                    .fetch_all(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"), &[])
                    .await?
            }
        };

        rows.iter().map(decode_tag).collect()
    }

    async fn update(&self, id: i64, tag: &NewTag) -> DomainResult<Option<Tag>> {
        tag.validate().map_err(DomainError::ValidationFailed)?;

        let result = self
            .db
            .execute(
                "UPDATE tags SET name = ?, color = ? WHERE id = ?",
                &[tag.name.as_str().into(), tag.color.clone().into(), id.into()],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateTag(tag.name.clone())
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> DomainResult<bool> {
        let result = self.db.execute("DELETE FROM tags WHERE id = ?", &[id.into()]).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn tags_for_contact(&self, contact_id: i64) -> DomainResult<Vec<Tag>> {
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT {TAG_COLUMNS} FROM tags
                     JOIN contact_tags ON tags.id = contact_tags.tag_id
                     WHERE contact_tags.contact_id = ?
                     ORDER BY tags.name"
                ),
                &[contact_id.into()],
            )
            .await?;

        rows.iter().map(decode_tag).collect()
    }

    async fn add_tag_to_contact(&self, contact_id: i64, tag_id: i64) -> DomainResult<bool> {
        if !self.contact_exists(contact_id).await? {
            return Err(DomainError::ContactNotFound(contact_id));
        }
        if self.get(tag_id).await?.is_none() {
            return Err(DomainError::TagNotFound(tag_id));
        }

        let result = self
            .db
            .execute(
                "INSERT OR IGNORE INTO contact_tags (contact_id, tag_id) VALUES (?, ?)",
                &[contact_id.into(), tag_id.into()],
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_tag_from_contact(&self, contact_id: i64, tag_id: i64) -> DomainResult<bool> {
        let result = self
            .db
            .execute(
                "DELETE FROM contact_tags WHERE contact_id = ? AND tag_id = ?",
                &[contact_id.into(), tag_id.into()],
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn contacts_by_tag(&self, tag_id: i64) -> DomainResult<Vec<Contact>> {
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     JOIN contact_tags ON contacts.id = contact_tags.contact_id
                     WHERE contact_tags.tag_id = ?
                     ORDER BY contacts.display_name"
                ),
                &[tag_id.into()],
            )
            .await?;

        decode_contacts(&rows)
    }

    async fn contacts_by_tags(&self, tag_ids: &[i64]) -> DomainResult<Vec<Contact>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; tag_ids.len()].join(", ");
        let params: Vec<SqlValue> = tag_ids.iter().map(|&id| id.into()).collect();
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT DISTINCT {CONTACT_COLUMNS} FROM contacts
                     JOIN contact_tags ON contacts.id = contact_tags.contact_id
                     WHERE contact_tags.tag_id IN ({placeholders})
                     ORDER BY contacts.display_name"
                ),
                &params,
            )
            .await?;

        decode_contacts(&rows)
    }

    async fn tag_count_for_contact(&self, contact_id: i64) -> DomainResult<i64> {
        self.count("SELECT COUNT(*) FROM contact_tags WHERE contact_id = ?", contact_id)
            .await
    }

    async fn contact_count_for_tag(&self, tag_id: i64) -> DomainResult<i64> {
        self.count("SELECT COUNT(*) FROM contact_tags WHERE tag_id = ?", tag_id)
            .await
    }

    async fn exists_by_name(&self, name: &str) -> DomainResult<bool> {
        Ok(self.get_by_name(name).await?.is_some())
    }
}

fn decode_tag(row: &SqliteRow) -> DomainResult<Tag> {
    TagRow::from_row(row)?.try_into()
}

#[derive(FromRow)]
struct TagRow {
    id: i64,
    name: String,
    color: Option<String>,
    created_at: String,
}

impl TryFrom<TagRow> for Tag {
    type Error = DomainError;

    fn try_from(row: TagRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            color: row.color,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
