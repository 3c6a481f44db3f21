//! SQLite implementation of the ContactRepository.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use super::connection::{DatabaseHandle, SqlValue};
use super::{is_unique_violation, parse_timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Contact, NewContact};
use crate::domain::ports::ContactRepository;

pub(super) const CONTACT_COLUMNS: &str = "contacts.id, contacts.telegram_id, contacts.username, \
     contacts.first_name, contacts.last_name, contacts.display_name, contacts.phone, \
     contacts.profile_photo_path, contacts.bio, contacts.created_at, contacts.updated_at";

/// Queries shorter than this (after trimming) match nothing.
const MIN_SEARCH_LEN: usize = 2;

pub struct SqliteContactRepository {
    db: Arc<DatabaseHandle>,
}

impl SqliteContactRepository {
    pub fn new(db: Arc<DatabaseHandle>) -> Self {
        Self { db }
    }
}

fn contact_params(contact: &NewContact) -> Vec<SqlValue> {
    vec![
        contact.telegram_id.into(),
        contact.username.clone().into(),
        contact.first_name.clone().into(),
        contact.last_name.clone().into(),
        contact.display_name.clone().into(),
        contact.phone.clone().into(),
        contact.profile_photo_path.clone().into(),
        contact.bio.clone().into(),
    ]
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn create(&self, contact: &NewContact) -> DomainResult<Contact> {
        contact.validate().map_err(DomainError::ValidationFailed)?;

        let result = self
            .db
            .execute(
                "INSERT INTO contacts (telegram_id, username, first_name, last_name, display_name, phone, profile_photo_path, bio)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                &contact_params(contact),
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateContact(contact.telegram_id)
                } else {
                    e.into()
                }
            })?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or(DomainError::ContactNotFound(id))
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Contact>> {
        let row = self
            .db
            .fetch_one(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"), &[id.into()])
            .await?;

        row.as_ref().map(decode_contact).transpose()
    }

    async fn get_by_telegram_id(&self, telegram_id: i64) -> DomainResult<Option<Contact>> {
        let row = self
            .db
            .fetch_one(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE telegram_id = ?"),
                &[telegram_id.into()],
            )
            .await?;

        row.as_ref().map(decode_contact).transpose()
    }

    async fn list(&self, limit: Option<u32>, offset: u32) -> DomainResult<Vec<Contact>> {
        let rows = match limit {
            Some(limit) => {
                self.db
                    .fetch_all(
                        &format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id LIMIT ? OFFSET ?"),
                        &[i64::from(limit).into(), i64::from(offset).into()],
                    )
                    .await?
            }
            None => {
                self.db
                    .fetch_all(&format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id"), &[])
                    .await?
            }
        };

        decode_contacts(&rows)
    }

    async fn update(&self, id: i64, contact: &NewContact) -> DomainResult<Option<Contact>> {
        contact.validate().map_err(DomainError::ValidationFailed)?;

        let mut params = contact_params(contact);
        params.push(id.into());

        let result = self
            .db
            .execute(
                "UPDATE contacts SET telegram_id = ?, username = ?, first_name = ?, last_name = ?,
                 display_name = ?, phone = ?, profile_photo_path = ?, bio = ?
                 WHERE id = ?",
                &params,
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateContact(contact.telegram_id)
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
        let result = self
            .db
            .execute("DELETE FROM contacts WHERE id = ?", &[id.into()])
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &str, limit: u32, offset: u32) -> DomainResult<Vec<Contact>> {
        if query.trim().chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", query.to_lowercase());
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE lower(username) LIKE ?1 OR lower(first_name) LIKE ?1
                        OR lower(last_name) LIKE ?1 OR lower(display_name) LIKE ?1
                        OR lower(phone) LIKE ?1 OR lower(bio) LIKE ?1
                     ORDER BY id LIMIT ?2 OFFSET ?3"
                ),
                &[pattern.into(), i64::from(limit).into(), i64::from(offset).into()],
            )
            .await?;

        decode_contacts(&rows)
    }

    async fn exists(&self, telegram_id: i64) -> DomainResult<bool> {
        let row = self
            .db
            .fetch_one("SELECT 1 FROM contacts WHERE telegram_id = ?", &[telegram_id.into()])
            .await?;
        Ok(row.is_some())
    }
}

pub(super) fn decode_contact(row: &SqliteRow) -> DomainResult<Contact> {
    ContactRow::from_row(row)?.try_into()
}

pub(super) fn decode_contacts(rows: &[SqliteRow]) -> DomainResult<Vec<Contact>> {
    rows.iter().map(decode_contact).collect()
}

#[derive(FromRow)]
struct ContactRow {
    id: i64,
    telegram_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: String,
    phone: Option<String>,
    profile_photo_path: Option<String>,
    bio: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ContactRow> for Contact {
    type Error = DomainError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            telegram_id: row.telegram_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            phone: row.phone,
            profile_photo_path: row.profile_photo_path,
            bio: row.bio,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_db;

    async fn setup_test_repo() -> SqliteContactRepository {
        SqliteContactRepository::new(create_migrated_test_db().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get_contact() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&NewContact::new(1001, "Alice Smith").with_username("alice"))
            .await
            .unwrap();
        assert_eq!(created.telegram_id, 1001);

        let retrieved = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(retrieved, created);

        let by_telegram = repo.get_by_telegram_id(1001).await.unwrap().unwrap();
        assert_eq!(by_telegram.id, created.id);
        assert!(repo.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_telegram_id_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&NewContact::new(7, "First")).await.unwrap();

        let result = repo.create(&NewContact::new(7, "Second")).await;
        assert!(matches!(result, Err(DomainError::DuplicateContact(7))));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_display_name() {
        let repo = setup_test_repo().await;
        let result = repo.create(&NewContact::new(1, "")).await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_list_with_pagination() {
        let repo = setup_test_repo().await;
        for i in 1..=5 {
            repo.create(&NewContact::new(i, format!("Contact {i}"))).await.unwrap();
        }

        assert_eq!(repo.list(None, 0).await.unwrap().len(), 5);

        let page = repo.list(Some(2), 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|c| c.telegram_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_update_contact() {
        let repo = setup_test_repo().await;
        let created = repo.create(&NewContact::new(5, "Old Name")).await.unwrap();

        let mut changes = NewContact::from(&created);
        changes.display_name = "New Name".to_string();
        changes.bio = Some("likes rust".to_string());

        let updated = repo.update(created.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.display_name, "New Name");
        assert_eq!(updated.bio.as_deref(), Some("likes rust"));

        assert!(repo.update(9999, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_contact() {
        let repo = setup_test_repo().await;
        let created = repo.create(&NewContact::new(5, "Gone")).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(!repo.exists(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_search() {
        let repo = setup_test_repo().await;
        repo.create(&NewContact::new(1, "Alice Smith").with_username("alice_s"))
            .await
            .unwrap();
        repo.create(&NewContact::new(2, "Bob").with_bio("Works with ALICE"))
            .await
            .unwrap();
        repo.create(&NewContact::new(3, "Carol").with_phone("+15550100"))
            .await
            .unwrap();

        assert_eq!(repo.search("alice", 50, 0).await.unwrap().len(), 2);
        assert_eq!(repo.search("5550", 50, 0).await.unwrap().len(), 1);
        assert_eq!(repo.search("alice", 1, 1).await.unwrap().len(), 1);
        assert!(repo.search(" a ", 50, 0).await.unwrap().is_empty());
        assert!(repo.search("", 50, 0).await.unwrap().is_empty());
    }
}
