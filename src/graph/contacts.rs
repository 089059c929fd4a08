//! Contact lookup collaborator.
//!
//! Contact CRUD lives outside this crate. The graph layer only needs to know
//! whether an id exists for the acting owner, and what to show for the other
//! end of a relationship.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, PoisonError};

use super::error::StoreError;
use super::types::{Contact, Identity};

#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// The contact with `contact_id` visible to `identity`, if any.
    async fn get_contact(
        &self,
        identity: &Identity,
        contact_id: &str,
    ) -> Result<Option<Contact>, StoreError>;
}

pub fn get_contact(
    conn: &Connection,
    owner_id: &str,
    contact_id: &str,
) -> Result<Option<Contact>, StoreError> {
    let contact = conn
        .query_row(
            "SELECT id, name, owner_id, created_at FROM contacts \
             WHERE id = ?1 AND owner_id = ?2",
            params![contact_id, owner_id],
            |row| {
                Ok(Contact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(contact)
}

/// Returns `false` if a contact with this id already exists.
pub fn insert_contact(conn: &Connection, contact: &Contact) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO contacts (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![contact.id, contact.name, contact.owner_id, contact.created_at],
    )?;
    Ok(inserted > 0)
}

pub fn all_contacts(conn: &Connection) -> Result<Vec<Contact>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, name, owner_id, created_at FROM contacts ORDER BY created_at, id")?;
    let contacts = stmt
        .query_map([], |row| {
            Ok(Contact {
                id: row.get(0)?,
                name: row.get(1)?,
                owner_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contacts)
}

/// Reads the `contacts` table, scoped to the acting owner.
#[derive(Clone)]
pub struct SqliteContacts {
    db: Arc<Mutex<Connection>>,
}

impl SqliteContacts {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactLookup for SqliteContacts {
    async fn get_contact(
        &self,
        identity: &Identity,
        contact_id: &str,
    ) -> Result<Option<Contact>, StoreError> {
        let db = Arc::clone(&self.db);
        let owner_id = identity.owner_id.clone();
        let contact_id = contact_id.to_string();
        tokio::task::spawn_blocking(move || {
            // Every write is one statement, so a panicked holder leaves no
            // half-applied state behind.
            let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
            get_contact(&conn, &owner_id, &contact_id)
        })
        .await?
    }
}
