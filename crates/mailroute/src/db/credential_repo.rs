//! The single-row `cloudflare_config` table.
//!
//! Values are stored exactly as handed in; encryption and masking happen in
//! [`crate::credentials`].

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// Primary key of the only row the table can hold.
const SINGLETON_ID: i64 = 1;

/// A raw credential row from the database.
#[derive(Clone)]
pub struct CredentialRow {
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    /// JSON array of destination addresses.
    pub destination_emails: String,
    /// Whether the five secret columns hold ciphertext.
    pub encrypted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for CredentialRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRow")
            .field("destination_emails", &self.destination_emails)
            .field("encrypted", &self.encrypted)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl CredentialRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            api_token: row.get("api_token")?,
            account_id: row.get("account_id")?,
            d1_database: row.get("d1_database")?,
            worker_api: row.get("worker_api")?,
            kv_storage: row.get("kv_storage")?,
            destination_emails: row.get("destination_emails")?,
            encrypted: row.get("encrypted")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Returns the stored credential row, if one has been saved.
pub fn find(db: &Database) -> Result<Option<CredentialRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM cloudflare_config WHERE id = ?1",
                params![SINGLETON_ID],
                CredentialRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Creates the row or overwrites every column of the existing one.
///
/// `created_at` is only written on first insert.
pub fn upsert(db: &Database, row: &CredentialRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO cloudflare_config (id, api_token, account_id, d1_database, worker_api,
             kv_storage, destination_emails, encrypted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               api_token = ?2,
               account_id = ?3,
               d1_database = ?4,
               worker_api = ?5,
               kv_storage = ?6,
               destination_emails = ?7,
               encrypted = ?8,
               updated_at = ?10",
            params![
                SINGLETON_ID,
                row.api_token,
                row.account_id,
                row.d1_database,
                row.worker_api,
                row.kv_storage,
                row.destination_emails,
                row.encrypted,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    })
}
