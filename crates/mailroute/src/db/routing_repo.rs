//! Rows of the `email_routing` table, one per Cloudflare rule.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

/// A local mirror of one Cloudflare email routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRow {
    pub id: String,
    pub zone_id: String,
    pub zone_name: String,
    pub alias_part: String,
    pub full_email: String,
    pub destination: String,
    pub rule_id: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RoutingRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            zone_id: row.get("zone_id")?,
            zone_name: row.get("zone_name")?,
            alias_part: row.get("alias_part")?,
            full_email: row.get("full_email")?,
            destination: row.get("destination")?,
            rule_id: row.get("rule_id")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new routing row.
pub fn insert(db: &Database, row: &RoutingRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO email_routing (id, zone_id, zone_name, alias_part, full_email,
             destination, rule_id, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.id,
                row.zone_id,
                row.zone_name,
                row.alias_part,
                row.full_email,
                row.destination,
                row.rule_id,
                row.is_active,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists every routing row, newest first.
///
/// Rows created within the same timestamp fall back to insertion order.
pub fn list(db: &Database) -> Result<Vec<RoutingRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM email_routing ORDER BY created_at DESC, rowid DESC")?;
        let rows = stmt
            .query_map([], RoutingRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds a routing row by its local ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RoutingRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM email_routing WHERE id = ?1",
                params![id],
                RoutingRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Deletes a routing row. Returns `false` when no row had that ID.
pub fn delete_by_id(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute("DELETE FROM email_routing WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    })
}
