//! Versioned schema migrations, recorded in `_migrations`.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Ascending by version.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_cloudflare_config_table",
        sql: include_str!("sql/001_create_cloudflare_config.sql"),
    },
    Migration {
        version: 2,
        description: "create_email_routing_table",
        sql: include_str!("sql/002_create_email_routing.sql"),
    },
];

/// Applies every migration newer than the recorded schema version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied = schema_version(conn)?;
    let latest = MIGRATIONS.last().map_or(0, |m| m.version);
    if applied > latest {
        return Err(DatabaseError::SchemaTooNew {
            found: applied,
            supported: latest,
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        apply(conn, migration)?;
    }

    log::debug!("Schema at v{}", latest);
    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?)
}

/// Runs one migration and records it, atomically.
fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    log::info!(
        "Applying migration v{} ({})",
        migration.version,
        migration.description
    );

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)
        .map_err(|e| DatabaseError::Migration {
            version: migration.version,
            reason: e.to_string(),
        })?;
    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )?;
    tx.commit()?;
    Ok(())
}
