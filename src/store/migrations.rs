//! Version-tracked database migrations for the libSQL store.
//!
//! Each migration has a version number and SQL. `run_migrations()` reads the
//! highest applied version from `_migrations` and applies only newer ones.

use libsql::Connection;
use tracing::info;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Append only.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "blueprints",
        sql: r#"
            CREATE TABLE IF NOT EXISTS blueprints (
                session_id TEXT PRIMARY KEY,
                graph_id TEXT NOT NULL,
                current_stage TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "blueprint_indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_blueprints_graph ON blueprints(graph_id);
            CREATE INDEX IF NOT EXISTS idx_blueprints_updated ON blueprints(updated_at);
        "#,
    },
];

/// Run all pending migrations against `conn`.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        conn.execute_batch(migration.sql).await.map_err(|e| {
            DatabaseError::Migration(format!(
                "Migration V{} ({}) failed: {e}",
                migration.version, migration.name
            ))
        })?;
        record_version(conn, migration.version, migration.name).await?;
    }

    Ok(())
}

/// Highest applied migration version, or 0 if none.
pub async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
