//! libSQL store: async `BlueprintStore` implementation.
//!
//! Supports local file and in-memory databases. The full persisted blueprint
//! is stored as JSON in `state`; the other columns exist for listing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::flow::PersistedBlueprint;
use crate::store::migrations;
use crate::store::traits::{BlueprintStore, BlueprintSummary};

/// libSQL-backed blueprint store.
///
/// Holds one connection reused for all operations.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(store.conn()).await?;
        info!(path = %path.display(), "Blueprint database opened");
        Ok(store)
    }

    /// In-memory database, mostly for tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(store.conn()).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse an RFC 3339 or SQLite datetime string.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

#[async_trait]
impl BlueprintStore for LibSqlStore {
    async fn save(&self, blueprint: &PersistedBlueprint) -> Result<(), DatabaseError> {
        let state = serde_json::to_string(blueprint)
            .map_err(|e| DatabaseError::Serialization(format!("save: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO blueprints (session_id, graph_id, current_stage, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(session_id) DO UPDATE SET
                     graph_id = excluded.graph_id,
                     current_stage = excluded.current_stage,
                     state = excluded.state,
                     updated_at = excluded.updated_at",
                params![
                    blueprint.session_id.to_string(),
                    blueprint.graph_id.clone(),
                    blueprint.current_stage.clone(),
                    state,
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save: {e}")))?;

        debug!(
            session_id = %blueprint.session_id,
            stage = %blueprint.current_stage,
            "Blueprint saved"
        );
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT state FROM blueprints WHERE session_id = ?1",
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("load row parse: {e}")))?;
                let value = serde_json::from_str(&raw)
                    .map_err(|e| DatabaseError::Serialization(format!("load: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load: {e}"))),
        }
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM blueprints WHERE session_id = ?1",
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete: {e}")))?;
        Ok(affected > 0)
    }

    async fn list_sessions(&self) -> Result<Vec<BlueprintSummary>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT session_id, graph_id, current_stage, updated_at
                 FROM blueprints ORDER BY updated_at DESC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_sessions: {e}")))?;

        let mut sessions = Vec::new();
        loop {
            let row = match rows.next().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_sessions: {e}"))),
            };
            let parse = |e: libsql::Error| DatabaseError::Query(format!("list_sessions row: {e}"));
            let id: String = row.get(0).map_err(parse)?;
            let graph_id: String = row.get(1).map_err(parse)?;
            let current_stage: String = row.get(2).map_err(parse)?;
            let updated_at: String = row.get(3).map_err(parse)?;

            let session_id = Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::Serialization(format!("session id {id}: {e}")))?;
            sessions.push(BlueprintSummary {
                session_id,
                graph_id,
                current_stage,
                updated_at: parse_datetime(&updated_at),
            });
        }
        Ok(sessions)
    }
}
