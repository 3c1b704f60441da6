//! `BlueprintStore` trait: async persistence boundary for sessions.
//!
//! Stores hand back raw JSON so that decoding (and the malformed-document
//! fallback) stays with the session layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::flow::PersistedBlueprint;

/// Listing entry for a stored blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlueprintSummary {
    pub session_id: Uuid,
    pub graph_id: String,
    pub current_stage: String,
    pub updated_at: DateTime<Utc>,
}

/// Backend-agnostic blueprint storage.
#[async_trait]
pub trait BlueprintStore: Send + Sync {
    /// Insert or replace the blueprint for `blueprint.session_id`.
    async fn save(&self, blueprint: &PersistedBlueprint) -> Result<(), DatabaseError>;

    /// Raw stored JSON, or `None` if the session was never saved.
    async fn load(&self, session_id: Uuid) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Remove a stored blueprint. Returns whether one existed.
    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError>;

    /// All stored blueprints, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<BlueprintSummary>, DatabaseError>;
}
