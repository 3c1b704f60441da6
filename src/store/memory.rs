//! In-memory `BlueprintStore`, used by tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::flow::PersistedBlueprint;
use crate::store::traits::{BlueprintStore, BlueprintSummary};

struct Entry {
    summary: BlueprintSummary,
    state: serde_json::Value,
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON under `session_id`, bypassing serialization. Lets tests
    /// plant documents that no longer match the graph.
    pub async fn insert_raw(&self, session_id: Uuid, state: serde_json::Value) {
        let summary = BlueprintSummary {
            session_id,
            graph_id: state["graph_id"].as_str().unwrap_or_default().to_string(),
            current_stage: state["current_stage"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            updated_at: Utc::now(),
        };
        self.entries
            .write()
            .await
            .insert(session_id, Entry { summary, state });
    }
}

#[async_trait]
impl BlueprintStore for InMemoryStore {
    async fn save(&self, blueprint: &PersistedBlueprint) -> Result<(), DatabaseError> {
        let state = serde_json::to_value(blueprint)
            .map_err(|e| DatabaseError::Serialization(format!("save: {e}")))?;
        let summary = BlueprintSummary {
            session_id: blueprint.session_id,
            graph_id: blueprint.graph_id.clone(),
            current_stage: blueprint.current_stage.clone(),
            updated_at: Utc::now(),
        };
        self.entries
            .write()
            .await
            .insert(blueprint.session_id, Entry { summary, state });
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<serde_json::Value>, DatabaseError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&session_id)
            .map(|e| e.state.clone()))
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.entries.write().await.remove(&session_id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<BlueprintSummary>, DatabaseError> {
        let mut sessions: Vec<BlueprintSummary> = self
            .entries
            .read()
            .await
            .values()
            .map(|e| e.summary.clone())
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at));
        Ok(sessions)
    }
}
