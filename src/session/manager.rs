//! BlueprintSession: one orchestrator plus its persistence bookkeeping.
//!
//! Every successful mutation is followed by a save. Save failures are logged
//! and recorded in [`SaveStatus`]; they never roll back the flow state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{InputError, SuggestionError, TransitionRejected};
use crate::flow::{
    ActionKind, FlowAction, FlowOrchestrator, FlowSnapshot, RecoveryHint, SubmitOutcome,
    TransitionOutcome,
};
use crate::store::BlueprintStore;
use crate::suggestions::{SuggestionProvider, SuggestionQuery};

/// Persistence state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveStatus {
    /// State changed since the last successful save.
    pub dirty: bool,
    pub last_save_error: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// Everything a UI needs to render the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub snapshot: FlowSnapshot,
    /// Prompt of the current step; `None` once terminal.
    pub prompt: Option<String>,
    pub recovery_hint: RecoveryHint,
    pub available_actions: Vec<ActionKind>,
    pub save: SaveStatus,
}

pub struct BlueprintSession {
    flow: FlowOrchestrator,
    store: Arc<dyn BlueprintStore>,
    save: SaveStatus,
    /// Set once the registry deletes the session; later saves are dropped.
    removed: bool,
}

impl BlueprintSession {
    pub fn new(flow: FlowOrchestrator, store: Arc<dyn BlueprintStore>) -> Self {
        Self {
            flow,
            store,
            save: SaveStatus::default(),
            removed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.flow.session_id()
    }

    pub fn flow(&self) -> &FlowOrchestrator {
        &self.flow
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save
    }

    /// Mark the session as needing a save without saving.
    pub fn mark_dirty(&mut self) {
        self.save.dirty = true;
    }

    /// Stop persisting. Holders of a deleted session can keep using it in
    /// memory but never write it back.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub async fn submit_input(&mut self, text: &str) -> Result<SubmitOutcome, InputError> {
        let outcome = self.flow.submit_input(text)?;
        if outcome.path.is_some() {
            self.save.dirty = true;
            self.persist().await;
        }
        Ok(outcome)
    }

    pub async fn dispatch(
        &mut self,
        action: FlowAction,
    ) -> Result<TransitionOutcome, TransitionRejected> {
        let outcome = self.flow.dispatch(action)?;
        self.save.dirty = true;
        self.persist().await;
        Ok(outcome)
    }

    /// Save the current state. Returns whether the save succeeded.
    pub async fn persist(&mut self) -> bool {
        if self.removed {
            debug!(session_id = %self.id(), "Session removed, skipping save");
            return false;
        }
        let blueprint = self.flow.persisted();
        match self.store.save(&blueprint).await {
            Ok(()) => {
                self.save.dirty = false;
                self.save.last_save_error = None;
                self.save.last_saved_at = Some(blueprint.saved_at);
                debug!(session_id = %self.id(), "Session persisted");
                true
            }
            Err(e) => {
                warn!(session_id = %self.id(), error = %e, "Failed to persist blueprint");
                self.save.dirty = true;
                self.save.last_save_error = Some(e.to_string());
                false
            }
        }
    }

    /// Suggestions for the current step. Empty once terminal.
    pub async fn suggestions(
        &self,
        provider: &dyn SuggestionProvider,
    ) -> Result<Vec<String>, SuggestionError> {
        match SuggestionQuery::for_current_step(&self.flow) {
            Some(query) => provider.suggest(&query).await,
            None => Ok(Vec::new()),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            snapshot: self.flow.state(),
            prompt: self.flow.current_step_def().map(|s| s.prompt.clone()),
            recovery_hint: self.flow.recovery_hint(),
            available_actions: self.flow.available_actions(),
            save: self.save.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::DatabaseError;
    use crate::flow::{FlowOptions, PersistedBlueprint};
    use crate::graph::presets;
    use crate::store::{BlueprintSummary, InMemoryStore};

    /// Store that refuses every write.
    struct FailingStore;

    #[async_trait]
    impl BlueprintStore for FailingStore {
        async fn save(&self, _: &PersistedBlueprint) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("disk full".into()))
        }
        async fn load(&self, _: Uuid) -> Result<Option<serde_json::Value>, DatabaseError> {
            Ok(None)
        }
        async fn delete(&self, _: Uuid) -> Result<bool, DatabaseError> {
            Ok(false)
        }
        async fn list_sessions(&self) -> Result<Vec<BlueprintSummary>, DatabaseError> {
            Ok(Vec::new())
        }
    }

    fn session(store: Arc<dyn BlueprintStore>) -> BlueprintSession {
        let graph = Arc::new(presets::sop().unwrap());
        BlueprintSession::new(FlowOrchestrator::new(graph, FlowOptions::default()), store)
    }

    #[tokio::test]
    async fn mutations_are_saved() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(store.clone());

        session.submit_input("Sustainability").await.unwrap();
        session.dispatch(FlowAction::Continue).await.unwrap();

        let raw = store.load(session.id()).await.unwrap().unwrap();
        assert_eq!(raw["current_step"], "essentialQuestion");
        assert!(!session.save_status().dirty);
        assert!(session.save_status().last_saved_at.is_some());
    }

    #[tokio::test]
    async fn rejected_calls_do_not_save() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(store.clone());

        session.submit_input("").await.unwrap_err();
        session.dispatch(FlowAction::Continue).await.unwrap_err();
        assert!(store.load(session.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_failure_keeps_state_and_reports() {
        let mut session = session(Arc::new(FailingStore));

        session.submit_input("Sustainability").await.unwrap();
        session.dispatch(FlowAction::Continue).await.unwrap();

        assert_eq!(session.status().snapshot.step.as_deref(), Some("essentialQuestion"));
        let save = session.save_status();
        assert!(save.dirty);
        assert!(save.last_save_error.as_deref().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn removed_session_is_not_saved() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(store.clone());
        session.mark_removed();

        session.submit_input("Sustainability").await.unwrap();
        assert!(store.load(session.id()).await.unwrap().is_none());
        assert!(session.save_status().dirty);
        assert!(!session.persist().await);
    }

    #[tokio::test]
    async fn status_carries_prompt_and_actions() {
        let session = session(Arc::new(InMemoryStore::new()));
        let status = session.status();
        assert!(status.prompt.is_some());
        assert_eq!(status.recovery_hint, RecoveryHint::None);
        assert!(status.available_actions.contains(&ActionKind::Restart));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["stage"], "ideation");
        assert_eq!(json["save"]["dirty"], false);
    }
}
