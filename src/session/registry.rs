//! SessionRegistry: live sessions keyed by id.
//!
//! Each session sits behind its own `tokio::sync::Mutex`, so transitions on
//! one session are serialized while sessions never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use super::manager::BlueprintSession;
use crate::error::{DatabaseError, LoadError};
use crate::flow::{FlowOptions, FlowOrchestrator, PersistedBlueprint};
use crate::graph::StageGraph;
use crate::store::{BlueprintStore, BlueprintSummary};

pub type SharedSession = Arc<Mutex<BlueprintSession>>;

pub struct SessionRegistry {
    graph: Arc<StageGraph>,
    options: FlowOptions,
    store: Arc<dyn BlueprintStore>,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(graph: Arc<StageGraph>, options: FlowOptions, store: Arc<dyn BlueprintStore>) -> Self {
        Self {
            graph,
            options,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &Arc<StageGraph> {
        &self.graph
    }

    /// Start a new session and save its initial state.
    pub async fn create(&self) -> SharedSession {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        self.create_locked(&mut sessions, id).await
    }

    /// Live session by id, resuming it from the store if needed.
    /// `Ok(None)` when the id is unknown everywhere.
    pub async fn get(&self, id: Uuid) -> Result<Option<SharedSession>, DatabaseError> {
        if let Some(session) = self.sessions.read().await.get(&id) {
            return Ok(Some(Arc::clone(session)));
        }
        let mut sessions = self.sessions.write().await;
        self.resume_locked(&mut sessions, id).await
    }

    /// Resume `id`, or start a fresh session with that id if nothing is stored.
    pub async fn open(&self, id: Uuid) -> Result<SharedSession, DatabaseError> {
        if let Some(session) = self.sessions.read().await.get(&id) {
            return Ok(Arc::clone(session));
        }
        let mut sessions = self.sessions.write().await;
        match self.resume_locked(&mut sessions, id).await? {
            Some(session) => Ok(session),
            None => Ok(self.create_locked(&mut sessions, id).await),
        }
    }

    // The slow paths below run under the map's write lock, so one id never
    // gets two live sessions and a concurrent `remove` can't interleave with
    // a resume.

    async fn create_locked(
        &self,
        sessions: &mut HashMap<Uuid, SharedSession>,
        id: Uuid,
    ) -> SharedSession {
        let flow = FlowOrchestrator::with_session_id(Arc::clone(&self.graph), self.options, id);
        let mut session = BlueprintSession::new(flow, Arc::clone(&self.store));
        session.persist().await;
        info!(session_id = %id, "Session created");
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&shared));
        shared
    }

    async fn resume_locked(
        &self,
        sessions: &mut HashMap<Uuid, SharedSession>,
        id: Uuid,
    ) -> Result<Option<SharedSession>, DatabaseError> {
        // Another task may have resumed it while we waited for the lock.
        if let Some(session) = sessions.get(&id) {
            return Ok(Some(Arc::clone(session)));
        }
        let Some(raw) = self.store.load(id).await? else {
            return Ok(None);
        };
        let shared = Arc::new(Mutex::new(self.resume_from(id, raw)));
        sessions.insert(id, Arc::clone(&shared));
        Ok(Some(shared))
    }

    /// Rebuild a session from stored JSON. A document that no longer fits the
    /// graph is replaced by a fresh session under the same id.
    fn resume_from(&self, id: Uuid, raw: serde_json::Value) -> BlueprintSession {
        let restored = PersistedBlueprint::from_json(raw).and_then(|persisted| {
            if persisted.session_id != id {
                return Err(LoadError::MalformedDocument(format!(
                    "stored under {id} but belongs to {}",
                    persisted.session_id
                )));
            }
            FlowOrchestrator::from_persisted(Arc::clone(&self.graph), self.options, &persisted)
        });

        match restored {
            Ok(flow) => {
                info!(session_id = %id, "Session resumed from store");
                BlueprintSession::new(flow, Arc::clone(&self.store))
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "Stored blueprint unusable, starting fresh");
                let flow =
                    FlowOrchestrator::with_session_id(Arc::clone(&self.graph), self.options, id);
                let mut session = BlueprintSession::new(flow, Arc::clone(&self.store));
                // The stored document is only overwritten by the next change.
                session.mark_dirty();
                session
            }
        }
    }

    /// Drop a session from memory and the store. Handles still held
    /// elsewhere keep working in memory but no longer save.
    pub async fn remove(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        let live = match sessions.remove(&id) {
            Some(session) => {
                // Waits for any in-flight call so its save lands before the delete.
                session.lock().await.mark_removed();
                true
            }
            None => false,
        };
        let stored = self.store.delete(id).await?;
        if live || stored {
            info!(session_id = %id, "Session removed");
        }
        Ok(live || stored)
    }

    pub async fn list(&self) -> Result<Vec<BlueprintSummary>, DatabaseError> {
        self.store.list_sessions().await
    }

    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowAction;
    use crate::graph::presets;
    use crate::store::InMemoryStore;

    fn registry(store: Arc<InMemoryStore>) -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(presets::sop().unwrap()),
            FlowOptions::default(),
            store,
        )
    }

    #[tokio::test]
    async fn create_persists_initial_state() {
        let store = Arc::new(InMemoryStore::new());
        let registry = registry(store.clone());
        let session = registry.create().await;
        let id = session.lock().await.id();
        assert!(store.load(id).await.unwrap().is_some());
        assert_eq!(registry.live_count().await, 1);
    }

    #[tokio::test]
    async fn get_resumes_from_store() {
        let store = Arc::new(InMemoryStore::new());
        let id = {
            let first = registry(store.clone());
            let session = first.create().await;
            let mut session = session.lock().await;
            session.submit_input("Sustainability").await.unwrap();
            session.dispatch(FlowAction::Continue).await.unwrap();
            session.id()
        };

        let second = registry(store);
        let session = second.get(id).await.unwrap().unwrap();
        let status = session.lock().await.status();
        assert_eq!(status.snapshot.step.as_deref(), Some("essentialQuestion"));
        assert_eq!(
            status.snapshot.document.get("ideation", "bigIdea"),
            Some("Sustainability")
        );
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let registry = registry(Arc::new(InMemoryStore::new()));
        assert!(registry.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_document_falls_back_to_fresh() {
        let store = Arc::new(InMemoryStore::new());
        let id = Uuid::new_v4();
        store
            .insert_raw(
                id,
                serde_json::json!({
                    "graph_id": "sop",
                    "session_id": id,
                    "current_stage": "wizard",
                    "current_step": "subject",
                    "document": {},
                    "saved_at": "2026-01-01T00:00:00Z"
                }),
            )
            .await;

        let registry = registry(store);
        let session = registry.get(id).await.unwrap().unwrap();
        let session = session.lock().await;
        assert_eq!(session.id(), id);
        assert_eq!(session.status().snapshot.stage, "ideation");
        assert!(session.save_status().dirty);
    }

    #[tokio::test]
    async fn open_creates_when_missing() {
        let store = Arc::new(InMemoryStore::new());
        let registry = registry(store.clone());
        let id = Uuid::new_v4();
        let session = registry.open(id).await.unwrap();
        assert_eq!(session.lock().await.id(), id);
        assert!(store.load(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_drops_everywhere() {
        let store = Arc::new(InMemoryStore::new());
        let registry = registry(store.clone());
        let id = registry.create().await.lock().await.id();
        assert!(registry.remove(id).await.unwrap());
        assert!(registry.get(id).await.unwrap().is_none());
        assert!(!registry.remove(id).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_get_shares_one_session() {
        let store = Arc::new(InMemoryStore::new());
        let id = registry(store.clone()).create().await.lock().await.id();

        let fresh = Arc::new(registry(store.clone()));
        let (a, b) = tokio::join!(
            tokio::spawn({
                let fresh = Arc::clone(&fresh);
                async move { fresh.get(id).await }
            }),
            tokio::spawn({
                let fresh = Arc::clone(&fresh);
                async move { fresh.get(id).await }
            }),
        );
        let a = a.unwrap().unwrap().unwrap();
        let b = b.unwrap().unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fresh.live_count().await, 1);

        {
            let mut session = a.lock().await;
            session.submit_input("Sustainability").await.unwrap();
            session.dispatch(FlowAction::Continue).await.unwrap();
        }
        b.lock().await.dispatch(FlowAction::Refine).await.unwrap();

        let raw = store.load(id).await.unwrap().unwrap();
        assert_eq!(raw["current_step"], "bigIdea");
        assert_eq!(raw["document"]["ideation"]["bigIdea"], "Sustainability");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_open_creates_once() {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(registry(store));
        let id = Uuid::new_v4();

        let (a, b) = tokio::join!(
            tokio::spawn({
                let registry = Arc::clone(&registry);
                async move { registry.open(id).await }
            }),
            tokio::spawn({
                let registry = Arc::clone(&registry);
                async move { registry.open(id).await }
            }),
        );
        let a = a.unwrap().unwrap();
        let b = b.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn removed_session_is_not_written_back() {
        let store = Arc::new(InMemoryStore::new());
        let registry = registry(store.clone());
        let held = registry.create().await;
        let id = held.lock().await.id();

        assert!(registry.remove(id).await.unwrap());
        held.lock().await.submit_input("Sustainability").await.unwrap();

        assert!(store.load(id).await.unwrap().is_none());
        assert!(registry.get(id).await.unwrap().is_none());
    }
}
