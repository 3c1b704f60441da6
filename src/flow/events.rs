//! Flow events and the synchronous subscriber registry.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;

use super::action::FlowAction;
use super::state::FlowSnapshot;

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEventKind {
    /// An answer was captured at `path` (`changed == false` for an identical
    /// re-submission).
    InputCaptured { path: String, changed: bool },
    /// A navigation action was applied.
    Transitioned {
        action: FlowAction,
        from_stage: String,
        to_stage: String,
    },
    /// State was replaced from persisted data.
    Loaded,
}

/// Event delivered to subscribers after every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEvent {
    pub kind: FlowEventKind,
    pub snapshot: FlowSnapshot,
}

type Callback = Arc<dyn Fn(&FlowEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking subscriber can't leave the registry half-updated.
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscriber list owned by one orchestrator.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<Registry>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. It runs synchronously on the mutating call.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FlowEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every subscriber. Callbacks are collected first so a callback
    /// may unsubscribe without deadlocking.
    pub fn notify(&self, event: &FlowEvent) {
        let callbacks: Vec<Callback> = lock(&self.inner)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers").field("len", &self.len()).finish()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the subscription alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the subscriber. Idempotent; returns whether anything was removed.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(id, _)| *id != self.id);
        registry.callbacks.len() != before
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.next_id)
            .field("len", &self.callbacks.len())
            .finish()
    }
}
