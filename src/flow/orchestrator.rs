//! FlowOrchestrator: owns one session's flow state and is its only writer.
//!
//! Inputs go through `submit_input`, navigation through `dispatch`. Both are
//! synchronous and atomic: a rejected call leaves the flow state exactly as
//! it was. Observers registered with `subscribe` run after every successful
//! mutation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::action::{ActionKind, FlowAction};
use super::events::{FlowEvent, FlowEventKind, Subscribers, Subscription};
use super::guard::{self, Decision, GuardPolicy};
use super::persisted::PersistedBlueprint;
use super::state::{FlowSnapshot, FlowState, Interaction, Position};
use super::stuck::{self, InteractionCounters, RecoveryHint, StuckThresholds};
use super::validation::validate_answer;
use crate::document::{Document, DocumentPath};
use crate::error::{InputError, LoadError, TransitionRejected};
use crate::graph::{StageGraph, StepDef};

/// Per-session knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowOptions {
    pub policy: GuardPolicy,
    pub thresholds: StuckThresholds,
}

/// Result of a successful `submit_input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Where the answer went; `None` when a clarify step got empty input.
    pub path: Option<DocumentPath>,
    /// Whether the document content changed.
    pub changed: bool,
}

/// Result of a successful `dispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub action: FlowAction,
    pub from_stage: String,
    pub from_step: Option<String>,
    pub stage: String,
    pub step: Option<String>,
    pub stage_step: usize,
    /// Stage newly marked completed by this transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_stage: Option<String>,
}

/// Drives one authoring session through its stage graph.
#[derive(Debug)]
pub struct FlowOrchestrator {
    graph: Arc<StageGraph>,
    options: FlowOptions,
    state: FlowState,
    counters: InteractionCounters,
    subscribers: Subscribers,
}

impl FlowOrchestrator {
    /// Start a new session at the first step of `graph`.
    pub fn new(graph: Arc<StageGraph>, options: FlowOptions) -> Self {
        Self::with_session_id(graph, options, Uuid::new_v4())
    }

    pub fn with_session_id(graph: Arc<StageGraph>, options: FlowOptions, session_id: Uuid) -> Self {
        let state = FlowState::new(&graph, session_id);
        info!(
            session_id = %session_id,
            graph = graph.id(),
            "Blueprint session created"
        );
        Self {
            graph,
            options,
            state,
            counters: InteractionCounters::new(Utc::now()),
            subscribers: Subscribers::new(),
        }
    }

    /// Build an orchestrator directly from persisted state.
    pub fn from_persisted(
        graph: Arc<StageGraph>,
        options: FlowOptions,
        persisted: &PersistedBlueprint,
    ) -> Result<Self, LoadError> {
        let state = persisted.restore(&graph)?;
        info!(
            session_id = %state.session_id(),
            stage = %persisted.current_stage,
            "Blueprint session resumed"
        );
        Ok(Self {
            graph,
            options,
            state,
            counters: InteractionCounters::new(Utc::now()),
            subscribers: Subscribers::new(),
        })
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub fn session_id(&self) -> Uuid {
        self.state.session_id()
    }

    /// Borrow the live state. Read-only; use `state()` for an owned snapshot.
    pub fn flow_state(&self) -> &FlowState {
        &self.state
    }

    pub fn current_step_def(&self) -> Option<&StepDef> {
        self.graph.step_at(self.state.position().step_ref()?)
    }

    /// Capture an answer for the current step. Never advances.
    pub fn submit_input(&mut self, raw: &str) -> Result<SubmitOutcome, InputError> {
        let now = Utc::now();
        let Some(pos) = self.state.position().step_ref() else {
            return Err(InputError::Terminal);
        };
        let (Some(stage), Some(step)) = (self.graph.stage_at(pos.stage), self.graph.step_at(pos))
        else {
            return Err(InputError::Terminal);
        };

        let answer = match validate_answer(step, raw) {
            Ok(answer) => answer,
            Err(e) => {
                if e.is_empty_submission() {
                    self.counters.record_empty(now);
                } else {
                    self.counters.record_invalid(now);
                }
                debug!(
                    session_id = %self.session_id(),
                    step = %step.id,
                    error = %e,
                    "Input rejected"
                );
                return Err(e);
            }
        };

        let Some(text) = answer else {
            self.counters.reset(now);
            return Ok(SubmitOutcome {
                path: None,
                changed: false,
            });
        };

        let path = DocumentPath::new(&stage.id, &step.document_path);
        let changed = self.state.document.write(&path, text.clone());
        self.state.log(&self.graph, Interaction::Input { text });
        self.counters.reset(now);

        debug!(
            session_id = %self.session_id(),
            path = %path,
            changed,
            "Input captured"
        );

        self.emit(FlowEventKind::InputCaptured {
            path: path.to_string(),
            changed,
        });

        Ok(SubmitOutcome {
            path: Some(path),
            changed,
        })
    }

    /// Dry-run the guard for `action`.
    pub fn check(&self, action: FlowAction) -> Decision {
        guard::evaluate(&self.graph, &self.state, action, self.options.policy)
    }

    /// Actions the guard would allow right now (restart is always among them).
    pub fn available_actions(&self) -> Vec<ActionKind> {
        [
            ActionKind::Continue,
            ActionKind::Back,
            ActionKind::Skip,
            ActionKind::Refine,
            ActionKind::Restart,
        ]
        .into_iter()
        .filter(|kind| self.check(kind.into_action(false)).is_allowed())
        .collect()
    }

    /// Apply `action` if the guard allows it.
    pub fn dispatch(&mut self, action: FlowAction) -> Result<TransitionOutcome, TransitionRejected> {
        let effect = match self.check(action) {
            Decision::Allowed(effect) => effect,
            Decision::Rejected(reason) => {
                debug!(
                    session_id = %self.session_id(),
                    action = %action,
                    reason = %reason,
                    "Transition rejected"
                );
                return Err(TransitionRejected {
                    action: action.kind(),
                    reason,
                });
            }
        };

        let from_stage = self.state.stage_id(&self.graph).to_string();
        let from_step = self.state.step_id(&self.graph).map(str::to_string);

        // Logged against the position the action was taken from.
        self.state.log(&self.graph, Interaction::Action { action });

        if effect.clear_completed {
            self.state.completed_stages.clear();
        }
        if effect.wipe_document {
            self.state.document.clear();
        }
        let mut completed_stage = None;
        if let Some(stage) = effect.leaves_stage.and_then(|i| self.graph.stage_at(i)) {
            if self.state.document.is_stage_satisfied(stage)
                && self.state.completed_stages.insert(stage.id.clone())
            {
                completed_stage = Some(stage.id.clone());
            }
        }
        self.state.position = effect.to;
        self.counters.reset(Utc::now());

        let outcome = TransitionOutcome {
            action,
            from_stage,
            from_step,
            stage: self.state.stage_id(&self.graph).to_string(),
            step: self.state.step_id(&self.graph).map(str::to_string),
            stage_step: self.state.stage_step(),
            completed_stage,
        };

        info!(
            session_id = %self.session_id(),
            action = %action,
            from = %outcome.from_stage,
            to = %outcome.stage,
            stage_step = outcome.stage_step,
            "Flow transition"
        );
        if effect.to == Position::Completed {
            info!(session_id = %self.session_id(), "Blueprint completed");
        }

        self.emit(FlowEventKind::Transitioned {
            action,
            from_stage: outcome.from_stage.clone(),
            to_stage: outcome.stage.clone(),
        });

        Ok(outcome)
    }

    /// Register an observer for state changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FlowEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Deep copy of the blueprint document.
    pub fn export_document(&self) -> Document {
        self.state.document.snapshot()
    }

    pub fn export_json(&self) -> serde_json::Value {
        self.state.document.to_json()
    }

    /// Replace the session's state with persisted data. On error nothing
    /// changes and the orchestrator stays usable.
    pub fn load_from(&mut self, persisted: &PersistedBlueprint) -> Result<(), LoadError> {
        let state = persisted.restore(&self.graph)?;
        self.state = state;
        self.counters.reset(Utc::now());
        info!(
            session_id = %self.session_id(),
            stage = %persisted.current_stage,
            "Blueprint state loaded"
        );
        self.emit(FlowEventKind::Loaded);
        Ok(())
    }

    /// Owned read-only view for rendering.
    pub fn state(&self) -> FlowSnapshot {
        self.state.snapshot(&self.graph)
    }

    /// Serialized form for the persistence adapter.
    pub fn persisted(&self) -> PersistedBlueprint {
        PersistedBlueprint::capture(&self.graph, &self.state)
    }

    pub fn interaction_counters(&self) -> &InteractionCounters {
        &self.counters
    }

    pub fn recovery_hint(&self) -> RecoveryHint {
        self.recovery_hint_at(Utc::now())
    }

    pub fn recovery_hint_at(&self, now: DateTime<Utc>) -> RecoveryHint {
        if self.state.is_terminal() {
            return RecoveryHint::None;
        }
        let skippable = self.options.policy.allow_skip_required
            || self.current_step_def().is_some_and(StepDef::is_skippable);
        let signals = self.counters.signals(now, skippable);
        stuck::recommend(&signals, &self.options.thresholds)
    }

    fn emit(&self, kind: FlowEventKind) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = FlowEvent {
            kind,
            snapshot: self.state(),
        };
        self.subscribers.notify(&event);
    }
}
