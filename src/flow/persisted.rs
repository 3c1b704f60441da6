//! Persisted blueprint: the serialized form of a flow state.
//!
//! This is what persistence adapters store and what `load_from` accepts.
//! Restoring validates everything against the current stage graph and never
//! coerces unknown stages or steps into some other position.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{FlowState, InteractionEntry, Position};
use crate::document::Document;
use crate::error::LoadError;
use crate::graph::{COMPLETED_STAGE, StageGraph};

/// Current serialization format version.
pub const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// Serialized flow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBlueprint {
    #[serde(default = "default_version")]
    pub version: u32,
    pub graph_id: String,
    pub session_id: Uuid,
    pub current_stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Absent in bare exports; recomputed from the document on restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_stages: Option<Vec<String>>,
    pub document: Document,
    #[serde(default)]
    pub interaction_log: Vec<InteractionEntry>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedBlueprint {
    /// Capture `state` for storage.
    pub fn capture(graph: &StageGraph, state: &FlowState) -> Self {
        let completed_stages = graph
            .stages()
            .iter()
            .filter(|s| state.completed_stages.contains(&s.id))
            .map(|s| s.id.clone())
            .collect();

        Self {
            version: FORMAT_VERSION,
            graph_id: graph.id().to_string(),
            session_id: state.session_id,
            current_stage: state.stage_id(graph).to_string(),
            current_step: state.step_id(graph).map(str::to_string),
            completed_stages: Some(completed_stages),
            document: state.document.snapshot(),
            interaction_log: state.interaction_log.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Build from an exported document plus the recorded position.
    ///
    /// An export carries no completion record, so `restore` derives it from
    /// the document: only satisfied stages before the current one count. A
    /// stage re-entered with `back` therefore reloads as not completed, and
    /// progress can read lower than it did live. Use [`Self::capture`] when
    /// the exact completion set matters.
    pub fn from_export(
        graph_id: impl Into<String>,
        session_id: Uuid,
        document: Document,
        current_stage: impl Into<String>,
        current_step: Option<String>,
    ) -> Self {
        Self {
            version: FORMAT_VERSION,
            graph_id: graph_id.into(),
            session_id,
            current_stage: current_stage.into(),
            current_step,
            completed_stages: None,
            document,
            interaction_log: Vec::new(),
            saved_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, LoadError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Rebuild a flow state, checking every reference against `graph`.
    pub fn restore(&self, graph: &StageGraph) -> Result<FlowState, LoadError> {
        if self.version != FORMAT_VERSION {
            return Err(malformed(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        if self.graph_id != graph.id() {
            return Err(malformed(format!(
                "document was written for graph {}, not {}",
                self.graph_id,
                graph.id()
            )));
        }

        let position = self.resolve_position(graph)?;

        for (stage_id, key) in self.document.paths() {
            let stage = graph
                .stage(stage_id)
                .map_err(|_| malformed(format!("unknown stage {stage_id} in document")))?;
            if !stage.steps.iter().any(|s| s.document_path == key) {
                return Err(malformed(format!(
                    "unknown document path {stage_id}.{key}"
                )));
            }
        }

        let completed_stages = match &self.completed_stages {
            Some(stages) => {
                let mut set = BTreeSet::new();
                for stage in stages {
                    graph
                        .stage(stage)
                        .map_err(|_| malformed(format!("unknown completed stage {stage}")))?;
                    set.insert(stage.clone());
                }
                set
            }
            None => self.derive_completed(graph, position),
        };

        Ok(FlowState {
            session_id: self.session_id,
            position,
            completed_stages,
            document: self.document.snapshot(),
            interaction_log: self.interaction_log.clone(),
        })
    }

    fn resolve_position(&self, graph: &StageGraph) -> Result<Position, LoadError> {
        if self.current_stage == COMPLETED_STAGE {
            return match &self.current_step {
                None => Ok(Position::Completed),
                Some(step) => Err(malformed(format!(
                    "terminal stage has no steps, found {step}"
                ))),
            };
        }

        let step = self.current_step.as_deref().ok_or_else(|| {
            malformed(format!("no current step recorded for {}", self.current_stage))
        })?;
        graph
            .position_of(&self.current_stage, step)
            .map(Position::At)
            .map_err(|e| malformed(e.to_string()))
    }

    /// Stages before the current one (all stages when terminal) whose
    /// required values are present.
    fn derive_completed(&self, graph: &StageGraph, position: Position) -> BTreeSet<String> {
        let upto = match position {
            Position::At(pos) => pos.stage,
            Position::Completed => graph.stage_count(),
        };
        graph
            .stages()
            .iter()
            .take(upto)
            .filter(|s| self.document.is_stage_satisfied(s))
            .map(|s| s.id.clone())
            .collect()
    }
}

fn malformed(reason: String) -> LoadError {
    LoadError::MalformedDocument(reason)
}
