//! Flow state: where a session is in its stage graph and what it has captured.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::FlowAction;
use crate::document::Document;
use crate::graph::{COMPLETED_STAGE, StageGraph, StepRef};

/// Current location in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// At a step of a configured stage.
    At(StepRef),
    /// The absorbing terminal stage.
    Completed,
}

impl Position {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn step_ref(&self) -> Option<StepRef> {
        match self {
            Self::At(pos) => Some(*pos),
            Self::Completed => None,
        }
    }
}

/// What happened in one logged interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    Input { text: String },
    Action { action: FlowAction },
}

/// One entry of the append-only interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub at: DateTime<Utc>,
    /// Stage the interaction happened in.
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub interaction: Interaction,
}

/// Runtime state of one authoring session.
///
/// Only the orchestrator mutates it; everything else sees copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    pub(crate) session_id: Uuid,
    pub(crate) position: Position,
    pub(crate) completed_stages: BTreeSet<String>,
    pub(crate) document: Document,
    pub(crate) interaction_log: Vec<InteractionEntry>,
}

impl FlowState {
    /// Fresh state at the first step of `graph`.
    pub fn new(graph: &StageGraph, session_id: Uuid) -> Self {
        Self {
            session_id,
            position: Position::At(graph.first_position()),
            completed_stages: BTreeSet::new(),
            document: Document::new(),
            interaction_log: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_terminal(&self) -> bool {
        self.position.is_terminal()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn completed_stages(&self) -> &BTreeSet<String> {
        &self.completed_stages
    }

    pub fn interaction_log(&self) -> &[InteractionEntry] {
        &self.interaction_log
    }

    /// Id of the current stage; `completed` in the terminal stage.
    pub fn stage_id<'g>(&self, graph: &'g StageGraph) -> &'g str {
        match self.position {
            Position::At(pos) => graph
                .stage_at(pos.stage)
                .map(|s| s.id.as_str())
                .unwrap_or(COMPLETED_STAGE),
            Position::Completed => COMPLETED_STAGE,
        }
    }

    pub fn step_id<'g>(&self, graph: &'g StageGraph) -> Option<&'g str> {
        let pos = self.position.step_ref()?;
        graph.step_at(pos).map(|s| s.id.as_str())
    }

    /// 1-based position within the current stage, 0 in the terminal stage.
    pub fn stage_step(&self) -> usize {
        self.position.step_ref().map(|p| p.step + 1).unwrap_or(0)
    }

    pub(crate) fn log(&mut self, graph: &StageGraph, interaction: Interaction) {
        let entry = InteractionEntry {
            at: Utc::now(),
            stage: self.stage_id(graph).to_string(),
            step: self.step_id(graph).map(str::to_string),
            interaction,
        };
        self.interaction_log.push(entry);
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self, graph: &StageGraph) -> FlowSnapshot {
        let (stage_title, steps_in_stage) = match self.position {
            Position::At(pos) => graph
                .stage_at(pos.stage)
                .map(|s| (s.title.clone(), s.steps.len()))
                .unwrap_or_default(),
            Position::Completed => ("Completed".to_string(), 0),
        };

        let completed_stages: Vec<String> = graph
            .stages()
            .iter()
            .filter(|s| self.completed_stages.contains(&s.id))
            .map(|s| s.id.clone())
            .collect();

        let progress = if self.is_terminal() {
            1.0
        } else {
            completed_stages.len() as f64 / graph.stage_count() as f64
        };

        FlowSnapshot {
            session_id: self.session_id,
            graph_id: graph.id().to_string(),
            stage: self.stage_id(graph).to_string(),
            stage_title,
            step: self.step_id(graph).map(str::to_string),
            stage_step: self.stage_step(),
            steps_in_stage,
            progress,
            completed_stages,
            is_terminal: self.is_terminal(),
            document: self.document.snapshot(),
        }
    }
}

/// Read-only state view handed to UIs and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub session_id: Uuid,
    pub graph_id: String,
    pub stage: String,
    pub stage_title: String,
    pub step: Option<String>,
    pub stage_step: usize,
    pub steps_in_stage: usize,
    /// `completed_stages / total_stages`; 1.0 once terminal.
    pub progress: f64,
    pub completed_stages: Vec<String>,
    pub is_terminal: bool,
    pub document: Document,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::presets;

    #[test]
    fn fresh_state_starts_at_first_step() {
        let graph = presets::sop().unwrap();
        let state = FlowState::new(&graph, Uuid::new_v4());
        assert_eq!(state.stage_id(&graph), "ideation");
        assert_eq!(state.step_id(&graph), Some("bigIdea"));
        assert_eq!(state.stage_step(), 1);
        assert!(state.document().is_empty());
    }

    #[test]
    fn terminal_snapshot() {
        let graph = presets::sop().unwrap();
        let mut state = FlowState::new(&graph, Uuid::new_v4());
        state.position = Position::Completed;
        let snap = state.snapshot(&graph);
        assert_eq!(snap.stage, COMPLETED_STAGE);
        assert_eq!(snap.step, None);
        assert_eq!(snap.stage_step, 0);
        assert!(snap.is_terminal);
        assert_eq!(snap.progress, 1.0);
    }

    #[test]
    fn progress_counts_completed_stages() {
        let graph = presets::sop().unwrap();
        let mut state = FlowState::new(&graph, Uuid::new_v4());
        state.completed_stages.insert("ideation".into());
        let snap = state.snapshot(&graph);
        assert!((snap.progress - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(snap.completed_stages, vec!["ideation".to_string()]);
    }

    #[test]
    fn log_records_location() {
        let graph = presets::sop().unwrap();
        let mut state = FlowState::new(&graph, Uuid::new_v4());
        state.log(&graph, Interaction::Input { text: "hi".into() });
        let entry = &state.interaction_log()[0];
        assert_eq!(entry.stage, "ideation");
        assert_eq!(entry.step.as_deref(), Some("bigIdea"));

        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["interaction"]["type"], "input");
        assert_eq!(json["interaction"]["text"], "hi");
    }
}
