//! Stage graph: the static shape of an authoring flow.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identifier of the absorbing terminal stage. Reserved: no configured stage
/// may use it.
pub const COMPLETED_STAGE: &str = "completed";

/// What a step expects from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Captures a free-text answer into the document.
    Collect,
    /// Follow-up question; an answer is captured if given but never demanded.
    Clarify,
    /// Informational step; nothing is captured.
    TransitionOnly,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collect => "collect",
            Self::Clarify => "clarify",
            Self::TransitionOnly => "transition-only",
        };
        write!(f, "{s}")
    }
}

fn default_required() -> bool {
    true
}

/// One step of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    pub id: String,
    /// Key under the owning stage in the blueprint document.
    pub document_path: String,
    pub kind: StepKind,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Question shown to the user for this step.
    #[serde(default)]
    pub prompt: String,
    /// Sample answers offered when the user gets stuck.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Minimum trimmed length of a collected answer.
    #[serde(default)]
    pub min_chars: usize,
}

impl StepDef {
    fn new(id: &str, kind: StepKind, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            document_path: id.to_string(),
            kind,
            required: kind != StepKind::TransitionOnly,
            prompt: prompt.to_string(),
            examples: Vec::new(),
            min_chars: 0,
        }
    }

    /// A required step that captures an answer at `document_path == id`.
    pub fn collect(id: &str, prompt: &str) -> Self {
        Self::new(id, StepKind::Collect, prompt)
    }

    pub fn clarify(id: &str, prompt: &str) -> Self {
        Self::new(id, StepKind::Clarify, prompt)
    }

    pub fn transition(id: &str, prompt: &str) -> Self {
        Self::new(id, StepKind::TransitionOnly, prompt)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.document_path = path.to_string();
        self
    }

    pub fn with_examples(mut self, examples: &[&str]) -> Self {
        self.examples = examples.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Whether leaving this step requires a captured value.
    pub fn needs_value(&self) -> bool {
        self.required && self.kind == StepKind::Collect
    }

    /// Whether `skip` is allowed here without a session override.
    pub fn is_skippable(&self) -> bool {
        !self.required
    }
}

/// A top-level phase of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    /// Also the stage's top-level key in the document.
    pub id: String,
    pub title: String,
    pub steps: Vec<StepDef>,
}

impl StageDef {
    pub fn new(id: &str, title: &str, steps: Vec<StepDef>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            steps,
        }
    }

    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn required_paths(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|s| s.needs_value())
            .map(|s| s.document_path.as_str())
    }
}

/// Index-based reference to a step inside a graph. Only constructed by the
/// graph itself, so it always resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepRef {
    pub stage: usize,
    pub step: usize,
}

/// Result of [`StageGraph::next_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep<'a> {
    Step(&'a StepDef),
    StageComplete,
}

/// Result of [`StageGraph::next_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage<'a> {
    Stage(&'a StageDef),
    FlowComplete,
}

#[derive(Deserialize)]
struct GraphFile {
    id: String,
    stages: Vec<StageDef>,
}

/// Read-only, validated description of the stages and steps of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageGraph {
    id: String,
    stages: Vec<StageDef>,
}

impl StageGraph {
    /// Build and validate a graph.
    pub fn new(id: impl Into<String>, stages: Vec<StageDef>) -> Result<Self, ConfigError> {
        let id = id.into();
        if stages.is_empty() {
            return Err(ConfigError::EmptyGraph(id));
        }

        let mut stage_ids = HashSet::new();
        for stage in &stages {
            if stage.id == COMPLETED_STAGE {
                return Err(ConfigError::ReservedStageId(stage.id.clone()));
            }
            if !stage_ids.insert(stage.id.as_str()) {
                return Err(ConfigError::DuplicateStage(stage.id.clone()));
            }
            if stage.steps.is_empty() {
                return Err(ConfigError::EmptyStage(stage.id.clone()));
            }

            let mut step_ids = HashSet::new();
            let mut paths = HashSet::new();
            for step in &stage.steps {
                if !step_ids.insert(step.id.as_str()) {
                    return Err(ConfigError::DuplicateStep {
                        stage: stage.id.clone(),
                        step: step.id.clone(),
                    });
                }
                if !paths.insert(step.document_path.as_str()) {
                    return Err(ConfigError::DuplicatePath {
                        stage: stage.id.clone(),
                        path: step.document_path.clone(),
                    });
                }
            }
        }

        Ok(Self { id, stages })
    }

    /// Parse a graph from JSON (`{"id": …, "stages": [...]}`).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: GraphFile =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::new(file.id, file.stages)
    }

    /// Load a graph definition from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn total_steps(&self) -> usize {
        self.stages.iter().map(|s| s.steps.len()).sum()
    }

    pub fn stage(&self, stage: &str) -> Result<&StageDef, ConfigError> {
        self.stages
            .iter()
            .find(|s| s.id == stage)
            .ok_or_else(|| ConfigError::UnknownStage(stage.to_string()))
    }

    pub fn stage_index(&self, stage: &str) -> Result<usize, ConfigError> {
        self.stages
            .iter()
            .position(|s| s.id == stage)
            .ok_or_else(|| ConfigError::UnknownStage(stage.to_string()))
    }

    /// Ordered steps of a stage.
    pub fn steps_of(&self, stage: &str) -> Result<&[StepDef], ConfigError> {
        Ok(&self.stage(stage)?.steps)
    }

    /// Resolve a (stage, step) pair to an index reference.
    pub fn position_of(&self, stage: &str, step: &str) -> Result<StepRef, ConfigError> {
        let stage_idx = self.stage_index(stage)?;
        let step_idx = self.stages[stage_idx]
            .steps
            .iter()
            .position(|s| s.id == step)
            .ok_or_else(|| ConfigError::UnknownStep {
                stage: stage.to_string(),
                step: step.to_string(),
            })?;
        Ok(StepRef {
            stage: stage_idx,
            step: step_idx,
        })
    }

    pub fn next_step(&self, stage: &str, step: &str) -> Result<NextStep<'_>, ConfigError> {
        let pos = self.position_of(stage, step)?;
        Ok(match self.stages[pos.stage].steps.get(pos.step + 1) {
            Some(next) => NextStep::Step(next),
            None => NextStep::StageComplete,
        })
    }

    pub fn next_stage(&self, stage: &str) -> Result<NextStage<'_>, ConfigError> {
        let idx = self.stage_index(stage)?;
        Ok(match self.stages.get(idx + 1) {
            Some(next) => NextStage::Stage(next),
            None => NextStage::FlowComplete,
        })
    }

    pub fn is_last_step_of_stage(&self, stage: &str, step: &str) -> Result<bool, ConfigError> {
        Ok(matches!(self.next_step(stage, step)?, NextStep::StageComplete))
    }

    // ── Index-based navigation ──────────────────────────────────────

    pub fn first_position(&self) -> StepRef {
        StepRef { stage: 0, step: 0 }
    }

    pub fn stage_at(&self, index: usize) -> Option<&StageDef> {
        self.stages.get(index)
    }

    pub fn step_at(&self, pos: StepRef) -> Option<&StepDef> {
        self.stages.get(pos.stage)?.steps.get(pos.step)
    }

    /// Whether `pos` is the last step of its stage.
    pub fn is_last_in_stage(&self, pos: StepRef) -> bool {
        self.stages
            .get(pos.stage)
            .is_some_and(|s| pos.step + 1 == s.steps.len())
    }

    /// The step after `pos`, crossing stage boundaries. `None` past the last
    /// step of the last stage.
    pub fn following(&self, pos: StepRef) -> Option<StepRef> {
        let stage = self.stages.get(pos.stage)?;
        if pos.step + 1 < stage.steps.len() {
            return Some(StepRef {
                stage: pos.stage,
                step: pos.step + 1,
            });
        }
        self.stages.get(pos.stage + 1).map(|_| StepRef {
            stage: pos.stage + 1,
            step: 0,
        })
    }

    /// The step before `pos`: previous step in the stage, or the last step of
    /// the previous stage. `None` at the very first step.
    pub fn preceding(&self, pos: StepRef) -> Option<StepRef> {
        if pos.step > 0 {
            return Some(StepRef {
                stage: pos.stage,
                step: pos.step - 1,
            });
        }
        let prev = pos.stage.checked_sub(1)?;
        let steps = self.stages.get(prev)?.steps.len();
        Some(StepRef {
            stage: prev,
            step: steps - 1,
        })
    }
}
