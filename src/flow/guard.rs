//! Transition guard: decides whether an action is legal from a given state.
//!
//! `evaluate` is pure and total: every `(position, action)` pair yields
//! either an [`Effect`] to apply or a [`RejectReason`].

use serde::{Deserialize, Serialize};

use super::action::FlowAction;
use super::state::{FlowState, Position};
use crate::graph::{StageGraph, StepRef};

/// Why an action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// The flow is in its terminal stage; only restart is possible.
    AlreadyTerminal,
    /// `back` from the first step of the first stage.
    AtStart,
    /// `continue` on a required step without a captured value.
    RequiredStepIncomplete,
    /// `skip` on a required step without the session override.
    StepRequired,
    /// The state doesn't resolve against the graph.
    InvalidPosition,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyTerminal => "already-terminal",
            Self::AtStart => "at-start",
            Self::RequiredStepIncomplete => "required-step-incomplete",
            Self::StepRequired => "step-required",
            Self::InvalidPosition => "invalid-position",
        }
    }

    /// Plain guidance to show instead of the reason code.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::AlreadyTerminal => "Your blueprint is complete. Export it or restart to make changes.",
            Self::AtStart => "There's nothing to go back to.",
            Self::RequiredStepIncomplete => "Finish this step before continuing.",
            Self::StepRequired => "This step can't be skipped. Try an example if you're stuck.",
            Self::InvalidPosition => "Something went wrong with this session. Restart to continue.",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-level policy knobs consulted by the guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Allow `skip` on required steps.
    pub allow_skip_required: bool,
}

/// The state change an allowed action produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub to: Position,
    /// Index of a stage whose last step is being left.
    pub leaves_stage: Option<usize>,
    pub clear_completed: bool,
    pub wipe_document: bool,
}

impl Effect {
    fn move_to(to: Position) -> Self {
        Self {
            to,
            leaves_stage: None,
            clear_completed: false,
            wipe_document: false,
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Effect),
    Rejected(RejectReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Decide whether `action` is legal from `state`.
pub fn evaluate(
    graph: &StageGraph,
    state: &FlowState,
    action: FlowAction,
    policy: GuardPolicy,
) -> Decision {
    if let FlowAction::Restart { wipe } = action {
        return Decision::Allowed(restart(graph, wipe));
    }

    let pos = match state.position() {
        Position::Completed => return Decision::Rejected(RejectReason::AlreadyTerminal),
        Position::At(pos) => pos,
    };
    let (Some(stage), Some(step)) = (graph.stage_at(pos.stage), graph.step_at(pos)) else {
        return Decision::Rejected(RejectReason::InvalidPosition);
    };

    match action {
        FlowAction::Continue => {
            let captured = state.document().get(&stage.id, &step.document_path).is_some();
            if step.needs_value() && !captured {
                Decision::Rejected(RejectReason::RequiredStepIncomplete)
            } else {
                Decision::Allowed(forward(graph, pos))
            }
        }
        FlowAction::Skip => {
            if step.is_skippable() || policy.allow_skip_required {
                Decision::Allowed(forward(graph, pos))
            } else {
                Decision::Rejected(RejectReason::StepRequired)
            }
        }
        FlowAction::Back => match graph.preceding(pos) {
            Some(prev) => Decision::Allowed(Effect::move_to(Position::At(prev))),
            None => Decision::Rejected(RejectReason::AtStart),
        },
        FlowAction::Refine => Decision::Allowed(Effect::move_to(Position::At(StepRef {
            stage: pos.stage,
            step: 0,
        }))),
        FlowAction::Restart { wipe } => Decision::Allowed(restart(graph, wipe)),
    }
}

fn restart(graph: &StageGraph, wipe: bool) -> Effect {
    Effect {
        to: Position::At(graph.first_position()),
        leaves_stage: None,
        clear_completed: true,
        wipe_document: wipe,
    }
}

fn forward(graph: &StageGraph, pos: StepRef) -> Effect {
    let to = graph
        .following(pos)
        .map(Position::At)
        .unwrap_or(Position::Completed);
    Effect {
        to,
        leaves_stage: graph.is_last_in_stage(pos).then_some(pos.stage),
        clear_completed: false,
        wipe_document: false,
    }
}
