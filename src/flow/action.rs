//! Flow actions: the closed set of navigation commands a user can issue.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A navigation action dispatched to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FlowAction {
    /// Move to the next step (a.k.a. advance).
    #[serde(alias = "advance")]
    Continue,
    /// Move to the previous step, crossing into the previous stage if needed.
    Back,
    /// Move on without a captured value (non-required steps only).
    Skip,
    /// Return to the first step of the current stage, keeping its values.
    Refine,
    /// Return to the very first step. `wipe` also clears the document.
    Restart {
        #[serde(default)]
        wipe: bool,
    },
}

impl FlowAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Continue => ActionKind::Continue,
            Self::Back => ActionKind::Back,
            Self::Skip => ActionKind::Skip,
            Self::Refine => ActionKind::Refine,
            Self::Restart { .. } => ActionKind::Restart,
        }
    }
}

impl std::fmt::Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restart { wipe: true } => write!(f, "restart (wipe)"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Field-less action discriminant, used in rejections and request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    #[serde(alias = "advance")]
    Continue,
    Back,
    Skip,
    Refine,
    Restart,
}

impl ActionKind {
    /// Build the full action. `wipe` only matters for `Restart`.
    pub fn into_action(self, wipe: bool) -> FlowAction {
        match self {
            Self::Continue => FlowAction::Continue,
            Self::Back => FlowAction::Back,
            Self::Skip => FlowAction::Skip,
            Self::Refine => FlowAction::Refine,
            Self::Restart => FlowAction::Restart { wipe },
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Continue => "continue",
            Self::Back => "back",
            Self::Skip => "skip",
            Self::Refine => "refine",
            Self::Restart => "restart",
        };
        write!(f, "{s}")
    }
}

/// A label that doesn't name any action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for FlowAction {
    type Err = UnknownAction;

    /// Parse a button label or command word. Case and surrounding whitespace
    /// are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let words: Vec<&str> = normalized.split_whitespace().collect();

        match words.as_slice() {
            ["continue"] | ["advance"] | ["next"] | ["continue", "to", "next", "step"] => {
                Ok(Self::Continue)
            }
            ["back"] | ["go", "back"] | ["previous"] | ["prev"] => Ok(Self::Back),
            ["skip"] | ["skip", "this", "step"] | ["skip", "for", "now"] => Ok(Self::Skip),
            ["refine"] | ["edit"] | ["revise"] | ["refine", "this", "stage"] => Ok(Self::Refine),
            ["restart"] | ["start", "over"] => Ok(Self::Restart { wipe: false }),
            ["restart", "wipe"] | ["restart", "--wipe"] | ["start", "fresh"] => {
                Ok(Self::Restart { wipe: true })
            }
            _ => Err(UnknownAction(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels() {
        assert_eq!("continue".parse::<FlowAction>(), Ok(FlowAction::Continue));
        assert_eq!("  Advance ".parse::<FlowAction>(), Ok(FlowAction::Continue));
        assert_eq!("Go Back".parse::<FlowAction>(), Ok(FlowAction::Back));
        assert_eq!("skip for now".parse::<FlowAction>(), Ok(FlowAction::Skip));
        assert_eq!("edit".parse::<FlowAction>(), Ok(FlowAction::Refine));
        assert_eq!("Start over".parse::<FlowAction>(), Ok(FlowAction::Restart { wipe: false }));
        assert_eq!("restart wipe".parse::<FlowAction>(), Ok(FlowAction::Restart { wipe: true }));
    }

    #[test]
    fn parse_unknown_label() {
        let err = "launch rockets".parse::<FlowAction>().unwrap_err();
        assert_eq!(err, UnknownAction("launch rockets".into()));
    }

    #[test]
    fn action_serde_is_tagged() {
        let json = serde_json::to_value(FlowAction::Restart { wipe: true }).unwrap();
        assert_eq!(json, serde_json::json!({"action": "restart", "wipe": true}));

        let parsed: FlowAction = serde_json::from_str(r#"{"action": "advance"}"#).unwrap();
        assert_eq!(parsed, FlowAction::Continue);

        let restart: FlowAction = serde_json::from_str(r#"{"action": "restart"}"#).unwrap();
        assert_eq!(restart, FlowAction::Restart { wipe: false });
    }

    #[test]
    fn kind_display_matches_serde() {
        for kind in [
            ActionKind::Continue,
            ActionKind::Back,
            ActionKind::Skip,
            ActionKind::Refine,
            ActionKind::Restart,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
            assert_eq!(kind.into_action(false).kind(), kind);
        }
    }
}
