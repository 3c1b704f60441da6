//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ConfigError;
use crate::flow::{FlowOptions, GuardPolicy, StuckThresholds};
use crate::graph::{StageGraph, presets};

/// Which built-in stage graph to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowKind {
    #[default]
    Sop,
    Pbl,
}

impl FromStr for FlowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sop" => Ok(Self::Sop),
            "pbl" => Ok(Self::Pbl),
            other => Err(format!("expected sop or pbl, got {other:?}")),
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sop => write!(f, "sop"),
            Self::Pbl => write!(f, "pbl"),
        }
    }
}

/// Process-level configuration for the blueprint service.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub flow: FlowKind,
    /// JSON stage graph to load instead of the built-in preset.
    pub graph_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub http_port: u16,
    pub options: FlowOptions,
    /// Session to resume at startup in the terminal REPL.
    pub session: Option<Uuid>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            flow: FlowKind::Sop,
            graph_path: None,
            db_path: PathBuf::from("./data/blueprints.db"),
            http_port: 8080,
            options: FlowOptions::default(),
            session: None,
        }
    }
}

impl FlowConfig {
    /// Read configuration from `BLUEPRINT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let thresholds = StuckThresholds::default();

        let flow = parse_or(&lookup, "BLUEPRINT_FLOW", defaults.flow)?;
        let graph_path = non_empty(&lookup, "BLUEPRINT_GRAPH_PATH").map(PathBuf::from);
        let db_path = non_empty(&lookup, "BLUEPRINT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let http_port = parse_or(&lookup, "BLUEPRINT_HTTP_PORT", defaults.http_port)?;
        let allow_skip_required = parse_bool(&lookup, "BLUEPRINT_ALLOW_SKIP_REQUIRED")?;

        let empty_attempts = parse_or(&lookup, "BLUEPRINT_STUCK_EMPTY", thresholds.empty_attempts)?;
        let invalid_attempts =
            parse_or(&lookup, "BLUEPRINT_STUCK_INVALID", thresholds.invalid_attempts)?;
        let restart_attempts =
            parse_or(&lookup, "BLUEPRINT_STUCK_RESTART", thresholds.restart_attempts)?;
        let idle_secs = parse_or(
            &lookup,
            "BLUEPRINT_STUCK_IDLE_SECS",
            thresholds.idle.as_secs(),
        )?;

        if empty_attempts == 0 || invalid_attempts == 0 || restart_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BLUEPRINT_STUCK_*".to_string(),
                message: "attempt thresholds must be at least 1".to_string(),
            });
        }

        let session = match non_empty(&lookup, "BLUEPRINT_SESSION") {
            Some(raw) => Some(Uuid::parse_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                key: "BLUEPRINT_SESSION".to_string(),
                message: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            flow,
            graph_path,
            db_path,
            http_port,
            options: FlowOptions {
                policy: GuardPolicy {
                    allow_skip_required,
                },
                thresholds: StuckThresholds {
                    empty_attempts,
                    invalid_attempts,
                    restart_attempts,
                    idle: Duration::from_secs(idle_secs),
                },
            },
            session,
        })
    }

    /// Build the configured stage graph.
    pub fn build_graph(&self) -> Result<StageGraph, ConfigError> {
        match &self.graph_path {
            Some(path) => StageGraph::from_file(path),
            None => match self.flow {
                FlowKind::Sop => presets::sop(),
                FlowKind::Pbl => presets::pbl(),
            },
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got {v:?}"),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = FlowConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.flow, FlowKind::Sop);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.options, FlowOptions::default());
        assert!(config.session.is_none());
        assert!(config.graph_path.is_none());
    }

    #[test]
    fn reads_every_key() {
        let id = Uuid::new_v4();
        let config = FlowConfig::from_lookup(lookup(&[
            ("BLUEPRINT_FLOW", "PBL"),
            ("BLUEPRINT_DB_PATH", "/tmp/bp.db"),
            ("BLUEPRINT_HTTP_PORT", "9090"),
            ("BLUEPRINT_ALLOW_SKIP_REQUIRED", "yes"),
            ("BLUEPRINT_STUCK_EMPTY", "4"),
            ("BLUEPRINT_STUCK_INVALID", "5"),
            ("BLUEPRINT_STUCK_RESTART", "9"),
            ("BLUEPRINT_STUCK_IDLE_SECS", "30"),
            ("BLUEPRINT_SESSION", &id.to_string()),
        ]))
        .unwrap();

        assert_eq!(config.flow, FlowKind::Pbl);
        assert_eq!(config.db_path, PathBuf::from("/tmp/bp.db"));
        assert_eq!(config.http_port, 9090);
        assert!(config.options.policy.allow_skip_required);
        assert_eq!(config.options.thresholds.empty_attempts, 4);
        assert_eq!(config.options.thresholds.invalid_attempts, 5);
        assert_eq!(config.options.thresholds.restart_attempts, 9);
        assert_eq!(config.options.thresholds.idle, Duration::from_secs(30));
        assert_eq!(config.session, Some(id));
        assert_eq!(config.build_graph().unwrap().id(), "pbl");
    }

    #[test]
    fn malformed_values_are_errors() {
        for (key, value) in [
            ("BLUEPRINT_FLOW", "wizard"),
            ("BLUEPRINT_HTTP_PORT", "eighty"),
            ("BLUEPRINT_ALLOW_SKIP_REQUIRED", "maybe"),
            ("BLUEPRINT_STUCK_EMPTY", "0"),
            ("BLUEPRINT_SESSION", "not-a-uuid"),
        ] {
            let err = FlowConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { .. }),
                "{key}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn graph_path_overrides_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"id":"custom","stages":[{"id":"only","title":"Only","steps":[{"id":"answer","document_path":"answer","kind":"collect"}]}]}"#,
        )
        .unwrap();

        let config = FlowConfig::from_lookup(lookup(&[(
            "BLUEPRINT_GRAPH_PATH",
            path.to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(config.build_graph().unwrap().id(), "custom");
    }
}
