//! Suggestion providers: example answers for the step a user is stuck on.
//!
//! The orchestrator never calls a provider. Callers fetch suggestions and, if
//! the user picks one, submit it through the normal input path.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SuggestionError;
use crate::flow::FlowOrchestrator;
use crate::graph::StageGraph;

/// What a provider is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionQuery {
    pub graph_id: String,
    pub stage: String,
    pub step: String,
    /// Answers already captured in the current stage, keyed by document path.
    pub context: BTreeMap<String, String>,
}

impl SuggestionQuery {
    /// Query for the orchestrator's current step; `None` once terminal.
    pub fn for_current_step(flow: &FlowOrchestrator) -> Option<Self> {
        let graph = flow.graph();
        let state = flow.flow_state();
        let step = state.step_id(graph)?.to_string();
        let stage = state.stage_id(graph).to_string();
        let context = state
            .document()
            .stage_values(&stage)
            .cloned()
            .unwrap_or_default();
        Some(Self {
            graph_id: graph.id().to_string(),
            stage,
            step,
            context,
        })
    }
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn suggest(&self, query: &SuggestionQuery) -> Result<Vec<String>, SuggestionError>;
}

/// Serves the examples configured on each step of a graph.
pub struct StaticSuggestions {
    graph: Arc<StageGraph>,
}

impl StaticSuggestions {
    pub fn new(graph: Arc<StageGraph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl SuggestionProvider for StaticSuggestions {
    fn name(&self) -> &str {
        "static"
    }

    async fn suggest(&self, query: &SuggestionQuery) -> Result<Vec<String>, SuggestionError> {
        let unavailable = || SuggestionError::Unavailable {
            stage: query.stage.clone(),
            step: query.step.clone(),
        };
        if query.graph_id != self.graph.id() {
            return Err(SuggestionError::RequestFailed {
                provider: self.name().to_string(),
                reason: format!("no examples loaded for graph {}", query.graph_id),
            });
        }

        let step = self
            .graph
            .stage(&query.stage)
            .ok()
            .and_then(|s| s.step(&query.step))
            .ok_or_else(unavailable)?;

        // Drop anything the user already has so the list offers alternatives.
        let suggestions: Vec<String> = step
            .examples
            .iter()
            .filter(|e| !query.context.values().any(|v| v == *e))
            .cloned()
            .collect();

        if suggestions.is_empty() {
            return Err(unavailable());
        }
        Ok(suggestions)
    }
}
