//! REST endpoints for blueprint sessions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::registry::{SessionRegistry, SharedSession};
use crate::error::{DatabaseError, SuggestionError};
use crate::flow::ActionKind;
use crate::suggestions::SuggestionProvider;

/// Shared state for blueprint routes.
#[derive(Clone)]
pub struct BlueprintRouteState {
    pub registry: Arc<SessionRegistry>,
    pub suggestions: Arc<dyn SuggestionProvider>,
}

#[derive(Debug, Deserialize)]
struct InputRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: ActionKind,
    #[serde(default)]
    wipe: bool,
}

fn error_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

fn not_found(id: Uuid) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        json!({"error": "not-found", "message": format!("No blueprint session {id}")}),
    )
}

fn storage_error(e: DatabaseError) -> Response {
    tracing::error!(error = %e, "Blueprint store failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "storage", "message": e.to_string()}),
    )
}

async fn lookup(state: &BlueprintRouteState, id: Uuid) -> Result<SharedSession, Response> {
    match state.registry.get(id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found(id)),
        Err(e) => Err(storage_error(e)),
    }
}

/// POST /api/blueprints
async fn create_session(State(state): State<BlueprintRouteState>) -> Response {
    let session = state.registry.create().await;
    let status = session.lock().await.status();
    (StatusCode::CREATED, Json(status)).into_response()
}

/// GET /api/blueprints
async fn list_sessions(State(state): State<BlueprintRouteState>) -> Response {
    match state.registry.list().await {
        Ok(sessions) => Json(json!({ "sessions": sessions })).into_response(),
        Err(e) => storage_error(e),
    }
}

/// GET /api/blueprints/{id}
async fn get_session(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    match lookup(&state, id).await {
        Ok(session) => Json(session.lock().await.status()).into_response(),
        Err(resp) => resp,
    }
}

/// DELETE /api/blueprints/{id}
async fn delete_session(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.registry.remove(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(id),
        Err(e) => storage_error(e),
    }
}

/// POST /api/blueprints/{id}/input
///
/// Captures an answer for the current step. Input errors are 422 with a code
/// and guidance; the session is unchanged.
async fn submit_input(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InputRequest>,
) -> Response {
    let session = match lookup(&state, id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let mut session = session.lock().await;

    match session.submit_input(&req.text).await {
        Ok(outcome) => Json(json!({
            "path": outcome.path.map(|p| p.to_string()),
            "changed": outcome.changed,
            "status": session.status(),
        }))
        .into_response(),
        Err(e) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": "invalid-input",
                "code": e.code(),
                "message": e.to_string(),
                "guidance": e.guidance(),
                "recovery_hint": session.flow().recovery_hint(),
            }),
        ),
    }
}

/// POST /api/blueprints/{id}/actions
///
/// Applies a navigation action. Guard rejections are 409 with the reason code.
async fn dispatch_action(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Response {
    let session = match lookup(&state, id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let mut session = session.lock().await;

    match session.dispatch(req.action.into_action(req.wipe)).await {
        Ok(outcome) => Json(json!({
            "transition": outcome,
            "status": session.status(),
        }))
        .into_response(),
        Err(rejected) => error_response(
            StatusCode::CONFLICT,
            json!({
                "error": "transition-rejected",
                "action": rejected.action,
                "reason": rejected.reason,
                "guidance": rejected.guidance(),
            }),
        ),
    }
}

/// GET /api/blueprints/{id}/export
async fn export_document(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    match lookup(&state, id).await {
        Ok(session) => Json(session.lock().await.flow().export_json()).into_response(),
        Err(resp) => resp,
    }
}

/// GET /api/blueprints/{id}/suggestions
async fn get_suggestions(
    State(state): State<BlueprintRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    let session = match lookup(&state, id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let session = session.lock().await;

    match session.suggestions(state.suggestions.as_ref()).await {
        Ok(suggestions) => Json(json!({ "suggestions": suggestions })).into_response(),
        Err(SuggestionError::Unavailable { .. }) => {
            Json(json!({ "suggestions": [] })).into_response()
        }
        Err(e) => {
            tracing::warn!(session_id = %id, error = %e, "Suggestion provider failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                json!({"error": "suggestions", "message": e.to_string()}),
            )
        }
    }
}

/// Build the blueprint REST routes.
pub fn blueprint_routes(state: BlueprintRouteState) -> Router {
    Router::new()
        .route("/api/blueprints", post(create_session).get(list_sessions))
        .route(
            "/api/blueprints/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/blueprints/{id}/input", post(submit_input))
        .route("/api/blueprints/{id}/actions", post(dispatch_action))
        .route("/api/blueprints/{id}/export", get(export_document))
        .route("/api/blueprints/{id}/suggestions", get(get_suggestions))
        .with_state(state)
}
