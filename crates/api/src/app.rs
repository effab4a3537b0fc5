//! Router for the blocking-trigger endpoints.
//!
//! Both triggers run the identical evaluation; the route only fixes the
//! trigger kind recorded in the audit line.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use allowgate_auth::{AuthorizationGate, IdentityEvent, TriggerKind};

use crate::errors::{gate_error_to_response, json_error};

pub fn build_app(gate: AuthorizationGate) -> Router {
    Router::new()
        .route("/before-create", post(before_create))
        .route("/before-sign-in", post(before_sign_in))
        .route("/health", get(health))
        .with_state(gate)
}

async fn before_create(
    State(gate): State<AuthorizationGate>,
    payload: Result<Json<IdentityEvent>, JsonRejection>,
) -> Response {
    handle_trigger(&gate, TriggerKind::BeforeCreate, payload).await
}

async fn before_sign_in(
    State(gate): State<AuthorizationGate>,
    payload: Result<Json<IdentityEvent>, JsonRejection>,
) -> Response {
    handle_trigger(&gate, TriggerKind::BeforeSignIn, payload).await
}

async fn handle_trigger(
    gate: &AuthorizationGate,
    kind: TriggerKind,
    payload: Result<Json<IdentityEvent>, JsonRejection>,
) -> Response {
    let mut event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => {
            tracing::warn!(trigger = %kind, error = %rejection.body_text(), "rejecting malformed identity event");
            return json_error(
                StatusCode::BAD_REQUEST,
                "invalid-argument",
                "Malformed identity event.",
            );
        }
    };
    event.event_type = Some(kind);

    match gate.evaluate(&event).await {
        // Blocking triggers expect an empty response object on allow.
        Ok(_) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(err) => gate_error_to_response(&err),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "online" }))
}
