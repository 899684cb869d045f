use crate::ports::{DocumentStore, PushSender};
use crate::state::AppState;
use crate::triggers::{ChangeKind, ChangePayload, DocumentChangeHandler};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

pub fn app<S, P>(state: AppState<S, P>) -> Router
where
    S: DocumentStore,
    P: PushSender,
{
    Router::new()
        .route("/health", get(health))
        .route("/triggers/News/{change}", post(event_trigger::<S, P>))
        .route("/triggers/users/{change}", post(user_trigger::<S, P>))
        .route("/jobs/reminders", post(run_reminders::<S, P>))
        .fallback(not_registered)
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn not_registered() -> Response {
    error_response(StatusCode::NOT_FOUND, "no handler registered")
}

async fn event_trigger<S, P>(
    State(state): State<AppState<S, P>>,
    Path(change): Path<String>,
    Json(payload): Json<JsonValue>,
) -> Response
where
    S: DocumentStore,
    P: PushSender,
{
    run_trigger(&state.events, &change, payload).await
}

async fn user_trigger<S, P>(
    State(state): State<AppState<S, P>>,
    Path(change): Path<String>,
    Json(payload): Json<JsonValue>,
) -> Response
where
    S: DocumentStore,
    P: PushSender,
{
    run_trigger(&state.users, &change, payload).await
}

async fn run_trigger<H: DocumentChangeHandler>(
    handler: &H,
    change: &str,
    payload: JsonValue,
) -> Response {
    let Some(kind) = ChangeKind::parse(change).filter(|kind| handler.handles(*kind)) else {
        return error_response(StatusCode::NOT_FOUND, "no handler registered");
    };
    let payload: ChangePayload<H::Document> = match serde_json::from_value(payload) {
        Ok(payload) => payload,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let (document_id, change) = match payload.into_change(kind) {
        Ok(change) => change,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match handler.handle(&document_id, change).await {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(err) => {
            tracing::error!(
                collection = handler.collection(),
                document_id = %document_id,
                error = %err,
                "trigger handler failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn run_reminders<S, P>(State(state): State<AppState<S, P>>) -> Response
where
    S: DocumentStore,
    P: PushSender,
{
    match state.reminders.run(OffsetDateTime::now_utc()).await {
        Ok(run) => Json(run).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "reminder run failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
