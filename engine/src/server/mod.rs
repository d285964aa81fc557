//! Hosted invoke endpoint
//!
//! A small HTTP surface for running foreman inside a hosted runtime.
//! `POST /invoke` takes `{"task": text}`, runs one execution worker to
//! completion, and answers `{"result": text}`. Bad payloads come back
//! as a structured `{"error": text}` with status 400; the process never
//! crashes on request content. `GET /status` reports liveness.

use crate::agent::worker::{Worker, WorkerSettings};
use crate::capabilities::CapabilitySet;
use crate::executor::CommandExecutor;
use crate::llm::ReasoningEngine;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::EngineError;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn ReasoningEngine>,
    settings: WorkerSettings,
}

impl AppState {
    pub fn new(engine: Arc<dyn ReasoningEngine>, settings: WorkerSettings) -> Self {
        Self { engine, settings }
    }
}

/// Build the router. Split out from [`serve`] so tests can drive it
/// against a listener on an ephemeral port.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(invoke_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("invoke server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("invoke server shutting down gracefully");
        })
        .await?;

    Ok(())
}

/// Run one task through a fresh worker.
async fn invoke_handler(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            return error_response(EngineError::MalformedPayload(rejection.body_text()))
        }
    };

    let task = match payload.get("task").and_then(|v| v.as_str()) {
        Some(task) if !task.trim().is_empty() => task.to_string(),
        _ => return error_response(EngineError::MalformedPayload("No task provided".to_string())),
    };

    info!(task_len = task.len(), "invoke request accepted");

    let capabilities = CapabilitySet::shell_only(CommandExecutor::with_default_timeout(
        state.settings.command_timeout,
    ));
    let worker = Worker::new(state.engine.clone(), capabilities, state.settings.clone());
    let report = worker.run(&task).await;

    Json(json!({ "result": report.render() })).into_response()
}

/// Liveness endpoint
async fn status_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn error_response(error: EngineError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error.to_string() })),
    )
        .into_response()
}
