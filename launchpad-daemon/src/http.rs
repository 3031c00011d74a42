//! HTTP surface: JSON endpoints over the lifecycle controller.
//!
//! | Method & path          | Success                                        |
//! |------------------------|------------------------------------------------|
//! | `GET /info`            | list of app records                            |
//! | `POST /register`       | `{success: true, port}`                        |
//! | `POST /start/:name`    | `{success: true, port}` or `{message}`         |
//! | `POST /start-multiple` | `{success: [...], error: [...]}`               |
//! | `POST /stop/:name`     | `{success: true}` or `{message}`               |
//!
//! Failures are `{error: "..."}` with 400, 404 or 500.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use launchpad_core::{
    AppRecord, LifecycleController, LifecycleError, Registration, StartFailure, StartOutcome,
    StopOutcome,
};

const MSG_REQUIRED: &str = "Name, path, and team are required";
const MSG_DUPLICATE: &str = "App with this name already registered";
const MSG_NOT_FOUND: &str = "App not found";
const MSG_NAMES: &str = "Names must be provided as a non-empty array";
const MSG_ALREADY_RUNNING: &str = "App is already running";
const MSG_ALREADY_STOPPED: &str = "App is already stopped";

#[derive(Clone)]
struct AppState {
    controller: Arc<LifecycleController>,
}

/// Build the router over `controller`.
pub fn router(controller: Arc<LifecycleController>) -> Router {
    Router::new()
        .route("/info", get(info))
        .route("/register", post(register))
        .route("/start/:name", post(start))
        .route("/start-multiple", post(start_multiple))
        .route("/stop/:name", post(stop))
        .with_state(AppState { controller })
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    name: Option<String>,
    path: Option<String>,
    team: Option<String>,
    #[serde(default)]
    log_request: bool,
}

#[derive(Debug, Deserialize)]
struct StartMultipleBody {
    names: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn info(State(state): State<AppState>) -> Result<Json<Vec<AppRecord>>, ApiError> {
    let records = blocking(state.controller, |c| c.list()).await?;
    Ok(Json(records))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(ApiError::rejected)?;
    let (Some(name), Some(path), Some(team)) = (body.name, body.path, body.team) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, MSG_REQUIRED));
    };

    let registration = Registration {
        name,
        path: PathBuf::from(path),
        team,
        log_request: body.log_request,
    };
    let port = blocking(state.controller, move |c| c.register(registration)).await??;
    Ok(Json(json!({ "success": true, "port": port })))
}

async fn start(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = blocking(state.controller, move |c| c.start(&name)).await??;
    Ok(Json(match outcome {
        StartOutcome::Started { port } => json!({ "success": true, "port": port }),
        StartOutcome::AlreadyRunning { .. } => json!({ "message": MSG_ALREADY_RUNNING }),
    }))
}

async fn start_multiple(
    State(state): State<AppState>,
    payload: Result<Json<StartMultipleBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let names = match payload {
        Ok(Json(StartMultipleBody { names: Some(names) })) if !names.is_empty() => names,
        _ => return Err(ApiError::new(StatusCode::BAD_REQUEST, MSG_NAMES)),
    };

    let report = blocking(state.controller, move |c| c.start_multiple(names.as_slice())).await?;

    let success: Vec<String> = report
        .started
        .iter()
        .map(|(name, _)| format!("App '{name}' started successfully"))
        .collect();
    let error: Vec<String> = report
        .failed
        .iter()
        .map(|(name, failure)| match failure {
            StartFailure::AlreadyRunning => format!("App '{name}' is already running"),
            StartFailure::Error(LifecycleError::NotFound { .. }) => {
                format!("App '{name}' not found")
            }
            StartFailure::Error(err) => format!("App '{name}' failed to start: {err}"),
        })
        .collect();

    Ok(Json(json!({ "success": success, "error": error })))
}

async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = blocking(state.controller, move |c| c.stop(&name)).await??;
    Ok(Json(match outcome {
        StopOutcome::Stopped => json!({ "success": true }),
        StopOutcome::AlreadyStopped => json!({ "message": MSG_ALREADY_STOPPED }),
    }))
}

/// Run a controller call off the async workers. Transitions spawn processes
/// under the registry write lock, so even reads may wait on it.
async fn blocking<T, F>(controller: Arc<LifecycleController>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&LifecycleController) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&controller))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "controller task join failure");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn rejected(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidInput(_) => Self::new(StatusCode::BAD_REQUEST, MSG_REQUIRED),
            LifecycleError::AlreadyExists { .. } => {
                Self::new(StatusCode::BAD_REQUEST, MSG_DUPLICATE)
            }
            LifecycleError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, MSG_NOT_FOUND),
            err @ (LifecycleError::PortExhausted { .. }
            | LifecycleError::LaunchFailure { .. }
            | LifecycleError::Registry(_)) => {
                tracing::error!(error = %err, "lifecycle transition failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
