use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::domain::{ApplicationId, CandidateId, JobId};
use super::repository::{IdentityResolver, PipelineRepository};
use super::service::{PipelineEngine, PipelineError};

/// Engine plus identity resolver, shared as router state.
pub struct PipelineContext<R, I> {
    pub engine: PipelineEngine<R>,
    pub identity: I,
}

/// Router builder exposing the pipeline wire contract.
pub fn pipeline_router<R, I>(context: Arc<PipelineContext<R, I>>) -> Router
where
    R: PipelineRepository + 'static,
    I: IdentityResolver + 'static,
{
    Router::new()
        .route("/applications/", post(open_handler::<R, I>))
        .route("/applications/:id/", get(application_handler::<R, I>))
        .route("/applications/:id/status/", patch(status_handler::<R, I>))
        .route("/auditlogs/", get(auditlogs_handler::<R, I>))
        .with_state(context)
}

#[derive(Debug, Deserialize)]
pub struct OpenApplicationRequest {
    pub candidate: CandidateId,
    pub job: JobId,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

pub(crate) async fn open_handler<R, I>(
    State(context): State<Arc<PipelineContext<R, I>>>,
    axum::Json(request): axum::Json<OpenApplicationRequest>,
) -> Response
where
    R: PipelineRepository + 'static,
    I: IdentityResolver + 'static,
{
    match context
        .engine
        .open_application(request.candidate, request.job, request.score, request.meta)
    {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_handler<R, I>(
    State(context): State<Arc<PipelineContext<R, I>>>,
    Path(id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    I: IdentityResolver + 'static,
{
    match context.engine.application(&ApplicationId(id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R, I>(
    State(context): State<Arc<PipelineContext<R, I>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: PipelineRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = context.identity.resolve(&headers);
    let id = ApplicationId(id);

    match context.engine.transition(
        &id,
        &request.status,
        &request.note,
        request.reject_reason.as_deref(),
        actor,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn auditlogs_handler<R, I>(
    State(context): State<Arc<PipelineContext<R, I>>>,
) -> Response
where
    R: PipelineRepository + 'static,
    I: IdentityResolver + 'static,
{
    match context.engine.audit_trail() {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps engine errors onto the wire contract: validation failures are 400
/// with their message as `detail`, an unknown id 404, a lost concurrent
/// race 409, and storage failures a generic 500 with the cause logged
/// server-side only.
fn error_response(err: PipelineError) -> Response {
    let status = match &err {
        PipelineError::NotFound => StatusCode::NOT_FOUND,
        PipelineError::ConcurrentTransition => StatusCode::CONFLICT,
        PipelineError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return internal_error_response(&err);
    }

    warn!(detail = %err, "pipeline request rejected");
    (status, axum::Json(json!({ "detail": err.to_string() }))).into_response()
}

/// Generic 500 body; the failure detail stays in the server log.
pub(crate) fn internal_error_response(err: &dyn std::error::Error) -> Response {
    error!(detail = ?err, "pipeline request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "detail": "Internal server error" })),
    )
        .into_response()
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        error_response(self)
    }
}
