use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::attribution::ClientContext;
use super::flow::FormFlow;
use super::service::{AdvanceOutcome, AdvanceReport, RegistrationService, ServiceError};
use super::session::{KeyPress, SessionId};
use super::store::RecordStore;

/// Key event plus the page context needed if the key ends up submitting.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRequest {
    #[serde(flatten)]
    pub key: KeyPress,
    #[serde(default)]
    pub context: ClientContext,
}

/// Session endpoints for one flow mounted under `base`, e.g. `/api/v1/masterclass`.
pub fn registration_router<F, S>(base: &str, service: Arc<RegistrationService<F, S>>) -> Router
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    let base = base.trim_end_matches('/');
    Router::new()
        .route(&format!("{base}/sessions"), post(open_handler::<F, S>))
        .route(
            &format!("{base}/sessions/:session_id"),
            get(view_handler::<F, S>).delete(close_handler::<F, S>),
        )
        .route(
            &format!("{base}/sessions/:session_id/answers"),
            put(apply_handler::<F, S>),
        )
        .route(
            &format!("{base}/sessions/:session_id/advance"),
            post(advance_handler::<F, S>),
        )
        .route(
            &format!("{base}/sessions/:session_id/retreat"),
            post(retreat_handler::<F, S>),
        )
        .route(
            &format!("{base}/sessions/:session_id/keys"),
            post(key_handler::<F, S>),
        )
        .with_state(service)
}

pub(crate) async fn open_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    opening: Option<Json<F::Opening>>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    let opening = opening.map(|Json(opening)| opening).unwrap_or_default();
    (StatusCode::CREATED, Json(service.open(opening))).into_response()
}

pub(crate) async fn view_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    match service.view(session_id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn apply_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
    Json(input): Json<F::Input>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    match service.apply(session_id, input) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn advance_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
    headers: HeaderMap,
    context: Option<Json<ClientContext>>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    let context = context
        .map(|Json(context)| context)
        .unwrap_or_default()
        .with_user_agent(user_agent(&headers));

    match service.advance(session_id, &context).await {
        Ok(report) => report_response(report),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn retreat_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    match service.retreat(session_id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn key_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
    headers: HeaderMap,
    Json(request): Json<KeyRequest>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    let context = request.context.with_user_agent(user_agent(&headers));

    match service.key_press(session_id, &request.key, &context).await {
        Ok(Some(report)) => report_response(report),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn close_handler<F, S>(
    State(service): State<Arc<RegistrationService<F, S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    match service.close(session_id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error(error),
    }
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn report_response<D: Serialize>(report: AdvanceReport<D>) -> Response {
    let status = match report.outcome {
        AdvanceOutcome::Moved => StatusCode::OK,
        AdvanceOutcome::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        AdvanceOutcome::Submitted => StatusCode::CREATED,
        AdvanceOutcome::Duplicate => StatusCode::CONFLICT,
        AdvanceOutcome::Failed => StatusCode::SERVICE_UNAVAILABLE,
        AdvanceOutcome::Busy => StatusCode::LOCKED,
        AdvanceOutcome::Finished => StatusCode::GONE,
    };
    (status, Json(report)).into_response()
}

fn service_error(error: ServiceError) -> Response {
    let status = match error {
        ServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::NotEditable { .. } => StatusCode::CONFLICT,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
