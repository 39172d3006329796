use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use lead_funnel::workflows::admin::{admin_router, AdminService};
use lead_funnel::workflows::registration::{
    registration_router, LeadCaptureFlow, MasterclassFlow, RecordStore, RegistrationService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) const MASTERCLASS_BASE: &str = "/api/v1/masterclass";
pub(crate) const LEADS_BASE: &str = "/api/v1/leads";

pub(crate) struct FunnelServices<S> {
    pub(crate) masterclass: Arc<RegistrationService<MasterclassFlow, S>>,
    pub(crate) leads: Arc<RegistrationService<LeadCaptureFlow, S>>,
    pub(crate) admin: Option<Arc<AdminService<S>>>,
}

pub(crate) fn with_funnel_routes<S>(services: FunnelServices<S>) -> axum::Router
where
    S: RecordStore + 'static,
{
    let FunnelServices {
        masterclass,
        leads,
        admin,
    } = services;

    let mut router = registration_router(MASTERCLASS_BASE, masterclass)
        .merge(registration_router(LEADS_BASE, leads));
    if let Some(admin) = admin {
        router = router.merge(admin_router(admin));
    }

    router
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
