use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::service::{AdminError, AdminService};
use crate::workflows::registration::{RecordStore, StoreError};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

pub fn admin_router<S>(service: Arc<AdminService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/admin/overview", get(overview_handler::<S>))
        .route("/api/v1/admin/tables/:table", get(table_handler::<S>))
        .route(
            "/api/v1/admin/tables/:table/export",
            get(export_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn overview_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    if let Err(error) = service.authorize(presented_token(&headers)) {
        return admin_error(error);
    }
    match service.overview().await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => admin_error(error),
    }
}

pub(crate) async fn table_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(table): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    if let Err(error) = service.authorize(presented_token(&headers)) {
        return admin_error(error);
    }
    match service.rows(&table, params.search.as_deref()).await {
        Ok(rows) => {
            let payload = json!({
                "table": table,
                "count": rows.len(),
                "rows": rows,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => admin_error(error),
    }
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(table): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    if let Err(error) = service.authorize(presented_token(&headers)) {
        return admin_error(error);
    }
    match service.export(&table, params.search.as_deref()).await {
        Ok(csv) => {
            let filename = format!(
                "attachment; filename=\"{}-{}.csv\"",
                table.replace('_', "-"),
                Utc::now().format("%Y-%m-%d")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, filename),
                ],
                csv,
            )
                .into_response()
        }
        Err(error) => admin_error(error),
    }
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn admin_error(error: AdminError) -> Response {
    let status = match &error {
        AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
        AdminError::UnknownTable(_) => StatusCode::NOT_FOUND,
        AdminError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdminError::Store(_) => StatusCode::BAD_GATEWAY,
        AdminError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
