use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::registration::{
    ClientContext, CompanySize, MasterclassFlow, MemoryRecordStore, RecordStore,
    RegistrationInput, RegistrationService, RoleType, SessionId, StoreError, TechnicalLevel, Tool,
    UNIQUE_VIOLATION,
};

pub(super) const COLLECTION: &str = "masterclass_registrations";

pub(super) fn masterclass_flow() -> Arc<MasterclassFlow> {
    Arc::new(MasterclassFlow::new(
        COLLECTION,
        NaiveDate::from_ymd_opt(2025, 10, 4).expect("valid date"),
    ))
}

pub(super) fn unique_email_store() -> Arc<MemoryRecordStore> {
    Arc::new(MemoryRecordStore::new().with_unique(COLLECTION, "email"))
}

pub(super) fn build_service<S: RecordStore + 'static>(
    store: Arc<S>,
) -> Arc<RegistrationService<MasterclassFlow, S>> {
    Arc::new(RegistrationService::new(
        masterclass_flow(),
        store,
        Duration::minutes(60),
    ))
}

pub(super) fn page_context() -> ClientContext {
    ClientContext {
        page_url: Some("/masterclass?utm_source=linkedin&utm_campaign=october".to_string()),
        referrer: Some("https://www.linkedin.com/".to_string()),
        user_agent: None,
    }
    .with_user_agent(Some("Mozilla/5.0 (Linux; Android 14) Mobile Safari/537.36".to_string()))
}

/// Answers for every step, in step order; the first four satisfy the required validators.
pub(super) fn answers(email: &str) -> Vec<RegistrationInput> {
    vec![
        RegistrationInput::Name("Ada Lovelace".to_string()),
        RegistrationInput::Email(email.to_string()),
        RegistrationInput::RoleType(RoleType::Professional),
        RegistrationInput::TechnicalLevel(TechnicalLevel::NonTechnical),
        RegistrationInput::ToggleTool(Tool::Excel),
        RegistrationInput::CompanySize(Some(CompanySize::Medium)),
        RegistrationInput::BiggestChallenge(
            "Turning a pile of spreadsheets into decisions the board actually trusts".to_string(),
        ),
        RegistrationInput::LearningGoal("Build a habit of questioning every chart".to_string()),
    ]
}

/// Fills every answer, then advances to the last step without submitting.
pub(super) async fn fill_to_last_step<S: RecordStore + 'static>(
    service: &Arc<RegistrationService<MasterclassFlow, S>>,
    email: &str,
) -> SessionId {
    let view = service.open(Default::default());
    let id = view.session_id;
    for input in answers(email) {
        service.apply(id, input).expect("session accepts input");
    }
    let context = page_context();
    for _ in 0..view.step_count - 1 {
        service.advance(id, &context).await.expect("session exists");
    }
    id
}

/// Store that rejects every insert as a duplicate.
pub(super) struct ConflictStore;

#[async_trait]
impl RecordStore for ConflictStore {
    async fn insert<R>(&self, _collection: &str, _record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        Err(StoreError::Rejected {
            code: UNIQUE_VIOLATION.to_string(),
            message: "duplicate key value violates unique constraint".to_string(),
        })
    }

    async fn select(&self, _collection: &str) -> Result<Vec<Value>, StoreError> {
        Ok(Vec::new())
    }
}

/// Store that is never reachable.
pub(super) struct UnavailableStore;

#[async_trait]
impl RecordStore for UnavailableStore {
    async fn insert<R>(&self, _collection: &str, _record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn select(&self, _collection: &str) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Memory store whose inserts wait until the gate is opened.
#[derive(Default)]
pub(super) struct GatedStore {
    pub(super) inner: MemoryRecordStore,
    pub(super) gate: Notify,
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn insert<R>(&self, collection: &str, record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        self.gate.notified().await;
        self.inner.insert(collection, record).await
    }

    async fn select(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.select(collection).await
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request builds")
}
