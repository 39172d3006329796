use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::attribution::AttributionSource;
use super::flow::FormFlow;
use super::session::{
    Advance, FormSession, KeyPress, SessionError, SessionId, SessionPhase, SessionView,
    SubmissionStatus,
};
use super::store::RecordStore;

/// What a single advance request did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Moved,
    Rejected,
    Submitted,
    Duplicate,
    Failed,
    Busy,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceReport<D> {
    pub outcome: AdvanceOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_score: Option<u8>,
    pub session: SessionView<D>,
}

/// Owns every open session of one flow and the store its records are written to.
pub struct RegistrationService<F: FormFlow, S> {
    flow: Arc<F>,
    store: Arc<S>,
    sessions: Mutex<HashMap<SessionId, FormSession<F>>>,
    session_ttl: Duration,
}

impl<F, S> RegistrationService<F, S>
where
    F: FormFlow,
    S: RecordStore + 'static,
{
    pub fn new(flow: Arc<F>, store: Arc<S>, session_ttl: Duration) -> Self {
        Self {
            flow,
            store,
            sessions: Mutex::new(HashMap::new()),
            session_ttl,
        }
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn open(&self, opening: F::Opening) -> SessionView<F::Draft> {
        let session = FormSession::open(self.flow.as_ref(), opening, Utc::now());
        let view = session.view(self.flow.as_ref());
        debug!(session_id = %session.id(), collection = self.flow.collection(), "session opened");
        self.lock().insert(session.id(), session);
        view
    }

    pub fn view(&self, id: SessionId) -> Result<SessionView<F::Draft>, ServiceError> {
        self.with_session(id, |session, flow| Ok(session.view(flow)))
    }

    pub fn apply(
        &self,
        id: SessionId,
        input: F::Input,
    ) -> Result<SessionView<F::Draft>, ServiceError> {
        self.with_session(id, |session, flow| {
            session
                .apply(flow, input, Utc::now())
                .map_err(|SessionError::NotEditable(phase)| ServiceError::NotEditable { id, phase })?;
            Ok(session.view(flow))
        })
    }

    pub fn retreat(&self, id: SessionId) -> Result<SessionView<F::Draft>, ServiceError> {
        self.with_session(id, |session, flow| {
            session.retreat(Utc::now());
            Ok(session.view(flow))
        })
    }

    /// Validates and moves forward; on the last step writes the record and waits for the store.
    pub async fn advance(
        &self,
        id: SessionId,
        source: &dyn AttributionSource,
    ) -> Result<AdvanceReport<F::Draft>, ServiceError> {
        let advance = self.with_session(id, |session, flow| {
            Ok(session.advance(flow, source, Utc::now()))
        })?;
        self.drive(id, advance).await
    }

    /// Returns `None` when the key is not the advance shortcut or the session is finished.
    pub async fn key_press(
        &self,
        id: SessionId,
        key: &KeyPress,
        source: &dyn AttributionSource,
    ) -> Result<Option<AdvanceReport<F::Draft>>, ServiceError> {
        let advance = self.with_session(id, |session, flow| {
            Ok(session.key_press(flow, key, source, Utc::now()))
        })?;
        match advance {
            Some(advance) => self.drive(id, advance).await.map(Some),
            None => Ok(None),
        }
    }

    /// Discards the session and its draft. Sessions with an outstanding insert are kept.
    pub fn close(&self, id: SessionId) -> Result<bool, ServiceError> {
        let mut sessions = self.lock();
        match sessions.get(&id).map(FormSession::phase) {
            Some(SessionPhase::Submitting) => Err(ServiceError::NotEditable {
                id,
                phase: SessionPhase::Submitting,
            }),
            Some(_) => Ok(sessions.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    /// Drops sessions idle for longer than the configured TTL, returning how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, self.session_ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, collection = self.flow.collection(), "expired sessions swept");
        }
        removed
    }

    pub fn open_sessions(&self) -> usize {
        self.lock().len()
    }

    async fn drive(
        &self,
        id: SessionId,
        advance: Advance<F::Record>,
    ) -> Result<AdvanceReport<F::Draft>, ServiceError> {
        let (outcome, lead_score) = match advance {
            Advance::Moved { .. } => (AdvanceOutcome::Moved, None),
            Advance::Rejected(_) => (AdvanceOutcome::Rejected, None),
            Advance::Busy => (AdvanceOutcome::Busy, None),
            Advance::Finished => (AdvanceOutcome::Finished, None),
            Advance::Submit(pending) => {
                let result = self
                    .store
                    .insert(&pending.collection, &pending.record)
                    .await;

                let status = self.with_session(id, |session, flow| {
                    Ok(session.resolve(flow, &result))
                })?;

                match (status, &result) {
                    (SubmissionStatus::Submitted, _) => {
                        info!(
                            session_id = %pending.session_id,
                            collection = %pending.collection,
                            lead_score = ?pending.lead_score,
                            "registration stored"
                        );
                        (AdvanceOutcome::Submitted, pending.lead_score)
                    }
                    (SubmissionStatus::Duplicate, _) => {
                        warn!(
                            session_id = %pending.session_id,
                            collection = %pending.collection,
                            "registration rejected as duplicate"
                        );
                        (AdvanceOutcome::Duplicate, None)
                    }
                    (SubmissionStatus::Failed, Err(err)) => {
                        error!(
                            session_id = %pending.session_id,
                            collection = %pending.collection,
                            error = %err,
                            "registration could not be stored"
                        );
                        (AdvanceOutcome::Failed, None)
                    }
                    (SubmissionStatus::Failed, Ok(())) => (AdvanceOutcome::Failed, None),
                }
            }
        };

        let session = self.view(id)?;
        Ok(AdvanceReport {
            outcome,
            lead_score,
            session,
        })
    }

    /// Runs `action` against a live session. Expired sessions are dropped and reported missing.
    fn with_session<T>(
        &self,
        id: SessionId,
        action: impl FnOnce(&mut FormSession<F>, &F) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut sessions = self.lock();
        let expired = match sessions.get(&id) {
            Some(session) => session.is_expired(Utc::now(), self.session_ttl),
            None => return Err(ServiceError::SessionNotFound(id)),
        };
        if expired {
            sessions.remove(&id);
            return Err(ServiceError::SessionNotFound(id));
        }
        let session = sessions
            .get_mut(&id)
            .ok_or(ServiceError::SessionNotFound(id))?;
        action(session, self.flow.as_ref())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, FormSession<F>>> {
        self.sessions.lock().expect("session map mutex poisoned")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {id} is not accepting changes while {phase:?}")]
    NotEditable { id: SessionId, phase: SessionPhase },
}
