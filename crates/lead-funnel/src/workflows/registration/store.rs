use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Postgres `unique_violation`, surfaced verbatim by the hosted store.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Hosted table storage reached over its REST interface.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert<R>(&self, collection: &str, record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync;

    /// All rows of `collection`, newest first.
    async fn select(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::Rejected { code, .. } if code == UNIQUE_VIOLATION)
    }
}

/// Process-local stand-in for the hosted store with per-collection unique columns.
///
/// Rows receive `id` and `created_at` the way the hosted tables default them.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<HashMap<String, Vec<Value>>>,
    unique: HashMap<String, Vec<String>>,
    insert_attempts: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unique(mut self, collection: &str, column: &str) -> Self {
        self.unique
            .entry(collection.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.rows
            .lock()
            .expect("record store mutex poisoned")
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of insert calls received, including rejected ones.
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    fn duplicate_column(&self, collection: &str, existing: &[Value], row: &Value) -> Option<String> {
        let columns = self.unique.get(collection)?;
        columns
            .iter()
            .find(|column| {
                let candidate = &row[column.as_str()];
                !candidate.is_null()
                    && existing
                        .iter()
                        .any(|stored| &stored[column.as_str()] == candidate)
            })
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert<R>(&self, collection: &str, record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        let mut row = serde_json::to_value(record)?;
        let Some(fields) = row.as_object_mut() else {
            return Err(StoreError::Rejected {
                code: "PGRST102".to_string(),
                message: "record must serialize to a JSON object".to_string(),
            });
        };
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut guard = self.rows.lock().expect("record store mutex poisoned");
        let existing = guard.entry(collection.to_string()).or_default();
        if let Some(column) = self.duplicate_column(collection, existing, &row) {
            return Err(StoreError::Rejected {
                code: UNIQUE_VIOLATION.to_string(),
                message: format!(
                    "duplicate key value violates unique constraint \"{collection}_{column}_key\""
                ),
            });
        }
        existing.push(row);
        Ok(())
    }

    async fn select(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let mut rows = self.rows(collection);
        rows.reverse();
        Ok(rows)
    }
}
