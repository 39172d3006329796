//! Record store adapter for a hosted PostgREST endpoint.
//!
//! Rows are written to `{base}/rest/v1/{collection}` with the project's public API key, the same
//! call the browser client makes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{RecordStore, StoreError};

pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Error body returned by PostgREST for rejected requests.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Unavailable(format!("failed to build HTTP client: {err}")))?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Reuses an existing [`reqwest::Client`] so connection pools can be shared.
    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn table_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(rejection(status.as_u16(), &body))
    }
}

/// Maps a non-2xx response to a store error, keeping the database error code when present.
pub(crate) fn rejection(status: u16, body: &str) -> StoreError {
    match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(PostgrestErrorBody {
            code: Some(code),
            message,
        }) => StoreError::Rejected {
            code,
            message: message.unwrap_or_default(),
        },
        _ if status >= 500 => StoreError::Unavailable(format!("HTTP {status}: {body}")),
        _ => StoreError::Rejected {
            code: status.to_string(),
            message: body.to_string(),
        },
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn insert<R>(&self, collection: &str, record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        let response = self
            .authorized(self.client.post(self.table_url(collection)))
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(transport)?;

        Self::ensure_success(response).await.map(|_| ())
    }

    async fn select(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let response = self
            .authorized(self.client.get(self.table_url(collection)))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(transport)?;

        let response = Self::ensure_success(response).await?;
        response.json::<Vec<Value>>().await.map_err(transport)
    }
}
