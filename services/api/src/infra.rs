use async_trait::async_trait;
use lead_funnel::config::{AppConfig, FunnelConfig};
use lead_funnel::workflows::registration::{
    MemoryRecordStore, PostgrestStore, RecordStore, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Record store selected at startup: the hosted tables when a URL is configured, otherwise a
/// process-local store with the same unique email constraints.
pub(crate) enum ConfiguredStore {
    Postgrest(PostgrestStore),
    Memory(MemoryRecordStore),
}

impl ConfiguredStore {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match (&config.store.url, &config.store.api_key) {
            (Some(url), Some(api_key)) => Ok(Self::Postgrest(PostgrestStore::new(
                url,
                api_key,
                config.store.timeout,
            )?)),
            _ => Ok(Self::Memory(in_memory_store(&config.funnel))),
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Postgrest(_) => "postgrest",
            Self::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl RecordStore for ConfiguredStore {
    async fn insert<R>(&self, collection: &str, record: &R) -> Result<(), StoreError>
    where
        R: Serialize + Sync,
    {
        match self {
            Self::Postgrest(store) => store.insert(collection, record).await,
            Self::Memory(store) => store.insert(collection, record).await,
        }
    }

    async fn select(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        match self {
            Self::Postgrest(store) => store.select(collection).await,
            Self::Memory(store) => store.select(collection).await,
        }
    }
}

/// Memory store mirroring the hosted schema's unique email columns.
pub(crate) fn in_memory_store(funnel: &FunnelConfig) -> MemoryRecordStore {
    MemoryRecordStore::new()
        .with_unique(&funnel.masterclass_collection, "email")
        .with_unique(&funnel.leads_collection, "email")
        .with_unique(&funnel.beta_collection, "email")
}

/// Parses a CLI value using the snake_case wire name of a funnel enum.
pub(crate) fn parse_choice<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase().replace('-', "_")))
        .map_err(|err| format!("unsupported value '{raw}' ({err})"))
}
