use std::sync::Arc;

use serde_json::Value;

use super::export::{export_csv, ExportError};
use super::overview::{filter_rows, summarize, FunnelOverview};
use crate::config::FunnelConfig;
use crate::workflows::registration::{RecordStore, StoreError};

/// Tables the dashboard may read, by collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminTables {
    pub leads: String,
    pub beta_testers: String,
    pub masterclass: String,
}

impl AdminTables {
    pub fn from_config(config: &FunnelConfig) -> Self {
        Self {
            leads: config.leads_collection.clone(),
            beta_testers: config.beta_collection.clone(),
            masterclass: config.masterclass_collection.clone(),
        }
    }

    fn contains(&self, table: &str) -> bool {
        [&self.leads, &self.beta_testers, &self.masterclass]
            .iter()
            .any(|known| known.as_str() == table)
    }
}

/// Read-only reporting over the funnel tables, guarded by a static token.
pub struct AdminService<S> {
    store: Arc<S>,
    tables: AdminTables,
    token: String,
}

impl<S> AdminService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, tables: AdminTables, token: impl Into<String>) -> Self {
        Self {
            store,
            tables,
            token: token.into(),
        }
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<(), AdminError> {
        match presented {
            Some(token) if token == self.token => Ok(()),
            _ => Err(AdminError::Unauthorized),
        }
    }

    pub async fn overview(&self) -> Result<FunnelOverview, AdminError> {
        let (leads, beta_testers, masterclass) = tokio::try_join!(
            self.store.select(&self.tables.leads),
            self.store.select(&self.tables.beta_testers),
            self.store.select(&self.tables.masterclass),
        )?;
        Ok(summarize(&leads, &beta_testers, &masterclass))
    }

    pub async fn rows(&self, table: &str, search: Option<&str>) -> Result<Vec<Value>, AdminError> {
        if !self.tables.contains(table) {
            return Err(AdminError::UnknownTable(table.to_string()));
        }
        let rows = self.store.select(table).await?;
        Ok(filter_rows(rows, search.unwrap_or_default()))
    }

    pub async fn export(&self, table: &str, search: Option<&str>) -> Result<String, AdminError> {
        let rows = self.rows(table, search).await?;
        Ok(export_csv(&rows)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("missing or invalid admin token")]
    Unauthorized,
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
