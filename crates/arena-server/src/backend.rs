use arena_core::cell::Grid;
use arena_core::range::A1Range;
use arena_core::store::{MemoryStore, RangeStore, StoreError};
use arena_sheets::{SheetsClient, SheetsConfig};

use crate::config::{BackendKind, StoreConfig};

/// The store the server runs against, picked at startup.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryStore),
    Sheets(SheetsClient),
    /// Sheets was selected but could not be set up; every call fails with
    /// `StoreError::Unconfigured` carrying this reason.
    Unconfigured(String),
}

impl Backend {
    pub fn from_config(config: &StoreConfig) -> Self {
        match config.backend {
            BackendKind::Memory => {
                tracing::info!("Using in-memory store; data is lost on restart");
                Self::Memory(MemoryStore::new())
            },
            BackendKind::Sheets => {
                let sheets = SheetsConfig {
                    spreadsheet_id: config.spreadsheet_id.clone().unwrap_or_default(),
                    access_token: config.access_token.clone().unwrap_or_default(),
                    service_account_email: config
                        .service_account_email
                        .clone()
                        .unwrap_or_default(),
                    private_key: config.private_key.clone().unwrap_or_default(),
                    private_key_base64: config.private_key_base64.clone().unwrap_or_default(),
                    token_url: config.token_url.clone(),
                    base_url: config.base_url.clone(),
                    timeout_secs: config.request_timeout_secs,
                };
                match SheetsClient::new(sheets) {
                    Ok(client) => {
                        tracing::info!(
                            spreadsheet = client.spreadsheet_id(),
                            "Using Google Sheets store"
                        );
                        Self::Sheets(client)
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Google Sheets store unavailable");
                        Self::Unconfigured(e.to_string())
                    },
                }
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sheets(_) => "sheets",
            Self::Unconfigured(_) => "unconfigured",
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Unconfigured(_))
    }

    fn unconfigured(reason: &str) -> StoreError {
        StoreError::Unconfigured(reason.to_string())
    }
}

impl RangeStore for Backend {
    async fn read(&self, range: &A1Range) -> Result<Grid, StoreError> {
        match self {
            Self::Memory(s) => s.read(range).await,
            Self::Sheets(s) => s.read(range).await,
            Self::Unconfigured(r) => Err(Self::unconfigured(r)),
        }
    }

    async fn append(&self, range: &A1Range, rows: Grid) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.append(range, rows).await,
            Self::Sheets(s) => s.append(range, rows).await,
            Self::Unconfigured(r) => Err(Self::unconfigured(r)),
        }
    }

    async fn write(&self, range: &A1Range, grid: Grid) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.write(range, grid).await,
            Self::Sheets(s) => s.write(range, grid).await,
            Self::Unconfigured(r) => Err(Self::unconfigured(r)),
        }
    }

    async fn list_sheets(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Memory(s) => s.list_sheets().await,
            Self::Sheets(s) => s.list_sheets().await,
            Self::Unconfigured(r) => Err(Self::unconfigured(r)),
        }
    }

    async fn add_sheet(&self, title: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.add_sheet(title).await,
            Self::Sheets(s) => s.add_sheet(title).await,
            Self::Unconfigured(r) => Err(Self::unconfigured(r)),
        }
    }
}
