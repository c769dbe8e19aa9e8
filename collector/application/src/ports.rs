use std::collections::HashMap;

use async_trait::async_trait;
use collector_domain::{DailyPriceRecord, Instrument, TradeDate};
use serde::{Deserialize, Serialize};
use shaku::Interface;

/// Query name for the terminal's daily chart lookup.
pub const DAILY_CHART_QUERY: &str = "daily_chart";

pub type RawRow = HashMap<String, String>;

/// One response page from the terminal: raw row mappings in
/// terminal-reported order plus the continuation token (`"0"` means no
/// more pages). `parsed == false` marks a payload the terminal layer
/// could not decode; such a page must be treated as empty.
#[derive(Debug, Clone, Default)]
pub struct FetchPage {
    pub rows: Vec<RawRow>,
    pub continuation_token: String,
    pub parsed: bool,
}

#[derive(Debug, Clone)]
pub struct ChartQuery {
    pub instrument_id: String,
    pub as_of: TradeDate,
    pub adjusted: bool,
}

#[async_trait]
pub trait TerminalSession: Interface {
    async fn request(
        &self,
        query_name: &str,
        query: &ChartQuery,
        continuation_token: &str,
    ) -> Result<FetchPage, TerminalError>;

    /// Display-name lookup for an instrument code.
    async fn instrument_name(&self, code: &str) -> Result<Option<String>, TerminalError>;

    fn is_connected(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Terminal session is not connected")]
    NotConnected,

    #[error("Query {query} returned no response for {code}")]
    NoResponse { query: String, code: String },

    #[error("Terminal request failed: {0}")]
    RequestFailed(String),
}

#[async_trait]
pub trait RecordStore: Interface {
    async fn latest_date(&self, instrument_id: &str) -> Result<Option<TradeDate>, StoreError>;

    /// Writes or replaces the record keyed by (instrument, date).
    async fn upsert(
        &self,
        instrument_id: &str,
        record: &DailyPriceRecord,
    ) -> Result<(), StoreError>;

    /// All stored records for one instrument, oldest first.
    async fn load(&self, instrument_id: &str) -> Result<Vec<DailyPriceRecord>, StoreError>;

    async fn flush(&self) -> Result<(), StoreError>;
    async fn shutdown(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Corrupt record for {instrument_id}: {reason}")]
    CorruptRecord {
        instrument_id: String,
        reason: String,
    },
}

#[async_trait]
pub trait InstrumentRegistry: Interface {
    /// Makes sure the instrument is known before collection; returns
    /// true when it was newly registered.
    async fn ensure_registered(
        &self,
        code: &str,
        name: Option<&str>,
    ) -> Result<bool, RegistryError>;

    async fn active_instruments(&self) -> Result<Vec<Instrument>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Registry data error: {0}")]
    DataError(String),
}

#[async_trait]
pub trait QualityValidator: Interface {
    async fn validate(&self, instrument_id: &str)
        -> Result<Vec<ValidationFinding>, ValidationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub check: String,
    pub severity: Severity,
    pub message: String,
}

impl ValidationFinding {
    pub fn new(check: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Pass,
    Warning,
    Error,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}
