use std::collections::HashSet;
use std::sync::Arc;

use collector_domain::DailyPriceRecord;
use tracing::warn;

use crate::ports::RecordStore;

/// Upserts normalized records into the store. Individual write failures
/// are logged and counted out, never propagated.
pub struct PersistenceGateway {
    store: Arc<dyn RecordStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the number of rows actually written. Within the batch the
    /// first occurrence of a date wins (terminal-reported order), so no
    /// (instrument, date) pair is written twice.
    pub async fn save(&self, instrument_id: &str, records: &[DailyPriceRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }

        let mut seen = HashSet::new();
        let mut written = 0;

        for record in records {
            if !seen.insert(record.date()) {
                continue;
            }

            match self.store.upsert(instrument_id, record).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(instrument_id, date = %record.date(), error = %e, "Record write failed")
                }
            }
        }

        if let Err(e) = self.store.flush().await {
            warn!(instrument_id, error = %e, "Store flush failed");
        }

        written
    }
}
