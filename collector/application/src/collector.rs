use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use collector_domain::TradeDate;
use shaku::{Component, Interface};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::paginator::RequestPaginator;
use crate::parser;
use crate::persistence::PersistenceGateway;
use crate::ports::{
    ChartQuery, InstrumentRegistry, QualityValidator, RecordStore, RegistryError, TerminalSession,
    ValidationFinding,
};
use crate::progress::{NoopProgress, ProgressObserver};
use crate::rate_limiter::RateLimiter;
use crate::skip::SkipPolicy;
use crate::status::{CollectionOutcome, CollectionStatus, CollectionTotals, TotalsSnapshot};

/// Bound on page requests per instrument, against runaway pagination.
const MAX_REQUESTS_PER_INSTRUMENT: usize = 20;

/// Options shared by the collection entry points.
#[derive(Clone)]
pub struct CollectOptions {
    pub start_date: Option<TradeDate>,
    pub end_date: Option<TradeDate>,
    pub update_existing: bool,
    pub validate_data: bool,
    pub progress: Arc<dyn ProgressObserver>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            update_existing: true,
            validate_data: false,
            progress: Arc::new(NoopProgress),
        }
    }
}

#[async_trait]
pub trait CollectorService: Interface {
    /// Collects one instrument; all failures are contained in the
    /// returned outcome.
    async fn collect_single(
        &self,
        instrument_id: &str,
        options: &CollectOptions,
    ) -> CollectionOutcome;

    /// Collects a batch of instruments in the given order, spacing
    /// instruments through the rate limiter and aggregating outcomes.
    async fn collect_batch(
        &self,
        instrument_ids: &[String],
        options: &CollectOptions,
    ) -> Result<CollectionStatus, CollectError>;

    /// Collects every active instrument known to the registry.
    async fn collect_all_registered(
        &self,
        options: &CollectOptions,
    ) -> Result<CollectionStatus, CollectError>;

    /// Cumulative counters since process start.
    fn status(&self) -> TotalsSnapshot;
}

#[derive(Component)]
#[shaku(interface = CollectorService)]
pub struct CollectorServiceImpl {
    #[shaku(inject)]
    session: Arc<dyn TerminalSession>,

    #[shaku(inject)]
    store: Arc<dyn RecordStore>,

    #[shaku(inject)]
    registry: Arc<dyn InstrumentRegistry>,

    #[shaku(inject)]
    validator: Arc<dyn QualityValidator>,

    #[shaku(inject)]
    rate_limiter: Arc<dyn RateLimiter>,

    #[shaku(default = MAX_REQUESTS_PER_INSTRUMENT)]
    max_requests: usize,

    #[shaku(default = CollectionTotals::default())]
    totals: CollectionTotals,
}

impl CollectorServiceImpl {
    pub fn new(
        session: Arc<dyn TerminalSession>,
        store: Arc<dyn RecordStore>,
        registry: Arc<dyn InstrumentRegistry>,
        validator: Arc<dyn QualityValidator>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            session,
            store,
            registry,
            validator,
            rate_limiter,
            max_requests: MAX_REQUESTS_PER_INSTRUMENT,
            totals: CollectionTotals::default(),
        }
    }

    async fn collect_instrument(
        &self,
        instrument_id: &str,
        options: &CollectOptions,
    ) -> CollectionOutcome {
        if !self.session.is_connected() {
            return CollectionOutcome::failure(instrument_id, "terminal session not connected");
        }

        // Registration happens before any chart request; its failure
        // aborts only this instrument.
        let newly_registered = match self.register(instrument_id).await {
            Ok(newly) => newly,
            Err(e) => {
                warn!(instrument_id, error = %e, "Registration failed");
                return CollectionOutcome::failure(
                    instrument_id,
                    format!("registration failed: {e}"),
                );
            }
        };

        // A failed lookup resolves to "no stored date": fail open toward
        // re-collection, never toward silently stale data.
        let latest = match self.store.latest_date(instrument_id).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(instrument_id, error = %e, "Latest-date lookup failed, collecting anyway");
                None
            }
        };

        if !options.update_existing && SkipPolicy.should_skip(latest) {
            info!(instrument_id, ?latest, "Stored data already current, skipping");
            return CollectionOutcome::already_current(instrument_id, newly_registered);
        }

        let query = ChartQuery {
            instrument_id: instrument_id.to_string(),
            as_of: options
                .end_date
                .unwrap_or_else(|| TradeDate::new(Local::now().date_naive())),
            adjusted: true,
        };

        let mut paginator = RequestPaginator::new(
            self.session.clone(),
            self.rate_limiter.clone(),
            query,
            self.max_requests,
        );
        let gateway = PersistenceGateway::new(self.store.clone());

        let mut records_saved = 0;
        let mut fetch_error: Option<String> = None;

        loop {
            let page = match paginator.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    // Records from earlier pages are already persisted.
                    warn!(instrument_id, error = %e, "Page request failed");
                    fetch_error = Some(e.to_string());
                    break;
                }
            };

            let mut parsed = parser::parse_page(instrument_id, &page);
            if parsed.is_empty() {
                // Either the terminal ran out of data or the payload was
                // unusable; both end the loop.
                break;
            }

            let mut crossed_start = false;
            if let Some(start) = options.start_date {
                let before = parsed.len();
                parsed.retain(|record| record.date() >= start);
                crossed_start = parsed.len() < before;
            }

            records_saved += gateway.save(instrument_id, &parsed).await;

            if crossed_start {
                break;
            }
        }

        let mut outcome = CollectionOutcome {
            instrument_id: instrument_id.to_string(),
            succeeded: records_saved > 0,
            records_saved,
            skipped: false,
            newly_registered,
            error: None,
            validation: Vec::new(),
        };

        if outcome.succeeded {
            info!(instrument_id, records_saved, "Collection finished");
            outcome.error = fetch_error;
        } else {
            outcome.error =
                Some(fetch_error.unwrap_or_else(|| "no records collected".to_string()));
            warn!(instrument_id, error = outcome.error.as_deref(), "Collection yielded nothing");
        }

        if options.validate_data && outcome.succeeded {
            outcome.validation = self.run_validation(instrument_id).await;
        }

        outcome
    }

    async fn register(&self, instrument_id: &str) -> Result<bool, RegistryError> {
        let name = match self.session.instrument_name(instrument_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!(instrument_id, error = %e, "Display-name lookup failed");
                None
            }
        };

        self.registry
            .ensure_registered(instrument_id, name.as_deref())
            .await
    }

    /// Findings are recorded and logged; they never flip a successful
    /// collection to failed.
    async fn run_validation(&self, instrument_id: &str) -> Vec<ValidationFinding> {
        match self.validator.validate(instrument_id).await {
            Ok(findings) => {
                let errors = findings.iter().filter(|f| f.severity.is_error()).count();
                if errors > 0 {
                    warn!(instrument_id, errors, "Quality validation reported errors");
                }
                findings
            }
            Err(e) => {
                warn!(instrument_id, error = %e, "Quality validation failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl CollectorService for CollectorServiceImpl {
    async fn collect_single(
        &self,
        instrument_id: &str,
        options: &CollectOptions,
    ) -> CollectionOutcome {
        let outcome = self.collect_instrument(instrument_id, options).await;
        self.totals.fold_outcome(&outcome);
        outcome
    }

    async fn collect_batch(
        &self,
        instrument_ids: &[String],
        options: &CollectOptions,
    ) -> Result<CollectionStatus, CollectError> {
        // A fully unreachable terminal fails the batch before any work.
        if !self.session.is_connected() {
            return Err(CollectError::TerminalUnavailable);
        }

        let run_id = Uuid::new_v4();
        let total = instrument_ids.len();
        info!(
            %run_id,
            total,
            update_existing = options.update_existing,
            "Starting batch collection"
        );

        let started = Instant::now();
        let mut status = CollectionStatus::default();

        for (idx, instrument_id) in instrument_ids.iter().enumerate() {
            if let Err(e) = options.progress.on_progress(idx + 1, total, instrument_id) {
                debug!(%run_id, instrument_id, error = %e, "Progress observer failed, ignoring");
            }

            let outcome = self.collect_instrument(instrument_id, options).await;
            status.absorb(outcome);

            if idx + 1 < total {
                self.rate_limiter.acquire().await;
            }
        }

        status.elapsed = started.elapsed();
        self.totals.fold(&status);

        info!(
            %run_id,
            succeeded = status.succeeded.len(),
            failed = status.failed.len(),
            skipped = status.skipped.len(),
            registered = status.registered,
            total_collected = status.total_collected,
            elapsed_secs = status.elapsed.as_secs_f64(),
            "Batch collection finished"
        );

        Ok(status)
    }

    async fn collect_all_registered(
        &self,
        options: &CollectOptions,
    ) -> Result<CollectionStatus, CollectError> {
        let instruments = self.registry.active_instruments().await?;
        if instruments.is_empty() {
            return Err(CollectError::NoActiveInstruments);
        }

        let codes: Vec<String> = instruments.into_iter().map(|i| i.code).collect();
        info!(count = codes.len(), "Collecting all registered instruments");

        let mut options = options.clone();
        options.update_existing = true;
        self.collect_batch(&codes, &options).await
    }

    fn status(&self) -> TotalsSnapshot {
        self.totals.snapshot()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Terminal session is unreachable")]
    TerminalUnavailable,

    #[error("No active instruments are registered")]
    NoActiveInstruments,

    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),
}
