pub mod collector;
pub mod paginator;
pub mod parser;
pub mod persistence;
pub mod ports;
pub mod progress;
pub mod rate_limiter;
pub mod skip;
pub mod status;

pub use collector::{CollectError, CollectOptions, CollectorService, CollectorServiceImpl};
pub use paginator::{Continuation, RequestPaginator, FRESH_CONTEXT_TOKEN};
pub use persistence::PersistenceGateway;
pub use ports::{
    ChartQuery, FetchPage, InstrumentRegistry, QualityValidator, RawRow, RecordStore,
    RegistryError, Severity, StoreError, TerminalError, TerminalSession, ValidationError,
    ValidationFinding, DAILY_CHART_QUERY,
};
pub use progress::{NoopProgress, ProgressObserver};
pub use rate_limiter::RateLimiter;
pub use skip::SkipPolicy;
pub use status::{CollectionOutcome, CollectionStatus, CollectionTotals, TotalsSnapshot};
