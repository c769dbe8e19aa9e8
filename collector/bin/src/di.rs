use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use collector_application::CollectorServiceImpl;
use collector_infrastructure::rate_limiting::interval::IntervalRateLimiterParameters;
use collector_infrastructure::registry::file::FileInstrumentRegistryParameters;
use collector_infrastructure::store::parquet::ParquetRecordStoreParameters;
use collector_infrastructure::terminal::simulated::SimulatedTerminalSessionParameters;
use collector_infrastructure::{
    FileInstrumentRegistry, IntervalRateLimiter, ParquetRecordStore, SimulatedTerminalSession,
    StoreQualityValidator,
};
use shaku::module;
use tokio::sync::Mutex;

module! {
    pub AppModule {
        components = [
            SimulatedTerminalSession,
            ParquetRecordStore,
            FileInstrumentRegistry,
            StoreQualityValidator,
            IntervalRateLimiter,
            CollectorServiceImpl
        ],
        providers = []
    }
}

pub struct AppSettings {
    pub data_dir: PathBuf,
    pub request_delay: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            request_delay: Duration::from_millis(200),
        }
    }
}

pub fn create_app_module(settings: &AppSettings) -> AppModule {
    std::fs::create_dir_all(&settings.data_dir).expect("Failed to create data directory");

    AppModule::builder()
        .with_component_parameters::<SimulatedTerminalSession>(SimulatedTerminalSessionParameters {
            base_price: 73_000,
            rows_per_page: 120,
            total_days: 600,
            connected: true,
        })
        .with_component_parameters::<ParquetRecordStore>(ParquetRecordStoreParameters {
            data_dir: settings.data_dir.clone(),
            tables: Arc::new(Mutex::new(HashMap::new())),
            dirty: Arc::new(Mutex::new(HashSet::new())),
        })
        .with_component_parameters::<FileInstrumentRegistry>(FileInstrumentRegistryParameters {
            data_dir: settings.data_dir.clone(),
            entries: Arc::new(Mutex::new(None)),
        })
        .with_component_parameters::<IntervalRateLimiter>(IntervalRateLimiterParameters {
            min_interval: settings.request_delay,
            last_pass: Arc::new(Mutex::new(None)),
        })
        .build()
}
