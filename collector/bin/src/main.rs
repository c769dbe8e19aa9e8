mod di;

use crate::di::{create_app_module, AppSettings};
use collector_application::{CollectError, CollectOptions, CollectorService, RecordStore};
use shaku::HasComponent;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting daily price collection service");

    let module = create_app_module(&AppSettings::default());
    let service: Arc<dyn CollectorService> = module.resolve();
    let store: Arc<dyn RecordStore> = module.resolve();

    let options = CollectOptions {
        validate_data: true,
        ..CollectOptions::default()
    };

    tokio::select! {
        result = service.collect_all_registered(&options) => {
            match result {
                Ok(status) => {
                    println!("Collection finished:");
                    println!("  Succeeded: {}", status.succeeded.len());
                    println!("  Failed: {}", status.failed.len());
                    println!("  Skipped: {}", status.skipped.len());
                    println!("  Records collected: {}", status.total_collected);
                    println!("  Elapsed: {:.1}s", status.elapsed.as_secs_f64());
                }
                Err(CollectError::NoActiveInstruments) => {
                    eprintln!("No instruments registered yet.");
                    eprintln!("Run `collect <CODES>...` once to register and collect them.");
                }
                Err(e) => eprintln!("Collection error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping gracefully...");
        }
    }

    store.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
