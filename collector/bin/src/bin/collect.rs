use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use collector_application::{CollectOptions, CollectorService, ProgressObserver, RecordStore};
use collector_domain::TradeDate;
use shaku::HasComponent;

mod di {
    include!("../di.rs");
}

#[derive(Parser)]
#[command(name = "collect")]
#[command(about = "Collect daily price history for instruments", long_about = None)]
struct Cli {
    /// Instrument codes to collect
    #[arg(required = true)]
    codes: Vec<String>,

    /// Oldest day to collect (YYYYMMDD)
    #[arg(short, long)]
    start_date: Option<String>,

    /// As-of day to collect back from (YYYYMMDD, defaults to today)
    #[arg(short, long)]
    end_date: Option<String>,

    /// Skip instruments whose stored data is already current
    #[arg(long)]
    no_update: bool,

    /// Run quality validation after each instrument
    #[arg(long)]
    validate: bool,

    /// Milliseconds between terminal requests
    #[arg(long, default_value_t = 200)]
    delay_ms: u64,

    /// Data directory for the per-instrument store
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
}

struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(
        &self,
        current: usize,
        total: usize,
        instrument_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[{current}/{total}] {instrument_id}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let start_date = cli
        .start_date
        .as_deref()
        .map(TradeDate::parse_compact)
        .transpose()
        .context("invalid --start-date")?;
    let end_date = cli
        .end_date
        .as_deref()
        .map(TradeDate::parse_compact)
        .transpose()
        .context("invalid --end-date")?;

    let settings = di::AppSettings {
        data_dir: cli.data_dir,
        request_delay: Duration::from_millis(cli.delay_ms),
    };
    let module = di::create_app_module(&settings);
    let service: Arc<dyn CollectorService> = module.resolve();
    let store: Arc<dyn RecordStore> = module.resolve();

    let options = CollectOptions {
        start_date,
        end_date,
        update_existing: !cli.no_update,
        validate_data: cli.validate,
        progress: Arc::new(ConsoleProgress),
    };

    println!("Collecting {} instruments", cli.codes.len());

    let status = service.collect_batch(&cli.codes, &options).await?;

    println!("\nCollection finished:");
    println!("  Succeeded: {}", status.succeeded.len());
    println!("  Failed: {}", status.failed.len());
    println!("  Skipped: {}", status.skipped.len());
    println!("  Newly registered: {}", status.registered);
    println!("  Records collected: {}", status.total_collected);
    println!("  Elapsed: {:.1}s", status.elapsed.as_secs_f64());

    if !status.failed.is_empty() {
        println!("\n  Failed instruments:");
        for code in &status.failed {
            println!("    {code}");
        }
    }

    for (code, findings) in &status.validation_results {
        let errors = findings.iter().filter(|f| f.severity.is_error()).count();
        if errors > 0 {
            println!("\n  {code}: {errors} validation errors");
            for finding in findings.iter().filter(|f| f.severity.is_error()) {
                println!("    {}: {}", finding.check, finding.message);
            }
        }
    }

    store.shutdown().await?;

    Ok(())
}
