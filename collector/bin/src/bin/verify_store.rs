use std::path::PathBuf;

use clap::Parser;
use collector_application::RecordStore;
use collector_infrastructure::ParquetRecordStore;

/// Inspects one instrument's stored daily prices.
#[derive(Parser)]
#[command(name = "verify-store")]
#[command(about = "Inspect stored daily price data", long_about = None)]
struct Cli {
    /// Instrument code
    code: String,

    /// Data directory for the per-instrument store
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let store = ParquetRecordStore::new(cli.data_dir);
    let records = store.load(&cli.code).await?;

    println!("Instrument {}: {} records", cli.code, records.len());

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!("  Range: {} .. {}", first.date(), last.date());
    }

    for record in records.iter().rev().take(5) {
        println!(
            "  {}  O {:>8}  H {:>8}  L {:>8}  C {:>8}  V {:>12}",
            record.date(),
            record.open_price(),
            record.high_price(),
            record.low_price(),
            record.close_price(),
            record.volume(),
        );
    }

    Ok(())
}
