use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use async_trait::async_trait;
use collector_application::{RecordStore, StoreError};
use collector_domain::{DailyPriceRecord, TradeDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use shaku::Component;
use tokio::sync::Mutex;
use tracing::{debug, info};

type InstrumentTable = BTreeMap<TradeDate, DailyPriceRecord>;

/// Per-instrument daily price store backed by one parquet file per
/// instrument. Records are kept in an in-memory table hydrated from disk
/// on first touch; `flush` rewrites the files of instruments that
/// changed.
#[derive(Component)]
#[shaku(interface = RecordStore)]
pub struct ParquetRecordStore {
    data_dir: PathBuf,
    tables: Arc<Mutex<HashMap<String, InstrumentTable>>>,
    dirty: Arc<Mutex<HashSet<String>>>,
}

impl ParquetRecordStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            tables: Arc::new(Mutex::new(HashMap::new())),
            dirty: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("instrument_id", DataType::Utf8, false),
            Field::new("date", DataType::Utf8, false),
            Field::new("open_price", DataType::Int64, false),
            Field::new("high_price", DataType::Int64, false),
            Field::new("low_price", DataType::Int64, false),
            Field::new("close_price", DataType::Int64, false),
            Field::new("volume", DataType::Int64, false),
            Field::new("trading_value", DataType::Int64, false),
            Field::new("prior_day_diff", DataType::Int64, false),
            Field::new("change_rate", DataType::Float64, false),
        ]))
    }

    fn file_path(&self, instrument_id: &str) -> PathBuf {
        self.data_dir.join(format!("{instrument_id}.parquet"))
    }

    async fn ensure_loaded(&self, instrument_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.contains_key(instrument_id) {
            return Ok(());
        }

        let table = self.read_table(instrument_id)?;
        debug!(instrument_id, rows = table.len(), "Hydrated instrument table");
        tables.insert(instrument_id.to_string(), table);
        Ok(())
    }

    fn read_table(&self, instrument_id: &str) -> Result<InstrumentTable, StoreError> {
        let path = self.file_path(instrument_id);
        let mut table = InstrumentTable::new();

        if !path.exists() {
            return Ok(table);
        }

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| StoreError::EncodingError(e.to_string()))?
            .build()
            .map_err(|e| StoreError::EncodingError(e.to_string()))?;

        for batch in reader {
            let batch = batch.map_err(|e| StoreError::EncodingError(e.to_string()))?;
            for record in Self::batch_to_records(instrument_id, &batch)? {
                table.insert(record.date(), record);
            }
        }

        Ok(table)
    }

    fn batch_to_records(
        instrument_id: &str,
        batch: &RecordBatch,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        fn string_column<'a>(
            batch: &'a RecordBatch,
            idx: usize,
            instrument_id: &str,
        ) -> Result<&'a StringArray, StoreError> {
            batch
                .column(idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| corrupt(instrument_id, "expected a string column"))
        }

        fn int_column<'a>(
            batch: &'a RecordBatch,
            idx: usize,
            instrument_id: &str,
        ) -> Result<&'a Int64Array, StoreError> {
            batch
                .column(idx)
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| corrupt(instrument_id, "expected an int64 column"))
        }

        fn corrupt(instrument_id: &str, reason: &str) -> StoreError {
            StoreError::CorruptRecord {
                instrument_id: instrument_id.to_string(),
                reason: reason.to_string(),
            }
        }

        let ids = string_column(batch, 0, instrument_id)?;
        let dates = string_column(batch, 1, instrument_id)?;
        let opens = int_column(batch, 2, instrument_id)?;
        let highs = int_column(batch, 3, instrument_id)?;
        let lows = int_column(batch, 4, instrument_id)?;
        let closes = int_column(batch, 5, instrument_id)?;
        let volumes = int_column(batch, 6, instrument_id)?;
        let values = int_column(batch, 7, instrument_id)?;
        let diffs = int_column(batch, 8, instrument_id)?;
        let rates = batch
            .column(9)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| corrupt(instrument_id, "expected a float64 column"))?;

        let mut records = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let date = TradeDate::parse_compact(dates.value(row))
                .map_err(|e| corrupt(instrument_id, &e.to_string()))?;

            let record = DailyPriceRecord::new(
                ids.value(row).to_string(),
                date,
                opens.value(row),
                highs.value(row),
                lows.value(row),
                closes.value(row),
                volumes.value(row),
                values.value(row),
                diffs.value(row),
                rates.value(row),
            )
            .map_err(|e| corrupt(instrument_id, &e.to_string()))?;

            records.push(record);
        }

        Ok(records)
    }

    fn records_to_batch(records: &[&DailyPriceRecord]) -> Result<RecordBatch, StoreError> {
        let ids: Vec<&str> = records.iter().map(|r| r.instrument_id()).collect();
        let dates: Vec<String> = records.iter().map(|r| r.date().compact()).collect();
        let opens: Vec<i64> = records.iter().map(|r| r.open_price()).collect();
        let highs: Vec<i64> = records.iter().map(|r| r.high_price()).collect();
        let lows: Vec<i64> = records.iter().map(|r| r.low_price()).collect();
        let closes: Vec<i64> = records.iter().map(|r| r.close_price()).collect();
        let volumes: Vec<i64> = records.iter().map(|r| r.volume()).collect();
        let values: Vec<i64> = records.iter().map(|r| r.trading_value()).collect();
        let diffs: Vec<i64> = records.iter().map(|r| r.prior_day_diff()).collect();
        let rates: Vec<f64> = records.iter().map(|r| r.change_rate()).collect();

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(dates)),
            Arc::new(Int64Array::from(opens)),
            Arc::new(Int64Array::from(highs)),
            Arc::new(Int64Array::from(lows)),
            Arc::new(Int64Array::from(closes)),
            Arc::new(Int64Array::from(volumes)),
            Arc::new(Int64Array::from(values)),
            Arc::new(Int64Array::from(diffs)),
            Arc::new(Float64Array::from(rates)),
        ];

        RecordBatch::try_new(Self::schema(), arrays)
            .map_err(|e| StoreError::EncodingError(e.to_string()))
    }

    fn write_table(&self, instrument_id: &str, table: &InstrumentTable) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.data_dir)?;

        let path = self.file_path(instrument_id);
        let file = File::create(&path)?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, Self::schema(), Some(props))
            .map_err(|e| StoreError::EncodingError(e.to_string()))?;

        let records: Vec<&DailyPriceRecord> = table.values().collect();
        if !records.is_empty() {
            let batch = Self::records_to_batch(&records)?;
            writer
                .write(&batch)
                .map_err(|e| StoreError::EncodingError(e.to_string()))?;
        }

        writer
            .close()
            .map_err(|e| StoreError::EncodingError(e.to_string()))?;

        info!(instrument_id, rows = table.len(), path = %path.display(), "Wrote instrument file");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for ParquetRecordStore {
    async fn latest_date(&self, instrument_id: &str) -> Result<Option<TradeDate>, StoreError> {
        self.ensure_loaded(instrument_id).await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .get(instrument_id)
            .and_then(|table| table.keys().next_back().copied()))
    }

    async fn upsert(
        &self,
        instrument_id: &str,
        record: &DailyPriceRecord,
    ) -> Result<(), StoreError> {
        self.ensure_loaded(instrument_id).await?;

        let mut tables = self.tables.lock().await;
        tables
            .entry(instrument_id.to_string())
            .or_default()
            .insert(record.date(), record.clone());
        drop(tables);

        self.dirty.lock().await.insert(instrument_id.to_string());
        Ok(())
    }

    async fn load(&self, instrument_id: &str) -> Result<Vec<DailyPriceRecord>, StoreError> {
        self.ensure_loaded(instrument_id).await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .get(instrument_id)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut dirty = self.dirty.lock().await;
        if dirty.is_empty() {
            return Ok(());
        }

        let tables = self.tables.lock().await;
        for instrument_id in dirty.iter() {
            if let Some(table) = tables.get(instrument_id) {
                self.write_table(instrument_id, table)?;
            }
        }
        drop(tables);

        dirty.clear();
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        self.flush().await?;
        info!("Record store shut down");
        Ok(())
    }
}
