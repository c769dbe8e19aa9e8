pub mod parquet;

pub use parquet::ParquetRecordStore;
