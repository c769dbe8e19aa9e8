use serde::{Deserialize, Serialize};

use crate::trade_date::TradeDate;

/// One trading day for one instrument. Values are immutable after
/// construction; prices are integer currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPriceRecord {
    instrument_id: String,
    date: TradeDate,
    open_price: i64,
    high_price: i64,
    low_price: i64,
    close_price: i64,
    volume: i64,
    trading_value: i64,
    prior_day_diff: i64,
    change_rate: f64,
}

impl DailyPriceRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_id: String,
        date: TradeDate,
        open_price: i64,
        high_price: i64,
        low_price: i64,
        close_price: i64,
        volume: i64,
        trading_value: i64,
        prior_day_diff: i64,
        change_rate: f64,
    ) -> Result<Self, RecordValidationError> {
        if instrument_id.is_empty() {
            return Err(RecordValidationError::EmptyInstrumentId);
        }

        // A zero close marks a malformed or half-day row upstream.
        if close_price <= 0 {
            return Err(RecordValidationError::InvalidClose(close_price));
        }

        if volume < 0 {
            return Err(RecordValidationError::NegativeQuantity("volume"));
        }

        if trading_value < 0 {
            return Err(RecordValidationError::NegativeQuantity("trading_value"));
        }

        Ok(Self {
            instrument_id,
            date,
            open_price,
            high_price,
            low_price,
            close_price,
            volume,
            trading_value,
            prior_day_diff,
            change_rate,
        })
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn date(&self) -> TradeDate {
        self.date
    }

    pub fn open_price(&self) -> i64 {
        self.open_price
    }

    pub fn high_price(&self) -> i64 {
        self.high_price
    }

    pub fn low_price(&self) -> i64 {
        self.low_price
    }

    pub fn close_price(&self) -> i64 {
        self.close_price
    }

    pub fn volume(&self) -> i64 {
        self.volume
    }

    pub fn trading_value(&self) -> i64 {
        self.trading_value
    }

    pub fn prior_day_diff(&self) -> i64 {
        self.prior_day_diff
    }

    pub fn change_rate(&self) -> f64 {
        self.change_rate
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordValidationError {
    #[error("Instrument id cannot be empty")]
    EmptyInstrumentId,
    #[error("Close price must be positive, got {0}")]
    InvalidClose(i64),
    #[error("{0} cannot be negative")]
    NegativeQuantity(&'static str),
}
