use std::fmt;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Calendar day in the terminal's fixed 8-digit form (YYYYMMDD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Strict parse of the compact 8-digit form. Anything that is not
    /// exactly eight ASCII digits forming a real calendar day is rejected.
    pub fn parse_compact(raw: &str) -> Result<Self, TradeDateError> {
        let trimmed = raw.trim();
        if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TradeDateError::Malformed(raw.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .map(Self)
            .map_err(|_| TradeDateError::Malformed(raw.to_string()))
    }

    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// Whole days from `earlier` to `self` (negative if `self` precedes it).
    pub fn days_since(&self, earlier: TradeDate) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    pub fn pred(&self) -> Option<TradeDate> {
        self.0.checked_sub_days(Days::new(1)).map(Self)
    }

    pub fn succ(&self) -> Option<TradeDate> {
        self.0.checked_add_days(Days::new(1)).map(Self)
    }
}

impl From<NaiveDate> for TradeDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

impl Serialize for TradeDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.compact())
    }
}

impl<'de> Deserialize<'de> for TradeDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CompactVisitor;

        impl Visitor<'_> for CompactVisitor {
            type Value = TradeDate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a YYYYMMDD date string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TradeDate, E> {
                TradeDate::parse_compact(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(CompactVisitor)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TradeDateError {
    #[error("Malformed trade date: {0:?}")]
    Malformed(String),
}
