use collector_domain::{clean_signed_int, DailyPriceRecord, TradeDate};
use tracing::debug;

use crate::ports::{FetchPage, RawRow};

pub const FIELD_DATE: &str = "date";
pub const FIELD_CURRENT_PRICE: &str = "current_price";
pub const FIELD_VOLUME: &str = "volume";
pub const FIELD_TRADING_VALUE: &str = "trading_value";
pub const FIELD_OPEN_PRICE: &str = "open_price";
pub const FIELD_HIGH_PRICE: &str = "high_price";
pub const FIELD_LOW_PRICE: &str = "low_price";

struct CleanRow {
    date: TradeDate,
    close: i64,
    volume: i64,
    trading_value: i64,
    open: i64,
    high: i64,
    low: i64,
}

/// Converts one terminal page into normalized records, terminal order
/// preserved (most recent first). Rows failing any check are dropped
/// without aborting the rest of the page.
pub fn parse_page(instrument_id: &str, page: &FetchPage) -> Vec<DailyPriceRecord> {
    if !page.parsed {
        debug!(
            instrument_id,
            "Terminal reported an undecoded payload, treating page as empty"
        );
        return Vec::new();
    }

    let cleaned: Vec<CleanRow> = page
        .rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| clean_row(instrument_id, idx, row))
        .collect();

    // Rows are most-recent-first, so the next row holds the prior
    // trading day's close.
    let mut records = Vec::with_capacity(cleaned.len());
    for (idx, row) in cleaned.iter().enumerate() {
        let (diff, rate) = match cleaned.get(idx + 1).map(|prior| prior.close) {
            Some(prior) if prior != 0 => {
                let diff = row.close - prior;
                (diff, diff as f64 / prior as f64 * 100.0)
            }
            _ => (0, 0.0),
        };

        match DailyPriceRecord::new(
            instrument_id.to_string(),
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            row.trading_value,
            diff,
            rate,
        ) {
            Ok(record) => records.push(record),
            Err(e) => debug!(instrument_id, row = idx, error = %e, "Dropping invalid row"),
        }
    }

    records
}

fn clean_row(instrument_id: &str, idx: usize, row: &RawRow) -> Option<CleanRow> {
    // A row without a date or a close is a placeholder, dropped silently.
    let date_raw = field(row, FIELD_DATE)?;
    let close_raw = field(row, FIELD_CURRENT_PRICE)?;

    let date = match TradeDate::parse_compact(date_raw) {
        Ok(date) => date,
        Err(e) => {
            debug!(instrument_id, row = idx, error = %e, "Dropping row with bad date");
            return None;
        }
    };

    let close = magnitude(instrument_id, idx, close_raw)?;
    if close == 0 {
        // Non-trading placeholder row.
        return None;
    }

    Some(CleanRow {
        date,
        close,
        volume: magnitude(instrument_id, idx, field(row, FIELD_VOLUME).unwrap_or(""))?,
        trading_value: magnitude(instrument_id, idx, field(row, FIELD_TRADING_VALUE).unwrap_or(""))?,
        open: magnitude(instrument_id, idx, field(row, FIELD_OPEN_PRICE).unwrap_or(""))?,
        high: magnitude(instrument_id, idx, field(row, FIELD_HIGH_PRICE).unwrap_or(""))?,
        low: magnitude(instrument_id, idx, field(row, FIELD_LOW_PRICE).unwrap_or(""))?,
    })
}

/// The sign on price and quantity fields is a direction marker; the
/// stored value is the magnitude.
fn magnitude(instrument_id: &str, idx: usize, raw: &str) -> Option<i64> {
    match clean_signed_int(raw) {
        Ok(value) => Some(value.abs()),
        Err(e) => {
            debug!(instrument_id, row = idx, error = %e, "Dropping row with bad numeric field");
            None
        }
    }
}

fn field<'a>(row: &'a RawRow, key: &str) -> Option<&'a str> {
    row.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row(
        date: &str,
        close: &str,
        volume: &str,
        value: &str,
        open: &str,
        high: &str,
        low: &str,
    ) -> RawRow {
        let mut row = RawRow::new();
        row.insert(FIELD_DATE.to_string(), date.to_string());
        row.insert(FIELD_CURRENT_PRICE.to_string(), close.to_string());
        row.insert(FIELD_VOLUME.to_string(), volume.to_string());
        row.insert(FIELD_TRADING_VALUE.to_string(), value.to_string());
        row.insert(FIELD_OPEN_PRICE.to_string(), open.to_string());
        row.insert(FIELD_HIGH_PRICE.to_string(), high.to_string());
        row.insert(FIELD_LOW_PRICE.to_string(), low.to_string());
        row
    }

    fn page(rows: Vec<RawRow>) -> FetchPage {
        FetchPage {
            rows,
            continuation_token: "0".to_string(),
            parsed: true,
        }
    }

    #[test]
    fn test_separators_and_signs_are_cleaned() {
        let page = page(vec![raw_row(
            "20250701",
            "+73,400",
            "1,234,567",
            "90,551,200,000",
            "-73,000",
            "74,200",
            "72,800",
        )]);

        let records = parse_page("000001", &page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].close_price(), 73_400);
        assert_eq!(records[0].volume(), 1_234_567);
        assert_eq!(records[0].open_price(), 73_000);
    }

    #[test]
    fn test_zero_close_row_is_dropped() {
        let page = page(vec![
            raw_row("20250701", "0", "10", "100", "1", "1", "1"),
            raw_row("20250630", "100", "10", "1,000", "99", "101", "98"),
        ]);

        let records = parse_page("000001", &page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date().compact(), "20250630");
    }

    #[test]
    fn test_row_missing_date_or_close_is_dropped() {
        let mut no_date = raw_row("20250701", "100", "10", "1,000", "99", "101", "98");
        no_date.remove(FIELD_DATE);
        let mut blank_close = raw_row("20250630", "  ", "10", "1,000", "99", "101", "98");
        blank_close.insert(FIELD_CURRENT_PRICE.to_string(), "  ".to_string());

        let records = parse_page("000001", &page(vec![no_date, blank_close]));
        assert!(records.is_empty());
    }

    #[test]
    fn test_bad_row_does_not_abort_the_page() {
        let page = page(vec![
            raw_row("20250701", "12a4", "10", "100", "1", "1", "1"),
            raw_row("2025-06", "100", "10", "100", "1", "1", "1"),
            raw_row("20250627", "100", "10", "1,000", "99", "101", "98"),
        ]);

        let records = parse_page("000001", &page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date().compact(), "20250627");
    }

    #[test]
    fn test_undecoded_payload_yields_nothing() {
        let page = FetchPage {
            rows: vec![raw_row("20250701", "100", "10", "1,000", "99", "101", "98")],
            continuation_token: "0".to_string(),
            parsed: false,
        };

        assert!(parse_page("000001", &page).is_empty());
    }

    #[test]
    fn test_prior_day_fields_come_from_adjacent_rows() {
        let page = page(vec![
            raw_row("20250701", "110", "10", "1,100", "100", "111", "99"),
            raw_row("20250630", "100", "10", "1,000", "99", "101", "98"),
        ]);

        let records = parse_page("000001", &page);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prior_day_diff(), 10);
        assert!((records[0].change_rate() - 10.0).abs() < f64::EPSILON);
        // Oldest row in the page has no prior-day reference.
        assert_eq!(records[1].prior_day_diff(), 0);
        assert_eq!(records[1].change_rate(), 0.0);
    }
}
