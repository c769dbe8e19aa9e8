use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Weekday};
use collector_application::{
    QualityValidator, RecordStore, Severity, ValidationError, ValidationFinding,
};
use collector_domain::DailyPriceRecord;
use shaku::Component;
use tracing::debug;

/// Inspects already-persisted data for an instrument. Weekend-aware
/// only; public holidays show up as missing-day warnings.
#[derive(Component)]
#[shaku(interface = QualityValidator)]
pub struct StoreQualityValidator {
    #[shaku(inject)]
    store: Arc<dyn RecordStore>,

    #[shaku(default = 30.0)]
    max_daily_move_pct: f64,

    #[shaku(default = 7)]
    stale_after_days: i64,
}

impl StoreQualityValidator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            max_daily_move_pct: 30.0,
            stale_after_days: 7,
        }
    }

    fn check_price_consistency(records: &[DailyPriceRecord]) -> ValidationFinding {
        let broken = records
            .iter()
            .filter(|r| {
                r.high_price() < r.low_price()
                    || r.close_price() > r.high_price()
                    || r.close_price() < r.low_price()
                    || r.open_price() > r.high_price()
                    || r.open_price() < r.low_price()
            })
            .count();

        if broken > 0 {
            ValidationFinding::new(
                "price_consistency",
                Severity::Error,
                format!("{broken} rows with open/high/low/close out of order"),
            )
        } else {
            ValidationFinding::new("price_consistency", Severity::Pass, "prices consistent")
        }
    }

    fn check_volume(records: &[DailyPriceRecord]) -> ValidationFinding {
        let zero = records.iter().filter(|r| r.volume() == 0).count();

        if zero > 0 {
            ValidationFinding::new(
                "volume",
                Severity::Warning,
                format!("{zero} rows with zero volume"),
            )
        } else {
            ValidationFinding::new("volume", Severity::Pass, "volume present on every row")
        }
    }

    fn check_daily_moves(&self, records: &[DailyPriceRecord]) -> ValidationFinding {
        let mut outliers = 0;
        for pair in records.windows(2) {
            let prior = pair[0].close_price();
            if prior == 0 {
                continue;
            }
            let move_pct =
                ((pair[1].close_price() - prior) as f64 / prior as f64 * 100.0).abs();
            if move_pct > self.max_daily_move_pct {
                outliers += 1;
            }
        }

        if outliers > 0 {
            ValidationFinding::new(
                "daily_move",
                Severity::Warning,
                format!(
                    "{outliers} close-to-close moves above {:.0}%",
                    self.max_daily_move_pct
                ),
            )
        } else {
            ValidationFinding::new("daily_move", Severity::Pass, "no outsized daily moves")
        }
    }

    fn check_missing_weekdays(records: &[DailyPriceRecord]) -> ValidationFinding {
        let first = records[0].date();
        let last = records[records.len() - 1].date();

        let mut missing = 0;
        let mut current = Some(first);
        while let Some(date) = current {
            if date > last {
                break;
            }
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
                && !records.iter().any(|r| r.date() == date)
            {
                missing += 1;
            }
            current = date.succ();
        }

        if missing > 0 {
            ValidationFinding::new(
                "missing_days",
                Severity::Warning,
                format!("{missing} weekdays without a record between {first} and {last}"),
            )
        } else {
            ValidationFinding::new("missing_days", Severity::Pass, "no weekday gaps")
        }
    }

    fn check_staleness(&self, records: &[DailyPriceRecord]) -> ValidationFinding {
        let latest = records[records.len() - 1].date();
        let age = (Local::now().date_naive() - latest.date()).num_days();

        if age > self.stale_after_days {
            ValidationFinding::new(
                "staleness",
                Severity::Warning,
                format!("latest record {latest} is {age} days old"),
            )
        } else {
            ValidationFinding::new("staleness", Severity::Pass, "data is recent")
        }
    }
}

#[async_trait]
impl QualityValidator for StoreQualityValidator {
    async fn validate(
        &self,
        instrument_id: &str,
    ) -> Result<Vec<ValidationFinding>, ValidationError> {
        let records = self.store.load(instrument_id).await?;

        if records.is_empty() {
            return Ok(vec![ValidationFinding::new(
                "records_present",
                Severity::Error,
                "no records stored",
            )]);
        }

        debug!(instrument_id, rows = records.len(), "Validating stored data");

        Ok(vec![
            Self::check_price_consistency(&records),
            Self::check_volume(&records),
            self.check_daily_moves(&records),
            Self::check_missing_weekdays(&records),
            self.check_staleness(&records),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_application::StoreError;
    use collector_domain::TradeDate;

    struct FixedStore {
        records: Vec<DailyPriceRecord>,
    }

    #[async_trait]
    impl RecordStore for FixedStore {
        async fn latest_date(
            &self,
            _instrument_id: &str,
        ) -> Result<Option<TradeDate>, StoreError> {
            Ok(self.records.last().map(|r| r.date()))
        }

        async fn upsert(
            &self,
            _instrument_id: &str,
            _record: &DailyPriceRecord,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn load(&self, _instrument_id: &str) -> Result<Vec<DailyPriceRecord>, StoreError> {
            Ok(self.records.clone())
        }

        async fn flush(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn record(date: &str, open: i64, high: i64, low: i64, close: i64, volume: i64) -> DailyPriceRecord {
        DailyPriceRecord::new(
            "000001".to_string(),
            TradeDate::parse_compact(date).unwrap(),
            open,
            high,
            low,
            close,
            volume,
            volume * close,
            0,
            0.0,
        )
        .unwrap()
    }

    fn validator(records: Vec<DailyPriceRecord>) -> StoreQualityValidator {
        StoreQualityValidator::new(Arc::new(FixedStore { records }))
    }

    fn finding(findings: &[ValidationFinding], check: &str) -> ValidationFinding {
        findings
            .iter()
            .find(|f| f.check == check)
            .cloned()
            .unwrap_or_else(|| panic!("missing {check} finding"))
    }

    #[tokio::test]
    async fn test_empty_store_is_an_error() {
        let findings = validator(Vec::new()).validate("000001").await.unwrap();

        assert_eq!(findings.len(), 1);
        assert!(findings[0].severity.is_error());
    }

    #[tokio::test]
    async fn test_inverted_high_low_is_an_error() {
        let records = vec![
            record("20250630", 100, 90, 110, 100, 1_000),
            record("20250701", 100, 110, 95, 105, 1_000),
        ];
        let findings = validator(records).validate("000001").await.unwrap();

        assert_eq!(
            finding(&findings, "price_consistency").severity,
            Severity::Error
        );
    }

    #[tokio::test]
    async fn test_zero_volume_is_a_warning() {
        let records = vec![
            record("20250630", 100, 110, 95, 105, 0),
            record("20250701", 105, 112, 100, 110, 1_000),
        ];
        let findings = validator(records).validate("000001").await.unwrap();

        assert_eq!(finding(&findings, "volume").severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_outsized_move_is_a_warning() {
        let records = vec![
            record("20250630", 100, 110, 95, 100, 1_000),
            record("20250701", 100, 160, 95, 150, 1_000),
        ];
        let findings = validator(records).validate("000001").await.unwrap();

        assert_eq!(finding(&findings, "daily_move").severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_weekday_gap_is_a_warning() {
        // Tuesday the 1st and Thursday the 3rd, Wednesday missing.
        let records = vec![
            record("20250701", 100, 110, 95, 105, 1_000),
            record("20250703", 105, 112, 100, 110, 1_000),
        ];
        let findings = validator(records).validate("000001").await.unwrap();

        assert_eq!(finding(&findings, "missing_days").severity, Severity::Warning);
    }
}
