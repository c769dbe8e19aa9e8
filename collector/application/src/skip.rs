use chrono::{Datelike, Local, NaiveDate, Weekday};
use collector_domain::TradeDate;

/// Decides whether an instrument's stored data is already current for
/// the relevant calendar day, so collection can be skipped without any
/// terminal request.
///
/// The weekday gap thresholds approximate "last completed trading day"
/// and do not account for public holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipPolicy;

impl SkipPolicy {
    pub fn should_skip(&self, latest: Option<TradeDate>) -> bool {
        self.should_skip_on(latest, Local::now().date_naive())
    }

    /// Monday tolerates a gap back to the previous Friday; any other
    /// weekday tolerates only yesterday.
    pub fn should_skip_on(&self, latest: Option<TradeDate>, today: NaiveDate) -> bool {
        let Some(latest) = latest else {
            return false;
        };

        if latest.date() >= today {
            return true;
        }

        let gap = (today - latest.date()).num_days();
        match today.weekday() {
            Weekday::Mon => gap <= 3,
            _ => gap <= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> TradeDate {
        TradeDate::parse_compact(raw).unwrap()
    }

    #[test]
    fn test_no_stored_date_never_skips() {
        let policy = SkipPolicy;
        let monday = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        assert!(!policy.should_skip_on(None, monday));
    }

    #[test]
    fn test_stored_date_equal_to_today_skips() {
        let policy = SkipPolicy;
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert!(policy.should_skip_on(Some(day("20250701")), today));
    }

    #[test]
    fn test_friday_data_is_current_on_monday() {
        let policy = SkipPolicy;
        let monday = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert!(policy.should_skip_on(Some(day("20250704")), monday));
    }

    #[test]
    fn test_stale_data_is_recollected_on_tuesday() {
        let policy = SkipPolicy;
        let tuesday = NaiveDate::from_ymd_opt(2025, 7, 8).unwrap();
        assert_eq!(tuesday.weekday(), Weekday::Tue);
        assert!(!policy.should_skip_on(Some(day("20250703")), tuesday));
    }

    #[test]
    fn test_yesterday_is_current_midweek() {
        let policy = SkipPolicy;
        let wednesday = NaiveDate::from_ymd_opt(2025, 7, 9).unwrap();
        assert!(policy.should_skip_on(Some(day("20250708")), wednesday));
    }
}
