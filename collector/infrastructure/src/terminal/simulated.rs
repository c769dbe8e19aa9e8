use async_trait::async_trait;
use chrono::Weekday;
use collector_application::{ChartQuery, FetchPage, RawRow, TerminalError, TerminalSession};
use collector_domain::TradeDate;
use rand::Rng;
use shaku::Component;
use tracing::info;

/// Stand-in for the brokerage terminal: serves paginated daily charts of
/// synthetic prices, rendered the way the real terminal renders them
/// (thousands separators, signed close).
///
/// Pagination is stateless: the continuation token carries the next row
/// offset, so the core sees an opaque token and the `"0"` sentinel.
#[derive(Component)]
#[shaku(interface = TerminalSession)]
pub struct SimulatedTerminalSession {
    base_price: i64,
    rows_per_page: usize,
    total_days: usize,
    connected: bool,
}

impl SimulatedTerminalSession {
    pub fn new(base_price: i64, rows_per_page: usize, total_days: usize) -> Self {
        Self {
            base_price,
            rows_per_page,
            total_days,
            connected: true,
        }
    }

    /// Weekdays walking back from the as-of date, most recent first.
    fn trading_days(&self, as_of: TradeDate) -> Vec<TradeDate> {
        let mut days = Vec::with_capacity(self.total_days);
        let mut current = Some(as_of);

        while days.len() < self.total_days {
            let Some(date) = current else { break };
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(date);
            }
            current = date.pred();
        }

        days
    }

    fn generate_row(&self, date: TradeDate) -> RawRow {
        let mut rng = rand::rng();

        let wiggle: i64 = rng.random_range(-200..200);
        let close = (self.base_price + wiggle).max(1);
        let open = (close + rng.random_range(-100..100)).max(1);
        let high = close.max(open) + rng.random_range(0..80);
        let low = (close.min(open) - rng.random_range(0..80)).max(1);
        let volume: i64 = rng.random_range(100_000..5_000_000);
        let trading_value = volume * close;
        let diff: i64 = rng.random_range(-300..300);

        let mut row = RawRow::new();
        row.insert("date".to_string(), date.compact());
        row.insert("current_price".to_string(), signed(close, diff >= 0));
        row.insert("volume".to_string(), group_digits(volume));
        row.insert("trading_value".to_string(), group_digits(trading_value));
        row.insert("open_price".to_string(), group_digits(open));
        row.insert("high_price".to_string(), group_digits(high));
        row.insert("low_price".to_string(), group_digits(low));
        row
    }
}

#[async_trait]
impl TerminalSession for SimulatedTerminalSession {
    async fn request(
        &self,
        query_name: &str,
        query: &ChartQuery,
        continuation_token: &str,
    ) -> Result<FetchPage, TerminalError> {
        if !self.connected {
            return Err(TerminalError::NotConnected);
        }

        info!(
            query_name,
            instrument_id = %query.instrument_id,
            continuation_token,
            "Simulated terminal request"
        );

        let offset: usize = continuation_token.trim().parse().unwrap_or(0);
        let days = self.trading_days(query.as_of);

        let rows: Vec<RawRow> = days
            .iter()
            .skip(offset)
            .take(self.rows_per_page)
            .map(|date| self.generate_row(*date))
            .collect();

        let next_offset = offset + rows.len();
        let continuation_token = if next_offset < days.len() {
            next_offset.to_string()
        } else {
            "0".to_string()
        };

        Ok(FetchPage {
            rows,
            continuation_token,
            parsed: true,
        })
    }

    async fn instrument_name(&self, code: &str) -> Result<Option<String>, TerminalError> {
        if !self.connected {
            return Err(TerminalError::NotConnected);
        }
        Ok(Some(format!("Simulated Instrument {code}")))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn signed(value: i64, up: bool) -> String {
    if up {
        format!("+{}", group_digits(value))
    } else {
        format!("-{}", group_digits(value))
    }
}

fn group_digits(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_application::parser;

    fn query(as_of: &str) -> ChartQuery {
        ChartQuery {
            instrument_id: "000001".to_string(),
            as_of: TradeDate::parse_compact(as_of).unwrap(),
            adjusted: true,
        }
    }

    #[test]
    fn test_digit_grouping() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(90_551_200_000), "90,551,200,000");
    }

    #[tokio::test]
    async fn test_pages_walk_back_through_weekdays() {
        let session = SimulatedTerminalSession::new(73_000, 5, 12);
        let query = query("20250701");

        let first = session.request("daily_chart", &query, "0").await.unwrap();
        assert_eq!(first.rows.len(), 5);
        assert_eq!(first.rows[0]["date"], "20250701");
        assert_ne!(first.continuation_token, "0");

        let second = session
            .request("daily_chart", &query, &first.continuation_token)
            .await
            .unwrap();
        assert_eq!(second.rows.len(), 5);

        let third = session
            .request("daily_chart", &query, &second.continuation_token)
            .await
            .unwrap();
        assert_eq!(third.rows.len(), 2);
        assert_eq!(third.continuation_token, "0");
    }

    #[tokio::test]
    async fn test_rows_survive_the_real_parser() {
        let session = SimulatedTerminalSession::new(73_000, 8, 8);
        let query = query("20250701");

        let page = session.request("daily_chart", &query, "0").await.unwrap();
        let records = parser::parse_page("000001", &page);

        assert_eq!(records.len(), 8);
        for record in &records {
            assert!(record.close_price() > 0);
            assert!(record.high_price() >= record.low_price());
        }
    }

    #[tokio::test]
    async fn test_weekends_are_not_served() {
        let session = SimulatedTerminalSession::new(73_000, 10, 10);
        // 2025-07-06 is a Sunday; the first served day must be Friday the 4th.
        let page = session
            .request("daily_chart", &query("20250706"), "0")
            .await
            .unwrap();

        assert_eq!(page.rows[0]["date"], "20250704");
    }
}
