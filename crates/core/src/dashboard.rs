use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{Quote, QuoteStatus};

pub const MONTH_WINDOW: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTally {
    pub count: u64,
    pub value: Decimal,
}

impl StatusTally {
    fn record(&mut self, value: Decimal) {
        self.count += 1;
        self.value += value;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub open: StatusTally,
    pub accepted: StatusTally,
    pub declined: StatusTally,
    pub expired: StatusTally,
}

impl StatusBreakdown {
    pub fn get(&self, status: QuoteStatus) -> &StatusTally {
        match status {
            QuoteStatus::Open => &self.open,
            QuoteStatus::Accepted => &self.accepted,
            QuoteStatus::Declined => &self.declined,
            QuoteStatus::Expired => &self.expired,
        }
    }

    pub fn get_mut(&mut self, status: QuoteStatus) -> &mut StatusTally {
        match status {
            QuoteStatus::Open => &mut self.open,
            QuoteStatus::Accepted => &mut self.accepted,
            QuoteStatus::Declined => &mut self.declined,
            QuoteStatus::Expired => &mut self.expired,
        }
    }
}

/// Collection-wide totals; also the shape of the store-side aggregate query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteStatistics {
    pub total: u64,
    pub by_status: StatusBreakdown,
    pub total_value: Decimal,
    pub accepted_value: Decimal,
}

impl QuoteStatistics {
    pub fn record(&mut self, status: QuoteStatus, value: Decimal) {
        self.total += 1;
        self.total_value += value;
        self.by_status.get_mut(status).record(value);
        if status == QuoteStatus::Accepted {
            self.accepted_value += value;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthStats {
    pub label: String,
    pub year: i32,
    /// Calendar month, 1-based.
    pub month: u32,
    pub count: u64,
    pub accepted_count: u64,
    pub value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub statistics: QuoteStatistics,
    pub client_count: u64,
    pub months: Vec<MonthStats>,
}

pub fn tally(quotes: &[Quote]) -> QuoteStatistics {
    quotes.iter().fold(QuoteStatistics::default(), |mut stats, quote| {
        stats.record(quote.status, quote.totals.total);
        stats
    })
}

/// The six calendar months ending with the month of `now`, oldest first.
pub fn month_window(now: DateTime<Utc>) -> Vec<MonthStats> {
    let (mut year, mut month) = (now.year(), now.month());
    let mut months = Vec::with_capacity(MONTH_WINDOW);

    for _ in 0..MONTH_WINDOW {
        let label = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|date| date.format("%b %Y").to_string())
            .unwrap_or_default();
        months.push(MonthStats {
            label,
            year,
            month,
            count: 0,
            accepted_count: 0,
            value: Decimal::ZERO,
        });

        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }

    months.reverse();
    months
}

pub fn aggregate(quotes: &[Quote], client_count: u64, now: DateTime<Utc>) -> DashboardStats {
    let mut statistics = QuoteStatistics::default();
    let mut months = month_window(now);

    for quote in quotes {
        let value = quote.totals.total;
        statistics.record(quote.status, value);

        let issued = quote.issue_date;
        if let Some(bucket) = months
            .iter_mut()
            .find(|bucket| bucket.year == issued.year() && bucket.month == issued.month())
        {
            bucket.count += 1;
            bucket.value += value;
            if quote.status == QuoteStatus::Accepted {
                bucket.accepted_count += 1;
            }
        }
    }

    DashboardStats { statistics, client_count, months }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{aggregate, month_window, tally};
    use crate::domain::client::{ClientId, ClientSnapshot};
    use crate::domain::quote::{
        ContactOverrides, PaymentCondition, Quote, QuoteId, QuoteStatus, QuoteTotals,
    };

    fn quote(status: QuoteStatus, value: i64, issued: chrono::DateTime<Utc>) -> Quote {
        Quote {
            id: QuoteId::generate(),
            sequence_number: 1,
            version: 0,
            status,
            client_id: ClientId("C-1".to_string()),
            client: ClientSnapshot::default(),
            issue_date: issued,
            expiry_date: issued + Duration::days(15),
            accepted_date: None,
            service_id: "svc".to_string(),
            service_description: String::new(),
            items: vec![],
            limitation_ids: vec![],
            execution_deadline_days: None,
            inspection_deadline_days: None,
            payment_condition: PaymentCondition::Cash,
            installment_text: None,
            installment_plan: None,
            discount: None,
            show_detailed_values: false,
            totals: QuoteTotals {
                labor: Decimal::ZERO,
                material: Decimal::ZERO,
                total: Decimal::from(value),
            },
            notes: None,
            contacts: ContactOverrides::default(),
            created_at: issued,
            updated_at: issued,
        }
    }

    #[test]
    fn four_statuses_in_current_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).single().expect("date");
        let quotes = vec![
            quote(QuoteStatus::Open, 1000, now),
            quote(QuoteStatus::Accepted, 2000, now),
            quote(QuoteStatus::Declined, 500, now),
            quote(QuoteStatus::Expired, 750, now),
        ];

        let stats = aggregate(&quotes, 3, now);

        assert_eq!(stats.statistics.total, 4);
        assert_eq!(stats.statistics.total_value, Decimal::from(4250));
        assert_eq!(stats.statistics.accepted_value, Decimal::from(2000));
        assert_eq!(stats.statistics.by_status.declined.count, 1);
        assert_eq!(stats.statistics.by_status.expired.value, Decimal::from(750));
        assert_eq!(stats.client_count, 3);
        assert_eq!(stats.months.len(), 6);

        let last = stats.months.last().expect("current month");
        assert_eq!((last.year, last.month), (2026, 10));
        assert_eq!(last.count, 4);
        assert_eq!(last.accepted_count, 1);
        assert_eq!(last.value, Decimal::from(4250));
    }

    #[test]
    fn window_crosses_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).single().expect("date");
        let months = month_window(now);

        let keys: Vec<(i32, u32)> = months.iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(keys, vec![(2025, 9), (2025, 10), (2025, 11), (2025, 12), (2026, 1), (2026, 2)]);
        assert_eq!(months[0].label, "Sep 2025");
    }

    #[test]
    fn quotes_outside_window_count_toward_totals_only() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).single().expect("date");
        let old = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).single().expect("date");
        let may = Utc.with_ymd_and_hms(2026, 5, 31, 23, 0, 0).single().expect("date");
        let quotes = vec![
            quote(QuoteStatus::Accepted, 300, old),
            quote(QuoteStatus::Accepted, 200, may),
        ];

        let stats = aggregate(&quotes, 0, now);

        assert_eq!(stats.statistics.total, 2);
        assert_eq!(stats.statistics.accepted_value, Decimal::from(500));
        let bucketed: u64 = stats.months.iter().map(|m| m.count).sum();
        assert_eq!(bucketed, 1);
        assert_eq!(stats.months[0].accepted_count, 1);
    }

    #[test]
    fn tally_matches_aggregate_totals() {
        let now = Utc::now();
        let quotes =
            vec![quote(QuoteStatus::Open, 10, now), quote(QuoteStatus::Open, 15, now)];
        let stats = tally(&quotes);

        assert_eq!(stats.by_status.open.count, 2);
        assert_eq!(stats.by_status.open.value, Decimal::from(25));
        assert_eq!(stats, aggregate(&quotes, 0, now).statistics);
    }
}
