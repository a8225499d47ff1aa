//! Calendar windows shared by every dashboard: the current reporting period and
//! monthly buckets for trend series.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};

/// Date boundaries derived from a single "now" so that one dashboard build
/// always agrees with itself about what today is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub start_of_month: NaiveDate,
    pub start_of_year: NaiveDate,
    pub start_of_last_year: NaiveDate,
}

impl ReportingPeriod {
    pub fn from_now(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start_of_month = first_of_month(today);
        let start_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(start_of_month);
        let start_of_last_year = start_of_year
            .checked_sub_months(Months::new(12))
            .unwrap_or(NaiveDate::MIN);
        Self {
            now,
            today,
            start_of_month,
            start_of_year,
            start_of_last_year,
        }
    }

    pub fn is_today(&self, date: NaiveDate) -> bool {
        date == self.today
    }

    pub fn is_year_to_date(&self, date: NaiveDate) -> bool {
        date >= self.start_of_year
    }

    pub fn is_last_year(&self, date: NaiveDate) -> bool {
        date >= self.start_of_last_year && date < self.start_of_year
    }

    pub fn is_this_month(&self, date: NaiveDate) -> bool {
        date >= self.start_of_month
    }

    /// Days elapsed this year, counting today.
    pub fn days_into_year(&self) -> i64 {
        (self.today - self.start_of_year).num_days() + 1
    }

    /// True for dates strictly before yesterday.
    pub fn is_overdue(&self, created: NaiveDate) -> bool {
        self.today
            .checked_sub_days(Days::new(1))
            .map(|yesterday| created < yesterday)
            .unwrap_or(false)
    }

    /// Signed whole days from today until `date`.
    pub fn days_until(&self, date: NaiveDate) -> i64 {
        (date - self.today).num_days()
    }
}

/// One calendar month, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl MonthBucket {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }
}

pub const TREND_LABEL: &str = "%b %Y";

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Exactly `months` buckets ending with the month containing `today`, oldest first,
/// labelled like "Mar 2024".
pub fn month_buckets(today: NaiveDate, months: usize) -> Vec<MonthBucket> {
    month_buckets_labelled(today, months, TREND_LABEL)
}

/// Same as [`month_buckets`] with a caller supplied `chrono` format for labels.
pub fn month_buckets_labelled(today: NaiveDate, months: usize, label_format: &str) -> Vec<MonthBucket> {
    let current = first_of_month(today);
    (0..months)
        .rev()
        .map(|back| {
            let start = u32::try_from(back)
                .ok()
                .and_then(|back| current.checked_sub_months(Months::new(back)))
                .unwrap_or(NaiveDate::MIN);
            let end = start
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDate::MAX);
            MonthBucket {
                start,
                end,
                label: start.format(label_format).to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reporting_period_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let period = ReportingPeriod::from_now(now);

        assert_eq!(period.today, date(2024, 3, 15));
        assert_eq!(period.start_of_month, date(2024, 3, 1));
        assert_eq!(period.start_of_year, date(2024, 1, 1));
        assert_eq!(period.start_of_last_year, date(2023, 1, 1));
        assert_eq!(period.days_into_year(), 75);
        assert!(period.is_last_year(date(2023, 12, 31)));
        assert!(!period.is_last_year(date(2024, 1, 1)));
        assert!(period.is_overdue(date(2024, 3, 13)));
        assert!(!period.is_overdue(date(2024, 3, 14)));
    }

    #[test]
    fn buckets_span_year_boundary_oldest_first() {
        let buckets = month_buckets(date(2024, 2, 29), 4);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024"]);
        assert_eq!(buckets[1].end, date(2024, 1, 1));
        assert!(buckets[3].contains(date(2024, 2, 29)));
        assert!(!buckets[3].contains(date(2024, 3, 1)));
    }

    #[test]
    fn zero_months_is_empty() {
        assert!(month_buckets(date(2024, 1, 1), 0).is_empty());
    }

    #[test]
    fn custom_label_format() {
        let buckets = month_buckets_labelled(date(2024, 5, 2), 2, "%B");
        assert_eq!(buckets[0].label, "April");
        assert_eq!(buckets[1].label, "May");
    }
}
