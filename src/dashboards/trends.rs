use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::period::MonthBucket;

/// One point of a monthly trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: Decimal,
}

/// Buckets `records` by `date_of` and reduces each bucket with `reduce`.
///
/// Always yields one point per bucket, in bucket order; empty buckets are passed
/// to `reduce` as an empty slice. Records without a date are skipped.
pub fn monthly_series<T, D, R>(
    records: &[T],
    buckets: &[MonthBucket],
    date_of: D,
    reduce: R,
) -> Vec<TimeSeriesPoint>
where
    D: Fn(&T) -> Option<NaiveDate>,
    R: Fn(&[&T]) -> Decimal,
{
    buckets
        .iter()
        .map(|bucket| {
            let in_bucket: Vec<&T> = records
                .iter()
                .filter(|record| date_of(*record).is_some_and(|d| bucket.contains(d)))
                .collect();
            TimeSeriesPoint {
                date: bucket.start,
                label: bucket.label.clone(),
                value: reduce(&in_bucket),
            }
        })
        .collect()
}

/// Sum of `measure` per bucket.
pub fn monthly_sum<T>(
    records: &[T],
    buckets: &[MonthBucket],
    date_of: impl Fn(&T) -> Option<NaiveDate>,
    measure: impl Fn(&T) -> Decimal,
) -> Vec<TimeSeriesPoint> {
    monthly_series(records, buckets, date_of, |rows| {
        rows.iter().map(|row| measure(*row)).sum()
    })
}

/// Number of records per bucket matching `predicate`.
pub fn monthly_count<T>(
    records: &[T],
    buckets: &[MonthBucket],
    date_of: impl Fn(&T) -> Option<NaiveDate>,
    predicate: impl Fn(&T) -> bool,
) -> Vec<TimeSeriesPoint> {
    monthly_series(records, buckets, date_of, |rows| {
        Decimal::from(rows.iter().filter(|row| predicate(**row)).count())
    })
}

/// Constant series, used where only a current snapshot value exists.
pub fn flat_series(buckets: &[MonthBucket], value: Decimal) -> Vec<TimeSeriesPoint> {
    buckets
        .iter()
        .map(|bucket| TimeSeriesPoint {
            date: bucket.start,
            label: bucket.label.clone(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboards::period::month_buckets;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sums_and_counts_land_in_their_month() {
        let buckets = month_buckets(date(2024, 3, 20), 3);
        let rows = vec![
            (date(2024, 3, 2), dec!(100)),
            (date(2024, 3, 9), dec!(-40)),
            (date(2024, 3, 19), dec!(25)),
            (date(2024, 1, 31), dec!(7)),
            (date(2023, 12, 31), dec!(1000)),
        ];

        let net = monthly_sum(&rows, &buckets, |r| Some(r.0), |r| r.1);
        assert_eq!(
            net.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![dec!(7), dec!(0), dec!(85)]
        );

        let outbound = monthly_count(&rows, &buckets, |r| Some(r.0), |r| r.1 < Decimal::ZERO);
        assert_eq!(outbound[2].value, dec!(1));
        assert_eq!(outbound[0].label, "Jan 2024");
    }

    #[test]
    fn undated_records_are_ignored() {
        let buckets = month_buckets(date(2024, 3, 20), 1);
        let rows: Vec<Option<NaiveDate>> = vec![None, Some(date(2024, 3, 1))];
        let series = monthly_count(&rows, &buckets, |r| *r, |_| true);
        assert_eq!(series[0].value, dec!(1));
    }
}
