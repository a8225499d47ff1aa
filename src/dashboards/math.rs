use rust_decimal::{Decimal, RoundingStrategy};

pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds a derived metric to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator`, rounded to 2 dp, or `fallback` when the denominator is zero.
pub fn ratio(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator.is_zero() {
        return fallback;
    }
    numerator
        .checked_div(denominator)
        .map(round2)
        .unwrap_or(fallback)
}

/// `part / whole * 100`, rounded to 2 dp, or `fallback` when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal, fallback: Decimal) -> Decimal {
    if whole.is_zero() {
        return fallback;
    }
    part.checked_div(whole)
        .and_then(|share| share.checked_mul(HUNDRED))
        .map(round2)
        .unwrap_or(fallback)
}

pub fn count_percentage(part: usize, whole: usize, fallback: Decimal) -> Decimal {
    percentage(Decimal::from(part), Decimal::from(whole), fallback)
}

/// Growth of `current` over `previous` in percent; 0 when there is no baseline.
pub fn growth(current: Decimal, previous: Decimal) -> Decimal {
    percentage(current - previous, previous, Decimal::ZERO)
}

pub fn average<I>(values: I, fallback: Decimal) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0usize), |(sum, count), v| (sum + v, count + 1));
    ratio(sum, Decimal::from(count), fallback)
}

pub fn sum_by<T>(records: &[T], measure: impl Fn(&T) -> Decimal) -> Decimal {
    records.iter().map(measure).sum()
}

pub fn qty(quantity: i32) -> Decimal {
    Decimal::from(quantity)
}
