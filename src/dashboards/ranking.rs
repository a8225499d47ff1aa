//! Group-by, top-N and percentage-of-total helpers.
//!
//! Groups keep first-seen order and sorting is stable, so equal measures stay in
//! the order their keys first appeared in the input.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::hash::Hash;

use super::math;

/// Folds records into per-key accumulators, preserving first-seen key order.
pub fn group_by<T, K, A, F>(records: impl IntoIterator<Item = T>, key: impl Fn(&T) -> K, mut fold: F) -> Vec<(K, A)>
where
    K: Eq + Hash + Clone,
    A: Default,
    F: FnMut(&mut A, T),
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, A)> = Vec::new();
    for record in records {
        let k = key(&record);
        let slot = match index.get(&k) {
            Some(&slot) => slot,
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, A::default()));
                groups.len() - 1
            }
        };
        fold(&mut groups[slot].1, record);
    }
    groups
}

/// Sum of `measure` per key.
pub fn group_totals<T, K>(
    records: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> K,
    measure: impl Fn(&T) -> Decimal,
) -> Vec<(K, Decimal)>
where
    K: Eq + Hash + Clone,
{
    group_by(records, key, |total: &mut Decimal, record| *total += measure(&record))
}

/// Stable sort descending by `measure`, truncated to `n`.
pub fn top_n_by<T>(mut items: Vec<T>, n: usize, measure: impl Fn(&T) -> Decimal) -> Vec<T> {
    items.sort_by(|a, b| measure(b).cmp(&measure(a)));
    items.truncate(n);
    items
}

/// Newest first by `date_of`, truncated to `n`.
pub fn most_recent<T, D: Ord>(mut items: Vec<T>, n: usize, date_of: impl Fn(&T) -> D) -> Vec<T> {
    items.sort_by(|a, b| date_of(b).cmp(&date_of(a)));
    items.truncate(n);
    items
}

/// Percentage of `value` against the total of all groups, 0 when the total is zero.
pub fn share_of_total(value: Decimal, total: Decimal) -> Decimal {
    math::percentage(value, total, Decimal::ZERO)
}
