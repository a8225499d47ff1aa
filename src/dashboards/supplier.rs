//! Supplier dashboard: purchasing volume, delivery reliability and standing among suppliers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use super::math;
use super::period::{month_buckets, month_buckets_labelled, MonthBucket, ReportingPeriod};
use super::ranking::{group_by, most_recent, share_of_total, top_n_by};
use super::trends::{monthly_count, monthly_series, monthly_sum, TimeSeriesPoint};
use super::{reference_or_short_id, COMPARISON_MONTHS, RECENT_LIMIT, TOP_N, TREND_MONTHS};
use crate::entities::purchase_order::{self, PurchaseOrderStatus};
use crate::entities::{
    category, goods_receipt, goods_receipt_item, item, item_supplier, purchase_order_item, supplier,
};

const PORTFOLIO_SAMPLE: usize = 10;
const TOP_CATEGORIES: usize = 5;

#[derive(Debug, Clone)]
pub struct SupplierSnapshot {
    pub supplier: supplier::Model,
    /// Every supplier, used for ranking.
    pub all_suppliers: Vec<supplier::Model>,
    pub purchase_orders: Vec<purchase_order::Model>,
    pub purchase_order_items: Vec<purchase_order_item::Model>,
    pub goods_receipts: Vec<goods_receipt::Model>,
    pub goods_receipt_items: Vec<goods_receipt_item::Model>,
    pub item_suppliers: Vec<item_supplier::Model>,
    pub items: Vec<item::Model>,
    pub categories: Vec<category::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierDashboard {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub code: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub rating: Decimal,
    pub financials: SupplierFinancialMetrics,
    pub orders: SupplierOrderMetrics,
    pub delivery: SupplierDeliveryPerformance,
    pub quality: SupplierQualityMetrics,
    pub items: SupplierItemPortfolio,
    pub order_value_trend: Vec<TimeSeriesPoint>,
    pub order_count_trend: Vec<TimeSeriesPoint>,
    pub lead_time_trend: Vec<TimeSeriesPoint>,
    pub on_time_delivery_trend: Vec<TimeSeriesPoint>,
    pub orders_by_category: Vec<SupplierCategoryBreakdown>,
    pub top_items: Vec<SupplierTopItem>,
    pub recent_orders: Vec<SupplierRecentOrder>,
    pub monthly_performance: Vec<SupplierMonthlyComparison>,
    pub ranking: SupplierRanking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierFinancialMetrics {
    pub total_purchase_value: Decimal,
    pub total_purchase_value_ytd: Decimal,
    pub total_purchase_value_last_year: Decimal,
    pub average_order_value: Decimal,
    /// Not tracked: requires accounts payable data.
    pub outstanding_balance: Option<Decimal>,
    pub credit_limit: Decimal,
    /// Not tracked: depends on the outstanding balance.
    pub credit_utilization: Option<Decimal>,
    pub payment_terms_days: i32,
    pub growth_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierOrderMetrics {
    pub total_orders: usize,
    pub total_orders_ytd: usize,
    pub total_orders_last_year: usize,
    pub pending_orders: usize,
    pub approved_orders: usize,
    pub completed_orders: usize,
    pub cancelled_orders: usize,
    pub completion_rate: Decimal,
    pub cancellation_rate: Decimal,
    pub average_items_per_order: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierDeliveryPerformance {
    pub on_time_delivery_rate: Decimal,
    pub average_lead_time_days: Decimal,
    pub shortest_lead_time_days: i64,
    pub longest_lead_time_days: i64,
    pub early_deliveries: usize,
    pub on_time_deliveries: usize,
    pub late_deliveries: usize,
    /// Not tracked.
    pub average_delay_days: Option<Decimal>,
    pub delivery_reliability_score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierQualityMetrics {
    pub acceptance_rate: Decimal,
    pub total_items_received: i64,
    pub items_accepted: i64,
    /// Rejections, defects and returns are not recorded on goods receipts.
    pub items_rejected: Option<i64>,
    pub defect_rate: Option<Decimal>,
    pub return_count: Option<usize>,
    pub quality_score: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierItemPortfolio {
    pub total_items_supplied: usize,
    pub preferred_items: usize,
    /// Not tracked: requires market price data.
    pub average_price_competitiveness: Option<Decimal>,
    pub top_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierCategoryBreakdown {
    pub category_name: String,
    pub order_count: usize,
    pub total_value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierTopItem {
    pub item_id: Uuid,
    pub item_name: String,
    pub sku: Option<String>,
    pub total_quantity_ordered: i64,
    pub total_value: Decimal,
    pub order_count: usize,
    pub average_unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierRecentOrder {
    pub purchase_order_id: Uuid,
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total_amount: Decimal,
    pub item_count: usize,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierMonthlyComparison {
    pub month: String,
    pub year: i32,
    pub order_value: Decimal,
    pub order_count: usize,
    pub on_time_rate: Decimal,
    /// Not tracked.
    pub quality_score: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum PerformanceTier {
    Preferred,
    Approved,
    Standard,
    #[strum(serialize = "Under Review")]
    #[serde(rename = "Under Review")]
    UnderReview,
}

impl PerformanceTier {
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0..=3 => PerformanceTier::Preferred,
            4..=10 => PerformanceTier::Approved,
            11..=20 => PerformanceTier::Standard,
            _ => PerformanceTier::UnderReview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierRanking {
    pub overall_rank: usize,
    pub total_suppliers: usize,
    pub performance_tier: PerformanceTier,
}

/// Lookups shared by several sections.
struct Links<'a> {
    orders: HashMap<Uuid, &'a purchase_order::Model>,
    items: HashMap<Uuid, &'a item::Model>,
    categories: HashMap<Uuid, &'a category::Model>,
    lines_per_order: HashMap<Uuid, usize>,
}

impl<'a> Links<'a> {
    fn new(snapshot: &'a SupplierSnapshot) -> Self {
        let mut lines_per_order = HashMap::new();
        for line in &snapshot.purchase_order_items {
            *lines_per_order.entry(line.purchase_order_id).or_insert(0) += 1;
        }
        Self {
            orders: snapshot.purchase_orders.iter().map(|o| (o.id, o)).collect(),
            items: snapshot.items.iter().map(|i| (i.id, i)).collect(),
            categories: snapshot.categories.iter().map(|c| (c.id, c)).collect(),
            lines_per_order,
        }
    }

    fn order_of(&self, receipt: &goods_receipt::Model) -> Option<&'a purchase_order::Model> {
        receipt
            .purchase_order_id
            .and_then(|id| self.orders.get(&id).copied())
    }

    fn category_name(&self, item_id: Uuid) -> Option<&'a str> {
        self.items
            .get(&item_id)
            .and_then(|item| item.category_id)
            .and_then(|id| self.categories.get(&id))
            .map(|c| c.name.as_str())
    }

    fn line_count(&self, order_id: Uuid) -> usize {
        self.lines_per_order.get(&order_id).copied().unwrap_or(0)
    }
}

fn created_on(order: &purchase_order::Model) -> NaiveDate {
    order.created_at.date_naive()
}

fn is_delivered(order: &purchase_order::Model) -> bool {
    matches!(
        order.status(),
        Some(PurchaseOrderStatus::Completed | PurchaseOrderStatus::Received)
    )
}

fn lead_time_days(receipt: &goods_receipt::Model, order: &purchase_order::Model) -> i64 {
    (receipt.received_date - order.order_date).num_days()
}

/// Whether a receipt arrived on or before its order's expected date; `None` when no date was promised.
fn arrived_on_time(receipt: &goods_receipt::Model, links: &Links<'_>) -> Option<bool> {
    links
        .order_of(receipt)
        .and_then(|order| order.expected_delivery_date)
        .map(|expected| receipt.received_date <= expected)
}

fn on_time_rate<'a>(receipts: impl IntoIterator<Item = &'a goods_receipt::Model>, links: &Links<'_>) -> Decimal {
    let outcomes: Vec<bool> = receipts
        .into_iter()
        .filter_map(|r| arrived_on_time(r, links))
        .collect();
    let on_time = outcomes.iter().filter(|on_time| **on_time).count();
    math::count_percentage(on_time, outcomes.len(), math::HUNDRED)
}

pub fn build(snapshot: &SupplierSnapshot, period: &ReportingPeriod) -> SupplierDashboard {
    let links = Links::new(snapshot);
    let supplier = &snapshot.supplier;
    let trend = month_buckets(period.today, TREND_MONTHS);

    SupplierDashboard {
        supplier_id: supplier.id,
        supplier_name: supplier.name.clone(),
        code: supplier.code.clone(),
        contact_person: supplier.contact_person.clone(),
        email: supplier.email.clone(),
        phone: supplier.phone.clone(),
        image_url: supplier.image_url.clone(),
        is_active: supplier.is_active,
        rating: supplier.rating,
        financials: financial_metrics(supplier, &snapshot.purchase_orders, period),
        orders: order_metrics(&snapshot.purchase_orders, &links, period),
        delivery: delivery_performance(snapshot, &links),
        quality: quality_metrics(&snapshot.goods_receipt_items),
        items: item_portfolio(&snapshot.item_suppliers, &links),
        order_value_trend: monthly_sum(
            &snapshot.purchase_orders,
            &trend,
            |o| Some(created_on(o)),
            |o| o.total_amount,
        ),
        order_count_trend: monthly_count(&snapshot.purchase_orders, &trend, |o| Some(created_on(o)), |_| true),
        lead_time_trend: lead_time_trend(&snapshot.goods_receipts, &links, &trend),
        on_time_delivery_trend: monthly_series(
            &snapshot.goods_receipts,
            &trend,
            |r| Some(r.received_date.date_naive()),
            |rows| on_time_rate(rows.iter().copied(), &links),
        ),
        orders_by_category: category_breakdown(&snapshot.purchase_order_items, &links),
        top_items: top_items(&snapshot.purchase_order_items, &links),
        recent_orders: recent_orders(snapshot, &links),
        monthly_performance: monthly_comparison(snapshot, &links, period),
        ranking: ranking(supplier.id, &snapshot.all_suppliers),
    }
}

pub fn financial_metrics(
    supplier: &supplier::Model,
    orders: &[purchase_order::Model],
    period: &ReportingPeriod,
) -> SupplierFinancialMetrics {
    let total = math::sum_by(orders, |o| o.total_amount);
    let ytd: Decimal = orders
        .iter()
        .filter(|o| period.is_year_to_date(created_on(o)))
        .map(|o| o.total_amount)
        .sum();
    let last_year: Decimal = orders
        .iter()
        .filter(|o| period.is_last_year(created_on(o)))
        .map(|o| o.total_amount)
        .sum();

    SupplierFinancialMetrics {
        total_purchase_value: total,
        total_purchase_value_ytd: ytd,
        total_purchase_value_last_year: last_year,
        average_order_value: math::ratio(total, Decimal::from(orders.len()), Decimal::ZERO),
        outstanding_balance: None,
        credit_limit: supplier.credit_limit.unwrap_or_default(),
        credit_utilization: None,
        payment_terms_days: supplier.payment_terms_days,
        growth_percentage: math::growth(ytd, last_year),
    }
}

fn order_metrics(
    orders: &[purchase_order::Model],
    links: &Links<'_>,
    period: &ReportingPeriod,
) -> SupplierOrderMetrics {
    use PurchaseOrderStatus::*;

    let count = |wanted: &[PurchaseOrderStatus]| {
        orders
            .iter()
            .filter(|o| o.status().is_some_and(|s| wanted.contains(&s)))
            .count()
    };
    let completed = count(&[Completed, Received]);
    let cancelled = count(&[Cancelled]);

    SupplierOrderMetrics {
        total_orders: orders.len(),
        total_orders_ytd: orders
            .iter()
            .filter(|o| period.is_year_to_date(created_on(o)))
            .count(),
        total_orders_last_year: orders
            .iter()
            .filter(|o| period.is_last_year(created_on(o)))
            .count(),
        pending_orders: count(&[Pending, Draft]),
        approved_orders: count(&[Approved, Sent]),
        completed_orders: completed,
        cancelled_orders: cancelled,
        completion_rate: math::count_percentage(completed, orders.len(), Decimal::ZERO),
        cancellation_rate: math::count_percentage(cancelled, orders.len(), Decimal::ZERO),
        average_items_per_order: math::average(
            orders.iter().map(|o| Decimal::from(links.line_count(o.id))),
            Decimal::ZERO,
        ),
    }
}

fn delivery_performance(snapshot: &SupplierSnapshot, links: &Links<'_>) -> SupplierDeliveryPerformance {
    let lead_times: Vec<i64> = snapshot
        .goods_receipts
        .iter()
        .filter_map(|r| links.order_of(r).map(|o| lead_time_days(r, o)))
        .collect();

    let (mut early, mut on_time, mut late) = (0, 0, 0);
    for order in snapshot.purchase_orders.iter().filter(|o| is_delivered(o)) {
        let Some(expected) = order.expected_delivery_date else {
            continue;
        };
        let Some(receipt) = snapshot
            .goods_receipts
            .iter()
            .find(|r| r.purchase_order_id == Some(order.id))
        else {
            continue;
        };
        if receipt.received_date <= expected - chrono::Duration::days(1) {
            early += 1;
        } else if receipt.received_date <= expected {
            on_time += 1;
        } else {
            late += 1;
        }
    }

    let rate = math::count_percentage(early + on_time, early + on_time + late, math::HUNDRED);

    SupplierDeliveryPerformance {
        on_time_delivery_rate: rate,
        average_lead_time_days: math::average(lead_times.iter().map(|d| Decimal::from(*d)), Decimal::ZERO),
        shortest_lead_time_days: lead_times.iter().copied().min().unwrap_or(0),
        longest_lead_time_days: lead_times.iter().copied().max().unwrap_or(0),
        early_deliveries: early,
        on_time_deliveries: on_time,
        late_deliveries: late,
        average_delay_days: None,
        delivery_reliability_score: rate,
    }
}

/// Every received unit counts as accepted until inspections are recorded.
pub fn quality_metrics(receipt_items: &[goods_receipt_item::Model]) -> SupplierQualityMetrics {
    let received: i64 = receipt_items.iter().map(|i| i64::from(i.quantity)).sum();
    let accepted = received;
    let acceptance_rate = math::percentage(
        Decimal::from(accepted),
        Decimal::from(received),
        math::HUNDRED,
    );

    SupplierQualityMetrics {
        acceptance_rate,
        total_items_received: received,
        items_accepted: accepted,
        items_rejected: None,
        defect_rate: None,
        return_count: None,
        quality_score: Some(acceptance_rate),
    }
}

fn item_portfolio(links_to_items: &[item_supplier::Model], links: &Links<'_>) -> SupplierItemPortfolio {
    let mut top_categories: Vec<String> = Vec::new();
    for name in links_to_items
        .iter()
        .take(PORTFOLIO_SAMPLE)
        .filter_map(|link| links.category_name(link.item_id))
    {
        if !top_categories.iter().any(|existing| existing == name) {
            top_categories.push(name.to_string());
        }
    }
    top_categories.truncate(TOP_CATEGORIES);

    SupplierItemPortfolio {
        total_items_supplied: links_to_items.len(),
        preferred_items: links_to_items.iter().filter(|l| l.is_preferred).count(),
        average_price_competitiveness: None,
        top_categories,
    }
}

fn lead_time_trend(
    receipts: &[goods_receipt::Model],
    links: &Links<'_>,
    buckets: &[MonthBucket],
) -> Vec<TimeSeriesPoint> {
    monthly_series(
        receipts,
        buckets,
        |r| Some(r.received_date.date_naive()),
        |rows| {
            math::average(
                rows.iter()
                    .filter_map(|r| links.order_of(r).map(|o| Decimal::from(lead_time_days(r, o)))),
                Decimal::ZERO,
            )
        },
    )
}

fn category_breakdown(
    lines: &[purchase_order_item::Model],
    links: &Links<'_>,
) -> Vec<SupplierCategoryBreakdown> {
    let known = lines.iter().filter(|l| links.items.contains_key(&l.item_id));
    let groups = group_by(
        known,
        |line| {
            links
                .category_name(line.item_id)
                .unwrap_or("Uncategorized")
                .to_string()
        },
        |acc: &mut (usize, Decimal), line| {
            acc.0 += 1;
            acc.1 += line.total_price;
        },
    );
    let total: Decimal = groups.iter().map(|(_, (_, value))| *value).sum();

    let rows: Vec<SupplierCategoryBreakdown> = groups
        .into_iter()
        .map(|(category_name, (order_count, total_value))| SupplierCategoryBreakdown {
            category_name,
            order_count,
            total_value,
            percentage: share_of_total(total_value, total),
        })
        .collect();
    top_n_by(rows, TOP_N, |row| row.total_value)
}

#[derive(Default)]
struct ItemTotals {
    quantity: i64,
    value: Decimal,
    lines: usize,
}

fn top_items(lines: &[purchase_order_item::Model], links: &Links<'_>) -> Vec<SupplierTopItem> {
    let groups = group_by(
        lines,
        |line| line.item_id,
        |acc: &mut ItemTotals, line| {
            acc.quantity += i64::from(line.quantity);
            acc.value += line.total_price;
            acc.lines += 1;
        },
    );

    let rows: Vec<SupplierTopItem> = groups
        .into_iter()
        .map(|(item_id, totals)| {
            let item = links.items.get(&item_id);
            SupplierTopItem {
                item_id,
                item_name: item
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                sku: item.and_then(|i| i.sku.clone()),
                total_quantity_ordered: totals.quantity,
                total_value: totals.value,
                order_count: totals.lines,
                average_unit_price: math::ratio(totals.value, Decimal::from(totals.quantity), Decimal::ZERO),
            }
        })
        .collect();
    top_n_by(rows, TOP_N, |row| row.total_value)
}

fn recent_orders(snapshot: &SupplierSnapshot, links: &Links<'_>) -> Vec<SupplierRecentOrder> {
    most_recent(
        snapshot.purchase_orders.iter().collect::<Vec<_>>(),
        RECENT_LIMIT,
        |o| o.created_at,
    )
    .into_iter()
    .map(|order| SupplierRecentOrder {
        purchase_order_id: order.id,
        order_number: order
            .order_number
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("PO-{}", reference_or_short_id(None, order.id))),
        order_date: order.order_date,
        status: order.status.clone(),
        total_amount: order.total_amount,
        item_count: links.line_count(order.id),
        expected_delivery: order.expected_delivery_date,
        actual_delivery: snapshot
            .goods_receipts
            .iter()
            .find(|r| r.purchase_order_id == Some(order.id))
            .map(|r| r.received_date),
    })
    .collect()
}

fn monthly_comparison(
    snapshot: &SupplierSnapshot,
    links: &Links<'_>,
    period: &ReportingPeriod,
) -> Vec<SupplierMonthlyComparison> {
    month_buckets_labelled(period.today, COMPARISON_MONTHS, "%b")
        .into_iter()
        .map(|bucket| {
            let orders: Vec<&purchase_order::Model> = snapshot
                .purchase_orders
                .iter()
                .filter(|o| bucket.contains(created_on(o)))
                .collect();
            let receipts = snapshot
                .goods_receipts
                .iter()
                .filter(|r| bucket.contains(r.received_date.date_naive()));

            SupplierMonthlyComparison {
                year: bucket.year(),
                order_value: orders.iter().map(|o| o.total_amount).sum(),
                order_count: orders.len(),
                on_time_rate: on_time_rate(receipts, links),
                quality_score: None,
                month: bucket.label,
            }
        })
        .collect()
}

/// Position by rating among all suppliers, 1-based; ties keep repository order.
pub fn ranking(supplier_id: Uuid, all_suppliers: &[supplier::Model]) -> SupplierRanking {
    let ordered = top_n_by(all_suppliers.iter().collect::<Vec<_>>(), usize::MAX, |s| s.rating);
    let rank = ordered
        .iter()
        .position(|s| s.id == supplier_id)
        .map(|index| index + 1)
        .unwrap_or(ordered.len() + 1);

    SupplierRanking {
        overall_rank: rank,
        total_suppliers: all_suppliers.len(),
        performance_tier: PerformanceTier::for_rank(rank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn period() -> ReportingPeriod {
        ReportingPeriod::from_now(at(2024, 6, 15))
    }

    fn acme(rating: Decimal) -> supplier::Model {
        supplier::Model {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            code: None,
            contact_person: None,
            email: None,
            phone: None,
            image_url: None,
            is_active: true,
            rating,
            credit_limit: None,
            payment_terms_days: 30,
        }
    }

    fn order(status: &str, amount: Decimal, created: DateTime<Utc>, expected: Option<DateTime<Utc>>) -> purchase_order::Model {
        purchase_order::Model {
            id: Uuid::new_v4(),
            supplier_id: Uuid::nil(),
            order_number: None,
            order_date: created,
            expected_delivery_date: expected,
            status: status.into(),
            total_amount: amount,
            created_at: created,
        }
    }

    fn receipt(order: &purchase_order::Model, received: DateTime<Utc>) -> goods_receipt::Model {
        goods_receipt::Model {
            id: Uuid::new_v4(),
            warehouse_id: None,
            purchase_order_id: Some(order.id),
            receipt_number: None,
            status: "Received".into(),
            received_date: received,
        }
    }

    fn snapshot(subject: supplier::Model) -> SupplierSnapshot {
        SupplierSnapshot {
            all_suppliers: vec![subject.clone()],
            supplier: subject,
            purchase_orders: vec![],
            purchase_order_items: vec![],
            goods_receipts: vec![],
            goods_receipt_items: vec![],
            item_suppliers: vec![],
            items: vec![],
            categories: vec![],
        }
    }

    #[test]
    fn supplier_without_orders_uses_fallbacks() {
        let dashboard = build(&snapshot(acme(dec!(4))), &period());

        assert_eq!(dashboard.financials.average_order_value, Decimal::ZERO);
        assert_eq!(dashboard.financials.growth_percentage, Decimal::ZERO);
        assert_eq!(dashboard.orders.completion_rate, Decimal::ZERO);
        assert_eq!(dashboard.orders.cancellation_rate, Decimal::ZERO);
        assert_eq!(dashboard.delivery.on_time_delivery_rate, dec!(100));
        assert_eq!(dashboard.quality.acceptance_rate, dec!(100));
        assert_eq!(dashboard.quality.quality_score, Some(dec!(100)));
        assert_eq!(dashboard.items.average_price_competitiveness, None);
        assert!(dashboard.on_time_delivery_trend.iter().all(|p| p.value == dec!(100)));
        assert!(dashboard.lead_time_trend.iter().all(|p| p.value.is_zero()));
        assert_eq!(dashboard.monthly_performance.len(), COMPARISON_MONTHS);
        assert_eq!(dashboard.ranking.overall_rank, 1);
    }

    #[test]
    fn delivery_classification_and_lead_times() {
        let mut snap = snapshot(acme(dec!(4)));
        let expected = at(2024, 5, 10);
        let early = order("Received", dec!(10), at(2024, 5, 1), Some(expected));
        let on_time = order("Completed", dec!(10), at(2024, 5, 1), Some(expected));
        let late = order("Received", dec!(10), at(2024, 5, 1), Some(expected));
        snap.goods_receipts = vec![
            receipt(&early, at(2024, 5, 8)),
            receipt(&on_time, at(2024, 5, 10)),
            receipt(&late, at(2024, 5, 13)),
        ];
        snap.purchase_orders = vec![early, on_time, late];

        let delivery = delivery_performance(&snap, &Links::new(&snap));
        assert_eq!(
            (delivery.early_deliveries, delivery.on_time_deliveries, delivery.late_deliveries),
            (1, 1, 1)
        );
        assert_eq!(delivery.on_time_delivery_rate, dec!(66.67));
        assert_eq!(delivery.shortest_lead_time_days, 7);
        assert_eq!(delivery.longest_lead_time_days, 12);
        assert_eq!(delivery.average_lead_time_days, dec!(9.33));
    }

    #[test]
    fn quality_score_follows_acceptance_rate() {
        let line = |quantity| goods_receipt_item::Model {
            id: Uuid::new_v4(),
            goods_receipt_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            quantity,
        };
        let quality = quality_metrics(&[line(4), line(6)]);
        assert_eq!(quality.total_items_received, 10);
        assert_eq!(quality.acceptance_rate, dec!(100));
        assert_eq!(quality.quality_score, Some(quality.acceptance_rate));
        assert_eq!(quality.defect_rate, None);
    }

    #[test]
    fn growth_compares_ytd_against_last_year() {
        let orders = vec![
            order("Completed", dec!(150), at(2024, 2, 1), None),
            order("Completed", dec!(100), at(2023, 7, 1), None),
            order("Completed", dec!(999), at(2022, 7, 1), None),
        ];
        let financials = financial_metrics(&acme(dec!(3)), &orders, &period());
        assert_eq!(financials.total_purchase_value_ytd, dec!(150));
        assert_eq!(financials.total_purchase_value_last_year, dec!(100));
        assert_eq!(financials.growth_percentage, dec!(50));
    }

    #[rstest]
    #[case(1, PerformanceTier::Preferred)]
    #[case(3, PerformanceTier::Preferred)]
    #[case(4, PerformanceTier::Approved)]
    #[case(10, PerformanceTier::Approved)]
    #[case(20, PerformanceTier::Standard)]
    #[case(21, PerformanceTier::UnderReview)]
    fn tiers_follow_rank(#[case] rank: usize, #[case] tier: PerformanceTier) {
        assert_eq!(PerformanceTier::for_rank(rank), tier);
    }

    #[test]
    fn ranking_orders_by_rating() {
        let subject = acme(dec!(3));
        let others = vec![acme(dec!(5)), acme(dec!(1)), subject.clone()];
        let ranking = ranking(subject.id, &others);
        assert_eq!(ranking.overall_rank, 2);
        assert_eq!(ranking.total_suppliers, 3);
    }
}
