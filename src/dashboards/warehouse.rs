//! Warehouse dashboard: capacity, stock, movements and floor operations for one site.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

use super::math::{self, qty};
use super::period::{month_buckets, month_buckets_labelled, ReportingPeriod};
use super::ranking::{group_by, most_recent, share_of_total, top_n_by};
use super::trends::{monthly_count, monthly_series, monthly_sum, TimeSeriesPoint};
use super::{
    reference_or_short_id, AlertSeverity, DashboardAlert, StockStatus, ALERT_LIMIT,
    COMPARISON_MONTHS, RECENT_LIMIT, TOP_N, TREND_MONTHS,
};
use crate::entities::cycle_count::{self, CycleCountStatus};
use crate::entities::goods_receipt::{self, GoodsReceiptStatus};
use crate::entities::pick_list::{self, PickListStatus};
use crate::entities::put_away_task::{self, PutAwayStatus};
use crate::entities::{category, inventory_transaction, item, stock_level, warehouse, warehouse_location};

const TASKS_PER_KIND: usize = 5;
const PENDING_TASK_LIMIT: usize = 10;
const UNCATEGORIZED: &str = "Uncategorized";

/// Everything the warehouse dashboard is computed from.
#[derive(Debug, Clone)]
pub struct WarehouseSnapshot {
    pub warehouse: warehouse::Model,
    pub locations: Vec<warehouse_location::Model>,
    pub stock_levels: Vec<stock_level::Model>,
    pub transactions: Vec<inventory_transaction::Model>,
    pub put_away_tasks: Vec<put_away_task::Model>,
    pub pick_lists: Vec<pick_list::Model>,
    pub cycle_counts: Vec<cycle_count::Model>,
    pub goods_receipts: Vec<goods_receipt::Model>,
    pub items: Vec<item::Model>,
    pub categories: Vec<category::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WarehouseDashboard {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub code: String,
    pub address: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub phone: Option<String>,
    pub warehouse_type: Option<String>,
    pub is_active: bool,
    pub capacity: CapacityMetrics,
    pub inventory: InventorySummary,
    pub movements: MovementMetrics,
    pub operations: OperationsMetrics,
    pub locations: LocationUtilization,
    pub inventory_value_trend: Vec<TimeSeriesPoint>,
    pub receiving_trend: Vec<TimeSeriesPoint>,
    pub shipping_trend: Vec<TimeSeriesPoint>,
    pub turnover_trend: Vec<TimeSeriesPoint>,
    pub inventory_by_category: Vec<WarehouseCategoryBreakdown>,
    pub top_items: Vec<TopWarehouseItem>,
    pub recent_transactions: Vec<WarehouseRecentTransaction>,
    pub pending_tasks: Vec<PendingWarehouseTask>,
    pub monthly_performance: Vec<WarehouseMonthlyComparison>,
    pub alerts: Vec<DashboardAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CapacityMetrics {
    pub total_capacity: Decimal,
    pub used_capacity: Decimal,
    pub available_capacity: Decimal,
    pub utilization_percentage: Decimal,
    pub total_locations: usize,
    pub occupied_locations: usize,
    pub empty_locations: usize,
    pub location_utilization_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventorySummary {
    pub total_items: usize,
    pub total_sku: usize,
    pub total_quantity_on_hand: i64,
    pub total_inventory_value: Decimal,
    pub total_inventory_cost: Decimal,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub overstock_items: usize,
    /// Not tracked: stock levels carry no expiry information.
    pub expiring_items: Option<usize>,
    pub average_item_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MovementMetrics {
    pub total_inbound_today: usize,
    pub total_outbound_today: usize,
    pub total_inbound_ytd: usize,
    pub total_outbound_ytd: usize,
    pub inbound_value_ytd: Decimal,
    pub outbound_value_ytd: Decimal,
    /// Not tracked: transfers are not part of the transaction feed.
    pub transfers_in_today: Option<usize>,
    pub transfers_out_today: Option<usize>,
    pub average_daily_movements: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperationsMetrics {
    pub pending_put_aways: usize,
    pub pending_pick_lists: usize,
    pub pending_cycle_counts: usize,
    pub pending_goods_receipts: usize,
    pub put_away_efficiency: Decimal,
    pub picking_accuracy: Decimal,
    pub cycle_count_accuracy: Decimal,
    /// Not tracked: tasks record no start time.
    pub average_processing_time_hours: Option<Decimal>,
    pub tasks_completed_today: usize,
    pub tasks_overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationUtilization {
    pub total_bins: usize,
    pub occupied_bins: usize,
    pub empty_bins: usize,
    pub bin_utilization_percentage: Decimal,
    pub zone_breakdown: Vec<ZoneUtilization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZoneUtilization {
    pub zone_name: String,
    pub total_locations: usize,
    pub occupied_locations: usize,
    pub utilization_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WarehouseCategoryBreakdown {
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopWarehouseItem {
    pub item_id: Uuid,
    pub item_name: String,
    pub sku: Option<String>,
    pub quantity_on_hand: i32,
    pub total_value: Decimal,
    pub stock_status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WarehouseRecentTransaction {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub item_name: String,
    pub quantity: i32,
    pub transaction_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub performed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingWarehouseTask {
    pub task_id: Uuid,
    pub task_type: String,
    pub description: String,
    pub priority: String,
    pub created_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WarehouseMonthlyComparison {
    pub month: String,
    pub year: i32,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub inbound_value: Decimal,
    pub outbound_value: Decimal,
    /// Not tracked: capacity history is not recorded.
    pub utilization_percentage: Option<Decimal>,
    pub turnover_rate: Decimal,
}

/// Item reference data keyed by id.
struct Catalog<'a> {
    items: HashMap<Uuid, &'a item::Model>,
    categories: HashMap<Uuid, &'a category::Model>,
}

impl<'a> Catalog<'a> {
    fn new(items: &'a [item::Model], categories: &'a [category::Model]) -> Self {
        Self {
            items: items.iter().map(|i| (i.id, i)).collect(),
            categories: categories.iter().map(|c| (c.id, c)).collect(),
        }
    }

    fn item(&self, id: Uuid) -> Option<&'a item::Model> {
        self.items.get(&id).copied()
    }

    fn stock_value(&self, level: &stock_level::Model) -> Decimal {
        self.item(level.item_id)
            .map(|item| qty(level.quantity_on_hand) * item.unit_price)
            .unwrap_or_default()
    }

    fn stock_cost(&self, level: &stock_level::Model) -> Decimal {
        self.item(level.item_id)
            .map(|item| qty(level.quantity_on_hand) * item.cost)
            .unwrap_or_default()
    }

    fn item_name(&self, id: Uuid) -> String {
        self.item(id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

pub fn build(snapshot: &WarehouseSnapshot, period: &ReportingPeriod) -> WarehouseDashboard {
    let catalog = Catalog::new(&snapshot.items, &snapshot.categories);
    let on_hand: i64 = snapshot
        .stock_levels
        .iter()
        .map(|s| i64::from(s.quantity_on_hand))
        .sum();
    let warehouse = &snapshot.warehouse;

    WarehouseDashboard {
        warehouse_id: warehouse.id,
        warehouse_name: warehouse.name.clone(),
        code: warehouse.code.clone(),
        address: warehouse.address.clone(),
        manager_name: warehouse.manager_name.clone(),
        manager_email: warehouse.manager_email.clone(),
        phone: warehouse.manager_phone.clone(),
        warehouse_type: warehouse.warehouse_type.clone(),
        is_active: warehouse.is_active,
        capacity: capacity_metrics(warehouse, &snapshot.locations, &snapshot.stock_levels),
        inventory: inventory_summary(&snapshot.stock_levels, &catalog),
        movements: movement_metrics(&snapshot.transactions, period),
        operations: operations_metrics(snapshot, period),
        locations: location_utilization(&snapshot.locations),
        inventory_value_trend: inventory_value_trend(&snapshot.transactions, period),
        receiving_trend: monthly_count(
            &snapshot.transactions,
            &month_buckets(period.today, TREND_MONTHS),
            |t| Some(t.transaction_date.date_naive()),
            |t| t.is_inbound(),
        ),
        shipping_trend: monthly_count(
            &snapshot.transactions,
            &month_buckets(period.today, TREND_MONTHS),
            |t| Some(t.transaction_date.date_naive()),
            |t| t.is_outbound(),
        ),
        turnover_trend: turnover_trend(&snapshot.transactions, on_hand, period),
        inventory_by_category: category_breakdown(&snapshot.stock_levels, &catalog),
        top_items: top_items(&snapshot.stock_levels, &catalog),
        recent_transactions: recent_transactions(&snapshot.transactions, &catalog),
        pending_tasks: pending_tasks(snapshot),
        monthly_performance: monthly_comparison(&snapshot.transactions, on_hand, period),
        alerts: alerts(snapshot, &catalog, period),
    }
}

pub fn capacity_metrics(
    warehouse: &warehouse::Model,
    locations: &[warehouse_location::Model],
    stock_levels: &[stock_level::Model],
) -> CapacityMetrics {
    let stocked: HashSet<Uuid> = stock_levels
        .iter()
        .filter(|s| s.quantity_on_hand > 0)
        .filter_map(|s| s.warehouse_location_id)
        .collect();
    let occupied = locations.iter().filter(|l| stocked.contains(&l.id)).count();

    CapacityMetrics {
        total_capacity: warehouse.total_capacity,
        used_capacity: warehouse.used_capacity,
        available_capacity: warehouse.total_capacity - warehouse.used_capacity,
        utilization_percentage: math::percentage(
            warehouse.used_capacity,
            warehouse.total_capacity,
            Decimal::ZERO,
        ),
        total_locations: locations.len(),
        occupied_locations: occupied,
        empty_locations: locations.len() - occupied,
        location_utilization_percentage: math::count_percentage(occupied, locations.len(), Decimal::ZERO),
    }
}

fn inventory_summary(stock_levels: &[stock_level::Model], catalog: &Catalog<'_>) -> InventorySummary {
    let total_value: Decimal = stock_levels.iter().map(|s| catalog.stock_value(s)).sum();
    let total_cost: Decimal = stock_levels.iter().map(|s| catalog.stock_cost(s)).sum();
    let distinct: HashSet<Uuid> = stock_levels.iter().map(|s| s.item_id).collect();

    let mut low = 0;
    let mut over = 0;
    for level in stock_levels {
        if let Some(item) = catalog.item(level.item_id) {
            if level.quantity_on_hand > 0 && level.quantity_on_hand <= item.reorder_point {
                low += 1;
            }
            if level.quantity_on_hand > item.maximum_stock {
                over += 1;
            }
        }
    }

    InventorySummary {
        total_items: stock_levels.len(),
        total_sku: distinct.len(),
        total_quantity_on_hand: stock_levels.iter().map(|s| i64::from(s.quantity_on_hand)).sum(),
        total_inventory_value: total_value,
        total_inventory_cost: total_cost,
        low_stock_items: low,
        out_of_stock_items: stock_levels.iter().filter(|s| s.quantity_on_hand <= 0).count(),
        overstock_items: over,
        expiring_items: None,
        average_item_value: math::ratio(total_value, Decimal::from(distinct.len()), Decimal::ZERO),
    }
}

pub fn movement_metrics(
    transactions: &[inventory_transaction::Model],
    period: &ReportingPeriod,
) -> MovementMetrics {
    let today: Vec<_> = transactions
        .iter()
        .filter(|t| period.is_today(t.transaction_date.date_naive()))
        .collect();
    let ytd: Vec<_> = transactions
        .iter()
        .filter(|t| period.is_year_to_date(t.transaction_date.date_naive()))
        .collect();

    let inbound_ytd = ytd.iter().filter(|t| t.is_inbound()).count();
    let outbound_ytd = ytd.iter().filter(|t| t.is_outbound()).count();

    MovementMetrics {
        total_inbound_today: today.iter().filter(|t| t.is_inbound()).count(),
        total_outbound_today: today.iter().filter(|t| t.is_outbound()).count(),
        total_inbound_ytd: inbound_ytd,
        total_outbound_ytd: outbound_ytd,
        inbound_value_ytd: ytd.iter().filter(|t| t.is_inbound()).map(|t| t.total_cost).sum(),
        outbound_value_ytd: ytd
            .iter()
            .filter(|t| t.is_outbound())
            .map(|t| t.total_cost.abs())
            .sum(),
        transfers_in_today: None,
        transfers_out_today: None,
        average_daily_movements: math::ratio(
            Decimal::from(inbound_ytd + outbound_ytd),
            Decimal::from(period.days_into_year()),
            Decimal::ZERO,
        ),
    }
}

fn is_closed_put_away(task: &put_away_task::Model) -> bool {
    task.is(PutAwayStatus::Completed) || task.is(PutAwayStatus::Cancelled)
}

fn is_closed_pick_list(list: &pick_list::Model) -> bool {
    list.is(PickListStatus::Completed) || list.is(PickListStatus::Cancelled)
}

fn is_pending_put_away(task: &put_away_task::Model) -> bool {
    matches!(task.status(), Some(PutAwayStatus::Pending | PutAwayStatus::InProgress))
}

fn is_pending_pick_list(list: &pick_list::Model) -> bool {
    matches!(
        list.status(),
        Some(PickListStatus::Created | PickListStatus::Assigned | PickListStatus::InProgress)
    )
}

fn is_pending_cycle_count(count: &cycle_count::Model) -> bool {
    matches!(
        count.status(),
        Some(CycleCountStatus::Scheduled | CycleCountStatus::InProgress)
    )
}

fn completed_on(completed: Option<DateTime<Utc>>, period: &ReportingPeriod) -> bool {
    completed.is_some_and(|at| period.is_today(at.date_naive()))
}

pub fn operations_metrics(snapshot: &WarehouseSnapshot, period: &ReportingPeriod) -> OperationsMetrics {
    let put_aways = &snapshot.put_away_tasks;
    let pick_lists = &snapshot.pick_lists;
    let cycle_counts = &snapshot.cycle_counts;
    let hundred = math::HUNDRED;

    let completed_put_aways = put_aways.iter().filter(|t| t.is(PutAwayStatus::Completed)).count();
    let completed_picks = pick_lists.iter().filter(|p| p.is(PickListStatus::Completed)).count();
    let completed_counts = cycle_counts
        .iter()
        .filter(|c| c.is(CycleCountStatus::Completed))
        .count();

    let completed_today = put_aways
        .iter()
        .filter(|t| t.is(PutAwayStatus::Completed) && completed_on(t.completed_date, period))
        .count()
        + pick_lists
            .iter()
            .filter(|p| p.is(PickListStatus::Completed) && completed_on(p.completed_date, period))
            .count();

    let overdue = put_aways
        .iter()
        .filter(|t| !is_closed_put_away(t) && period.is_overdue(t.created_at.date_naive()))
        .count()
        + pick_lists
            .iter()
            .filter(|p| !is_closed_pick_list(p) && period.is_overdue(p.created_at.date_naive()))
            .count();

    OperationsMetrics {
        pending_put_aways: put_aways.iter().filter(|t| is_pending_put_away(t)).count(),
        pending_pick_lists: pick_lists.iter().filter(|p| is_pending_pick_list(p)).count(),
        pending_cycle_counts: cycle_counts.iter().filter(|c| is_pending_cycle_count(c)).count(),
        pending_goods_receipts: snapshot
            .goods_receipts
            .iter()
            .filter(|g| g.is(GoodsReceiptStatus::Pending))
            .count(),
        put_away_efficiency: math::count_percentage(completed_put_aways, put_aways.len(), hundred),
        picking_accuracy: math::count_percentage(completed_picks, pick_lists.len(), hundred),
        cycle_count_accuracy: math::count_percentage(completed_counts, cycle_counts.len(), hundred),
        average_processing_time_hours: None,
        tasks_completed_today: completed_today,
        tasks_overdue: overdue,
    }
}

fn is_occupied(location: &warehouse_location::Model) -> bool {
    location.used_capacity > Decimal::ZERO
}

pub fn location_utilization(locations: &[warehouse_location::Model]) -> LocationUtilization {
    let occupied = locations.iter().filter(|l| is_occupied(l)).count();

    let zones = group_by(
        locations.iter().filter(|l| l.aisle.as_deref().is_some_and(|a| !a.is_empty())),
        |l| l.aisle.clone().unwrap_or_default(),
        |acc: &mut (usize, usize), l| {
            acc.0 += 1;
            if is_occupied(l) {
                acc.1 += 1;
            }
        },
    )
    .into_iter()
    .map(|(zone_name, (total, occupied))| ZoneUtilization {
        zone_name,
        total_locations: total,
        occupied_locations: occupied,
        utilization_percentage: math::count_percentage(occupied, total, Decimal::ZERO),
    })
    .collect();

    LocationUtilization {
        total_bins: locations.len(),
        occupied_bins: occupied,
        empty_bins: locations.len() - occupied,
        bin_utilization_percentage: math::count_percentage(occupied, locations.len(), Decimal::ZERO),
        zone_breakdown: zones,
    }
}

/// Net signed movement value per month.
pub fn inventory_value_trend(
    transactions: &[inventory_transaction::Model],
    period: &ReportingPeriod,
) -> Vec<TimeSeriesPoint> {
    monthly_sum(
        transactions,
        &month_buckets(period.today, TREND_MONTHS),
        |t| Some(t.transaction_date.date_naive()),
        |t| t.total_cost,
    )
}

fn outbound_quantity<'a>(rows: impl IntoIterator<Item = &'a inventory_transaction::Model>) -> i64 {
    rows.into_iter()
        .filter(|t| t.is_outbound())
        .map(|t| i64::from(t.quantity).abs())
        .sum()
}

/// Outbound units per month over current units on hand.
pub fn turnover_trend(
    transactions: &[inventory_transaction::Model],
    on_hand: i64,
    period: &ReportingPeriod,
) -> Vec<TimeSeriesPoint> {
    monthly_series(
        transactions,
        &month_buckets(period.today, TREND_MONTHS),
        |t| Some(t.transaction_date.date_naive()),
        |rows| turnover(outbound_quantity(rows.iter().copied()), on_hand),
    )
}

fn turnover(outbound_units: i64, on_hand: i64) -> Decimal {
    if on_hand <= 0 {
        return Decimal::ZERO;
    }
    math::ratio(Decimal::from(outbound_units), Decimal::from(on_hand), Decimal::ZERO)
}

#[derive(Default)]
struct CategoryTotals {
    item_count: usize,
    quantity: i64,
    value: Decimal,
}

fn category_breakdown(
    stock_levels: &[stock_level::Model],
    catalog: &Catalog<'_>,
) -> Vec<WarehouseCategoryBreakdown> {
    let known: Vec<(&stock_level::Model, &item::Model)> = stock_levels
        .iter()
        .filter_map(|s| catalog.item(s.item_id).map(|item| (s, item)))
        .collect();
    let total: Decimal = known.iter().map(|(s, _)| catalog.stock_value(s)).sum();

    let category_of = |item: &item::Model| {
        item.category_id
            .filter(|id| catalog.categories.contains_key(id))
    };

    let groups = group_by(
        known,
        |(_, item)| category_of(*item),
        |acc: &mut CategoryTotals, (level, _)| {
            acc.item_count += 1;
            acc.quantity += i64::from(level.quantity_on_hand);
            acc.value += catalog.stock_value(level);
        },
    );

    let rows: Vec<WarehouseCategoryBreakdown> = groups
        .into_iter()
        .map(|(category_id, totals)| WarehouseCategoryBreakdown {
            category_name: category_id
                .and_then(|id| catalog.categories.get(&id))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            category_id,
            item_count: totals.item_count,
            total_quantity: totals.quantity,
            total_value: totals.value,
            percentage: share_of_total(totals.value, total),
        })
        .collect();

    top_n_by(rows, TOP_N, |row| row.total_value)
}

fn top_items(stock_levels: &[stock_level::Model], catalog: &Catalog<'_>) -> Vec<TopWarehouseItem> {
    let rows: Vec<TopWarehouseItem> = stock_levels
        .iter()
        .filter_map(|level| {
            catalog.item(level.item_id).map(|item| TopWarehouseItem {
                item_id: item.id,
                item_name: item.name.clone(),
                sku: item.sku.clone(),
                quantity_on_hand: level.quantity_on_hand,
                total_value: qty(level.quantity_on_hand) * item.unit_price,
                stock_status: StockStatus::classify(
                    level.quantity_on_hand,
                    item.reorder_point,
                    item.maximum_stock,
                ),
            })
        })
        .collect();
    top_n_by(rows, TOP_N, |row| row.total_value)
}

fn recent_transactions(
    transactions: &[inventory_transaction::Model],
    catalog: &Catalog<'_>,
) -> Vec<WarehouseRecentTransaction> {
    most_recent(transactions.iter().collect::<Vec<_>>(), RECENT_LIMIT, |t| t.transaction_date)
        .into_iter()
        .map(|t| WarehouseRecentTransaction {
            transaction_id: t.id,
            transaction_type: if t.transaction_type.is_empty() {
                "Unknown".to_string()
            } else {
                t.transaction_type.clone()
            },
            item_name: catalog.item_name(t.item_id),
            quantity: t.quantity,
            transaction_date: t.transaction_date,
            reference: t.reference.clone(),
            performed_by: t.created_by.clone(),
        })
        .collect()
}

/// Up to five open tasks of each kind, soonest due first; tasks without a due date go last.
pub fn pending_tasks(snapshot: &WarehouseSnapshot) -> Vec<PendingWarehouseTask> {
    let put_aways = snapshot
        .put_away_tasks
        .iter()
        .filter(|t| is_pending_put_away(t))
        .take(TASKS_PER_KIND)
        .map(|t| PendingWarehouseTask {
            task_id: t.id,
            task_type: "Put Away".to_string(),
            description: format!(
                "Put away task #{}",
                reference_or_short_id(t.task_number.as_deref(), t.id)
            ),
            priority: t.priority.to_string(),
            created_date: t.created_at,
            due_date: None,
            status: t.status.clone(),
        });

    let picks = snapshot
        .pick_lists
        .iter()
        .filter(|p| is_pending_pick_list(p))
        .take(TASKS_PER_KIND)
        .map(|p| PendingWarehouseTask {
            task_id: p.id,
            task_type: "Pick List".to_string(),
            description: format!(
                "Pick list #{}",
                reference_or_short_id(p.pick_list_number.as_deref(), p.id)
            ),
            priority: p.priority.to_string(),
            created_date: p.created_at,
            due_date: p.expected_completion_date,
            status: p.status.clone(),
        });

    let counts = snapshot
        .cycle_counts
        .iter()
        .filter(|c| is_pending_cycle_count(c))
        .take(TASKS_PER_KIND)
        .map(|c| PendingWarehouseTask {
            task_id: c.id,
            task_type: "Cycle Count".to_string(),
            description: format!(
                "Cycle count #{}",
                reference_or_short_id(c.count_number.as_deref(), c.id)
            ),
            priority: "Normal".to_string(),
            created_date: c.created_at,
            due_date: c.scheduled_date,
            status: c.status.clone(),
        });

    let mut tasks: Vec<PendingWarehouseTask> = put_aways.chain(picks).chain(counts).collect();
    tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
    tasks.truncate(PENDING_TASK_LIMIT);
    tasks
}

pub fn monthly_comparison(
    transactions: &[inventory_transaction::Model],
    on_hand: i64,
    period: &ReportingPeriod,
) -> Vec<WarehouseMonthlyComparison> {
    month_buckets_labelled(period.today, COMPARISON_MONTHS, "%B")
        .into_iter()
        .map(|bucket| {
            let in_month: Vec<&inventory_transaction::Model> = transactions
                .iter()
                .filter(|t| bucket.contains(t.transaction_date.date_naive()))
                .collect();
            let inbound: Vec<_> = in_month.iter().filter(|t| t.is_inbound()).collect();
            let outbound: Vec<_> = in_month.iter().filter(|t| t.is_outbound()).collect();

            WarehouseMonthlyComparison {
                year: bucket.year(),
                inbound_count: inbound.len(),
                outbound_count: outbound.len(),
                inbound_value: inbound.iter().map(|t| t.total_cost).sum(),
                outbound_value: outbound.iter().map(|t| t.total_cost.abs()).sum(),
                utilization_percentage: None,
                turnover_rate: turnover(outbound_quantity(in_month.iter().copied()), on_hand),
                month: bucket.label,
            }
        })
        .collect()
}

fn alerts(snapshot: &WarehouseSnapshot, catalog: &Catalog<'_>, period: &ReportingPeriod) -> Vec<DashboardAlert> {
    let stocked: Vec<(&stock_level::Model, &item::Model)> = snapshot
        .stock_levels
        .iter()
        .filter_map(|s| catalog.item(s.item_id).map(|item| (s, item)))
        .collect();

    let low_stock = stocked
        .iter()
        .filter(|(s, item)| s.quantity_on_hand > 0 && s.quantity_on_hand <= item.reorder_point)
        .take(5)
        .map(|(s, item)| DashboardAlert {
            alert_type: "Low Stock".to_string(),
            severity: AlertSeverity::Warning,
            message: format!(
                "Low stock for {}: {} units remaining",
                item.name, s.quantity_on_hand
            ),
            created_at: period.now,
            related_id: Some(item.id),
            related_name: Some(item.name.clone()),
        });

    let out_of_stock = stocked
        .iter()
        .filter(|(s, _)| s.quantity_on_hand <= 0)
        .take(5)
        .map(|(_, item)| DashboardAlert {
            alert_type: "Out of Stock".to_string(),
            severity: AlertSeverity::Critical,
            message: format!("Out of stock: {}", item.name),
            created_at: period.now,
            related_id: Some(item.id),
            related_name: Some(item.name.clone()),
        });

    let overdue = snapshot
        .put_away_tasks
        .iter()
        .filter(|t| !is_closed_put_away(t) && period.is_overdue(t.created_at.date_naive()))
        .take(3)
        .map(|t| DashboardAlert {
            alert_type: "Overdue Task".to_string(),
            severity: AlertSeverity::Warning,
            message: format!(
                "Put away task overdue: #{}",
                reference_or_short_id(t.task_number.as_deref(), t.id)
            ),
            created_at: period.now,
            related_id: None,
            related_name: None,
        });

    low_stock.chain(out_of_stock).chain(overdue).take(ALERT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn warehouse() -> warehouse::Model {
        warehouse::Model {
            id: Uuid::new_v4(),
            name: "North".into(),
            code: "WH-N".into(),
            address: None,
            manager_name: None,
            manager_email: None,
            manager_phone: None,
            warehouse_type: None,
            is_active: true,
            total_capacity: Decimal::ZERO,
            used_capacity: Decimal::ZERO,
        }
    }

    fn item(name: &str, price: Decimal, category_id: Option<Uuid>) -> item::Model {
        item::Model {
            id: Uuid::new_v4(),
            name: name.into(),
            sku: None,
            image_url: None,
            category_id,
            unit_price: price,
            cost: price / dec!(2),
            reorder_point: 5,
            maximum_stock: 100,
            is_active: true,
            created_at: now(),
        }
    }

    fn stock(item: &item::Model, quantity: i32) -> stock_level::Model {
        stock_level::Model {
            id: Uuid::new_v4(),
            item_id: item.id,
            warehouse_id: Uuid::nil(),
            warehouse_location_id: None,
            quantity_on_hand: quantity,
            quantity_reserved: 0,
        }
    }

    fn txn(quantity: i32, cost: Decimal, at: DateTime<Utc>) -> inventory_transaction::Model {
        inventory_transaction::Model {
            id: Uuid::new_v4(),
            item_id: Uuid::nil(),
            warehouse_id: None,
            transaction_type: "Adjustment".into(),
            quantity,
            total_cost: cost,
            transaction_date: at,
            reference: None,
            created_by: None,
        }
    }

    fn empty_snapshot() -> WarehouseSnapshot {
        WarehouseSnapshot {
            warehouse: warehouse(),
            locations: vec![],
            stock_levels: vec![],
            transactions: vec![],
            put_away_tasks: vec![],
            pick_lists: vec![],
            cycle_counts: vec![],
            goods_receipts: vec![],
            items: vec![],
            categories: vec![],
        }
    }

    #[test]
    fn empty_warehouse_uses_fallbacks() {
        let period = ReportingPeriod::from_now(now());
        let dashboard = build(&empty_snapshot(), &period);

        assert_eq!(dashboard.capacity.utilization_percentage, Decimal::ZERO);
        assert_eq!(dashboard.capacity.location_utilization_percentage, Decimal::ZERO);
        assert_eq!(dashboard.operations.put_away_efficiency, dec!(100));
        assert_eq!(dashboard.operations.picking_accuracy, dec!(100));
        assert_eq!(dashboard.operations.cycle_count_accuracy, dec!(100));
        assert_eq!(dashboard.inventory.average_item_value, Decimal::ZERO);
        assert_eq!(dashboard.movements.average_daily_movements, Decimal::ZERO);
        assert_eq!(dashboard.inventory_value_trend.len(), TREND_MONTHS);
        assert!(dashboard.turnover_trend.iter().all(|p| p.value.is_zero()));
        assert_eq!(dashboard.monthly_performance.len(), COMPARISON_MONTHS);
        assert!(dashboard.inventory_by_category.is_empty());
        assert!(dashboard.alerts.is_empty());
    }

    #[test]
    fn current_month_net_and_outbound_totals() {
        let period = ReportingPeriod::from_now(now());
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let mut snapshot = empty_snapshot();
        snapshot.transactions = vec![
            txn(100, dec!(100), at),
            txn(-40, dec!(-40), at),
            txn(25, dec!(25), at),
        ];

        let dashboard = build(&snapshot, &period);

        let current = dashboard.inventory_value_trend.last().unwrap();
        assert_eq!(current.label, "Mar 2024");
        assert_eq!(current.value, dec!(85));

        let march = dashboard.monthly_performance.last().unwrap();
        assert_eq!(march.month, "March");
        assert_eq!(march.outbound_value, dec!(40));
        assert_eq!(march.inbound_value, dec!(125));
        assert_eq!(march.outbound_count, 1);
        assert_eq!(dashboard.receiving_trend.last().unwrap().value, dec!(2));
        assert_eq!(dashboard.shipping_trend.last().unwrap().value, dec!(1));
        assert_eq!(dashboard.movements.outbound_value_ytd, dec!(40));
    }

    #[test]
    fn category_shares_cover_all_stock() {
        let period = ReportingPeriod::from_now(now());
        let category = category::Model {
            id: Uuid::new_v4(),
            name: "Dairy".into(),
            code: None,
            description: None,
            image_url: None,
            is_active: true,
            sort_order: 0,
            parent_category_id: None,
            created_at: now(),
        };
        let milk = item("Milk", dec!(2), Some(category.id));
        let loose = item("Loose", dec!(1), None);

        let mut snapshot = empty_snapshot();
        snapshot.stock_levels = vec![stock(&milk, 30), stock(&loose, 40)];
        snapshot.items = vec![milk, loose];
        snapshot.categories = vec![category];

        let dashboard = build(&snapshot, &period);
        let shares: Vec<(String, Decimal)> = dashboard
            .inventory_by_category
            .iter()
            .map(|c| (c.category_name.clone(), c.percentage))
            .collect();
        assert_eq!(
            shares,
            vec![("Dairy".to_string(), dec!(60)), (UNCATEGORIZED.to_string(), dec!(40))]
        );
    }

    #[test]
    fn stock_alerts_and_status() {
        let period = ReportingPeriod::from_now(now());
        let low = item("Yogurt", dec!(1), None);
        let gone = item("Butter", dec!(3), None);
        let mut snapshot = empty_snapshot();
        snapshot.stock_levels = vec![stock(&low, 3), stock(&gone, 0)];
        snapshot.items = vec![low, gone];

        let dashboard = build(&snapshot, &period);
        assert_eq!(dashboard.inventory.low_stock_items, 1);
        assert_eq!(dashboard.inventory.out_of_stock_items, 1);
        let messages: Vec<&str> = dashboard.alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Low stock for Yogurt: 3 units remaining", "Out of stock: Butter"]
        );
        assert_eq!(dashboard.top_items[0].stock_status, StockStatus::LowStock);
    }

    #[test]
    fn pending_tasks_sort_undated_last() {
        let mut snapshot = empty_snapshot();
        let due = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        snapshot.put_away_tasks = vec![put_away_task::Model {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::nil(),
            task_number: Some("PA-1".into()),
            status: "Pending".into(),
            priority: 1,
            created_at: now(),
            completed_date: None,
        }];
        snapshot.cycle_counts = vec![cycle_count::Model {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::nil(),
            count_number: None,
            status: "Scheduled".into(),
            created_at: now(),
            scheduled_date: Some(due),
            completed_date: None,
        }];

        let tasks = pending_tasks(&snapshot);
        assert_eq!(tasks[0].task_type, "Cycle Count");
        assert_eq!(tasks[0].priority, "Normal");
        assert_eq!(tasks[1].description, "Put away task #PA-1");
    }
}
