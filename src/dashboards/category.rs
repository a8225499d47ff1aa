//! Category dashboard: item catalogue, stock and sales rolled up over a category subtree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

use super::math::{self, qty};
use super::period::{month_buckets, month_buckets_labelled, ReportingPeriod};
use super::ranking::{group_by, most_recent, share_of_total, top_n_by};
use super::trends::{flat_series, monthly_sum, TimeSeriesPoint};
use super::{
    AlertSeverity, DashboardAlert, StockStatus, ALERT_LIMIT, COMPARISON_MONTHS, RECENT_LIMIT,
    TOP_N, TREND_MONTHS,
};
use crate::entities::{
    category, inventory_transaction, item, item_supplier, purchase_order, purchase_order_item,
    stock_level, supplier, warehouse,
};

const SUBCATEGORY_LIMIT: usize = 5;
const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub category: category::Model,
    pub parent: Option<category::Model>,
    /// Direct children only.
    pub subcategories: Vec<category::Model>,
    /// Items of the category and every descendant.
    pub items: Vec<item::Model>,
    pub stock_levels: Vec<stock_level::Model>,
    pub transactions: Vec<inventory_transaction::Model>,
    pub purchase_order_items: Vec<purchase_order_item::Model>,
    pub purchase_orders: Vec<purchase_order::Model>,
    pub item_suppliers: Vec<item_supplier::Model>,
    pub suppliers: Vec<supplier::Model>,
    pub warehouses: Vec<warehouse::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDashboard {
    pub category_id: Uuid,
    pub category_name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub parent_category_id: Option<Uuid>,
    pub parent_category_name: Option<String>,
    pub items: ItemMetrics,
    pub inventory: CategoryInventoryMetrics,
    pub sales: CategorySalesMetrics,
    pub purchases: CategoryPurchaseMetrics,
    pub subcategories: SubcategorySummary,
    pub sales_trend: Vec<TimeSeriesPoint>,
    pub inventory_trend: Vec<TimeSeriesPoint>,
    pub purchase_trend: Vec<TimeSeriesPoint>,
    pub top_items_by_sales: Vec<TopCategoryItem>,
    pub top_items_by_inventory_value: Vec<TopCategoryItem>,
    pub supplier_breakdown: Vec<SupplierDistribution>,
    pub warehouse_breakdown: Vec<WarehouseDistribution>,
    pub recent_transactions: Vec<CategoryRecentTransaction>,
    pub monthly_performance: Vec<CategoryMonthlyComparison>,
    pub alerts: Vec<DashboardAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemMetrics {
    pub total_items: usize,
    pub active_items: usize,
    pub inactive_items: usize,
    pub new_items_this_month: usize,
    pub average_unit_price: Decimal,
    pub average_cost: Decimal,
    pub average_margin: Decimal,
    pub highest_price: Decimal,
    pub lowest_price: Decimal,
    pub best_selling_item: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryInventoryMetrics {
    pub total_quantity_on_hand: i64,
    pub total_quantity_available: i64,
    pub total_quantity_reserved: i64,
    pub total_inventory_value: Decimal,
    pub total_inventory_cost: Decimal,
    pub items_in_stock: usize,
    pub items_low_stock: usize,
    pub items_out_of_stock: usize,
    pub items_overstock: usize,
    pub inventory_turnover: Decimal,
    pub average_days_of_supply: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategorySalesMetrics {
    pub total_sales_value: Decimal,
    pub total_sales_value_ytd: Decimal,
    pub total_sales_value_last_year: Decimal,
    pub total_units_sold: i64,
    pub total_units_sold_ytd: i64,
    pub transaction_count: usize,
    pub average_sale_value: Decimal,
    pub sales_growth_percentage: Decimal,
    /// Not tracked: outbound movements carry cost only.
    pub margin_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryPurchaseMetrics {
    pub total_purchase_value: Decimal,
    pub total_purchase_value_ytd: Decimal,
    pub total_units_ordered: i64,
    pub total_units_ordered_ytd: i64,
    pub purchase_order_count: usize,
    pub average_purchase_value: Decimal,
    pub unique_suppliers: usize,
    pub average_lead_time_days: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubcategorySummary {
    pub total_subcategories: usize,
    pub active_subcategories: usize,
    pub top_subcategories: Vec<SubcategoryInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubcategoryInfo {
    pub category_id: Uuid,
    pub category_name: String,
    pub item_count: usize,
    pub inventory_value: Decimal,
    pub sales_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopCategoryItem {
    pub item_id: Uuid,
    pub item_name: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub total_sales: Decimal,
    pub units_sold: i64,
    pub quantity_on_hand: i64,
    pub inventory_value: Decimal,
    pub stock_status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierDistribution {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub item_count: usize,
    pub total_purchase_value: Decimal,
    /// Share of the category's supplier links.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WarehouseDistribution {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity_on_hand: i64,
    pub inventory_value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryRecentTransaction {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub item_name: String,
    pub quantity: i32,
    pub value: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub warehouse_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryMonthlyComparison {
    pub month: String,
    pub year: i32,
    pub sales_value: Decimal,
    pub units_sold: i64,
    pub purchase_value: Decimal,
    pub units_ordered: i64,
    /// Current stock value; history is not kept.
    pub inventory_value: Decimal,
    pub margin_percentage: Option<Decimal>,
}

struct Lookup<'a> {
    items: HashMap<Uuid, &'a item::Model>,
    warehouses: HashMap<Uuid, &'a warehouse::Model>,
    suppliers: HashMap<Uuid, &'a supplier::Model>,
    orders: HashMap<Uuid, &'a purchase_order::Model>,
}

impl<'a> Lookup<'a> {
    fn new(snapshot: &'a CategorySnapshot) -> Self {
        Self {
            items: snapshot.items.iter().map(|i| (i.id, i)).collect(),
            warehouses: snapshot.warehouses.iter().map(|w| (w.id, w)).collect(),
            suppliers: snapshot.suppliers.iter().map(|s| (s.id, s)).collect(),
            orders: snapshot.purchase_orders.iter().map(|o| (o.id, o)).collect(),
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
}

fn sale_value(t: &inventory_transaction::Model) -> Decimal {
    t.total_cost.abs()
}

fn units(t: &inventory_transaction::Model) -> i64 {
    i64::from(t.quantity).abs()
}

fn sales(transactions: &[inventory_transaction::Model]) -> Vec<&inventory_transaction::Model> {
    transactions.iter().filter(|t| t.is_outbound()).collect()
}

/// Stock status for an aggregated quantity; unknown items are only ever out of stock or healthy.
fn stock_status(quantity: i64, item: Option<&item::Model>) -> StockStatus {
    let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
    match item {
        Some(item) => StockStatus::classify(quantity, item.reorder_point, item.maximum_stock),
        None if quantity <= 0 => StockStatus::OutOfStock,
        None => StockStatus::Healthy,
    }
}

pub fn build(snapshot: &CategorySnapshot, period: &ReportingPeriod) -> CategoryDashboard {
    let lookup = Lookup::new(snapshot);
    let category = &snapshot.category;
    let trend = month_buckets(period.today, TREND_MONTHS);
    let inventory_value: Decimal = snapshot
        .stock_levels
        .iter()
        .map(|s| lookup.stock_value(s))
        .sum();

    CategoryDashboard {
        category_id: category.id,
        category_name: category.name.clone(),
        code: category.code.clone(),
        description: category.description.clone(),
        image_url: category.image_url.clone(),
        is_active: category.is_active,
        sort_order: category.sort_order,
        parent_category_id: category.parent_category_id,
        parent_category_name: snapshot.parent.as_ref().map(|p| p.name.clone()),
        items: item_metrics(&snapshot.items, &snapshot.transactions, period),
        inventory: inventory_metrics(&snapshot.stock_levels, &snapshot.transactions, &lookup),
        sales: sales_metrics(&snapshot.transactions, period),
        purchases: purchase_metrics(&snapshot.purchase_order_items, &snapshot.item_suppliers, period),
        subcategories: subcategory_summary(snapshot, &lookup),
        sales_trend: monthly_sum(
            &sales(&snapshot.transactions),
            &trend,
            |t| Some(t.transaction_date.date_naive()),
            |t| sale_value(t),
        ),
        inventory_trend: flat_series(&trend, inventory_value),
        purchase_trend: monthly_sum(
            &snapshot.purchase_order_items,
            &trend,
            |p| Some(p.created_at.date_naive()),
            |p| p.total_price,
        ),
        top_items_by_sales: top_items_by_sales(snapshot, &lookup),
        top_items_by_inventory_value: top_items_by_inventory(&snapshot.stock_levels, &lookup),
        supplier_breakdown: supplier_distribution(snapshot, &lookup),
        warehouse_breakdown: warehouse_distribution(&snapshot.stock_levels, &lookup),
        recent_transactions: recent_transactions(&snapshot.transactions, &lookup),
        monthly_performance: monthly_performance(snapshot, inventory_value, period),
        alerts: alerts(&snapshot.stock_levels, &lookup, period),
    }
}

pub fn item_metrics(
    items: &[item::Model],
    transactions: &[inventory_transaction::Model],
    period: &ReportingPeriod,
) -> ItemMetrics {
    let prices: Vec<Decimal> = items
        .iter()
        .map(|i| i.unit_price)
        .filter(|p| *p > Decimal::ZERO)
        .collect();
    let costs = items.iter().map(|i| i.cost).filter(|c| *c > Decimal::ZERO);

    let average_unit_price = math::average(prices.iter().copied(), Decimal::ZERO);
    let average_cost = math::average(costs, Decimal::ZERO);

    let units_by_item = group_by(
        transactions.iter().filter(|t| t.is_outbound()),
        |t| t.item_id,
        |units_sold: &mut i64, t| *units_sold += units(t),
    );
    let best_selling_item = top_n_by(units_by_item, 1, |(_, sold)| Decimal::from(*sold))
        .first()
        .and_then(|(item_id, _)| items.iter().find(|i| i.id == *item_id))
        .map(|i| i.name.clone());

    let active = items.iter().filter(|i| i.is_active).count();

    ItemMetrics {
        total_items: items.len(),
        active_items: active,
        inactive_items: items.len() - active,
        new_items_this_month: items
            .iter()
            .filter(|i| i.created_at.date_naive() >= period.start_of_month)
            .count(),
        average_unit_price,
        average_cost,
        average_margin: math::percentage(
            average_unit_price - average_cost,
            average_unit_price,
            Decimal::ZERO,
        ),
        highest_price: prices.iter().copied().max().unwrap_or_default(),
        lowest_price: prices.iter().copied().min().unwrap_or_default(),
        best_selling_item,
    }
}

fn inventory_metrics(
    stock_levels: &[stock_level::Model],
    transactions: &[inventory_transaction::Model],
    lookup: &Lookup<'_>,
) -> CategoryInventoryMetrics {
    let on_hand: i64 = stock_levels.iter().map(|s| i64::from(s.quantity_on_hand)).sum();
    let reserved: i64 = stock_levels.iter().map(|s| i64::from(s.quantity_reserved)).sum();

    let in_stock: HashSet<Uuid> = stock_levels
        .iter()
        .filter(|s| s.quantity_on_hand > 0)
        .map(|s| s.item_id)
        .collect();
    let with_item = || {
        stock_levels
            .iter()
            .filter_map(|s| lookup.item(s.item_id).map(|item| (s, item)))
    };

    let sold: i64 = transactions
        .iter()
        .filter(|t| t.is_outbound())
        .map(units)
        .sum();
    let stock_base = on_hand.max(1);
    let turnover = Decimal::from(sold) / Decimal::from(stock_base);
    // 365 / turnover, truncated; kept in integers so the unrounded ratio is used
    let days_of_supply = if sold > 0 {
        DAYS_PER_YEAR * stock_base / sold
    } else {
        0
    };

    CategoryInventoryMetrics {
        total_quantity_on_hand: on_hand,
        total_quantity_available: on_hand - reserved,
        total_quantity_reserved: reserved,
        total_inventory_value: stock_levels.iter().map(|s| lookup.stock_value(s)).sum(),
        total_inventory_cost: stock_levels.iter().map(|s| lookup.stock_cost(s)).sum(),
        items_in_stock: in_stock.len(),
        items_low_stock: with_item()
            .filter(|(s, item)| s.quantity_on_hand > 0 && s.quantity_on_hand <= item.reorder_point)
            .count(),
        items_out_of_stock: stock_levels.iter().filter(|s| s.quantity_on_hand <= 0).count(),
        items_overstock: with_item()
            .filter(|(s, item)| s.quantity_on_hand > item.maximum_stock)
            .count(),
        inventory_turnover: math::round2(turnover),
        average_days_of_supply: days_of_supply,
    }
}

pub fn sales_metrics(
    transactions: &[inventory_transaction::Model],
    period: &ReportingPeriod,
) -> CategorySalesMetrics {
    let sales = sales(transactions);
    let ytd: Vec<&inventory_transaction::Model> = sales
        .iter()
        .copied()
        .filter(|t| period.is_year_to_date(t.transaction_date.date_naive()))
        .collect();

    let total: Decimal = sales.iter().map(|t| sale_value(t)).sum();
    let total_ytd: Decimal = ytd.iter().map(|t| sale_value(t)).sum();
    let total_last_year: Decimal = sales
        .iter()
        .filter(|t| period.is_last_year(t.transaction_date.date_naive()))
        .map(|t| sale_value(t))
        .sum();

    CategorySalesMetrics {
        total_sales_value: total,
        total_sales_value_ytd: total_ytd,
        total_sales_value_last_year: total_last_year,
        total_units_sold: sales.iter().map(|t| units(t)).sum(),
        total_units_sold_ytd: ytd.iter().map(|t| units(t)).sum(),
        transaction_count: sales.len(),
        average_sale_value: math::ratio(total, Decimal::from(sales.len()), Decimal::ZERO),
        sales_growth_percentage: math::growth(total_ytd, total_last_year),
        margin_percentage: None,
    }
}

fn purchase_metrics(
    lines: &[purchase_order_item::Model],
    item_suppliers: &[item_supplier::Model],
    period: &ReportingPeriod,
) -> CategoryPurchaseMetrics {
    let is_ytd = |line: &&purchase_order_item::Model| period.is_year_to_date(line.created_at.date_naive());
    let total = math::sum_by(lines, |l| l.total_price);

    CategoryPurchaseMetrics {
        total_purchase_value: total,
        total_purchase_value_ytd: lines.iter().filter(is_ytd).map(|l| l.total_price).sum(),
        total_units_ordered: lines.iter().map(|l| i64::from(l.quantity)).sum(),
        total_units_ordered_ytd: lines
            .iter()
            .filter(is_ytd)
            .map(|l| i64::from(l.quantity))
            .sum(),
        purchase_order_count: lines
            .iter()
            .map(|l| l.purchase_order_id)
            .collect::<HashSet<_>>()
            .len(),
        average_purchase_value: math::ratio(total, Decimal::from(lines.len()), Decimal::ZERO),
        unique_suppliers: item_suppliers
            .iter()
            .map(|s| s.supplier_id)
            .collect::<HashSet<_>>()
            .len(),
        average_lead_time_days: math::average(
            item_suppliers
                .iter()
                .filter(|s| s.lead_time_days > 0)
                .map(|s| Decimal::from(s.lead_time_days)),
            Decimal::ZERO,
        ),
    }
}

/// The first few active direct children, richest inventory first.
fn subcategory_summary(snapshot: &CategorySnapshot, lookup: &Lookup<'_>) -> SubcategorySummary {
    let active: Vec<&category::Model> = snapshot.subcategories.iter().filter(|c| c.is_active).collect();

    let rows: Vec<SubcategoryInfo> = active
        .iter()
        .take(SUBCATEGORY_LIMIT)
        .map(|sub| {
            let item_ids: HashSet<Uuid> = snapshot
                .items
                .iter()
                .filter(|i| i.category_id == Some(sub.id))
                .map(|i| i.id)
                .collect();
            SubcategoryInfo {
                category_id: sub.id,
                category_name: sub.name.clone(),
                item_count: item_ids.len(),
                inventory_value: snapshot
                    .stock_levels
                    .iter()
                    .filter(|s| item_ids.contains(&s.item_id))
                    .map(|s| lookup.stock_value(s))
                    .sum(),
                sales_value: snapshot
                    .transactions
                    .iter()
                    .filter(|t| t.is_outbound() && item_ids.contains(&t.item_id))
                    .map(sale_value)
                    .sum(),
            }
        })
        .collect();

    SubcategorySummary {
        total_subcategories: snapshot.subcategories.len(),
        active_subcategories: active.len(),
        top_subcategories: top_n_by(rows, SUBCATEGORY_LIMIT, |row| row.inventory_value),
    }
}

fn on_hand_for(stock_levels: &[stock_level::Model], item_id: Uuid) -> i64 {
    stock_levels
        .iter()
        .filter(|s| s.item_id == item_id)
        .map(|s| i64::from(s.quantity_on_hand))
        .sum()
}

fn top_item(
    item_id: Uuid,
    item: Option<&item::Model>,
    quantity_on_hand: i64,
    total_sales: Decimal,
    units_sold: i64,
) -> TopCategoryItem {
    let unit_price = item.map(|i| i.unit_price).unwrap_or_default();
    TopCategoryItem {
        item_id,
        item_name: item
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        sku: item.and_then(|i| i.sku.clone()),
        image_url: item.and_then(|i| i.image_url.clone()),
        unit_price,
        total_sales,
        units_sold,
        quantity_on_hand,
        inventory_value: Decimal::from(quantity_on_hand) * unit_price,
        stock_status: stock_status(quantity_on_hand, item),
    }
}

fn top_items_by_sales(snapshot: &CategorySnapshot, lookup: &Lookup<'_>) -> Vec<TopCategoryItem> {
    let totals = group_by(
        snapshot.transactions.iter().filter(|t| t.is_outbound()),
        |t| t.item_id,
        |acc: &mut (Decimal, i64), t| {
            acc.0 += sale_value(t);
            acc.1 += units(t);
        },
    );

    top_n_by(totals, TOP_N, |(_, (value, _))| *value)
        .into_iter()
        .map(|(item_id, (value, sold))| {
            top_item(
                item_id,
                lookup.item(item_id),
                on_hand_for(&snapshot.stock_levels, item_id),
                value,
                sold,
            )
        })
        .collect()
}

fn top_items_by_inventory(stock_levels: &[stock_level::Model], lookup: &Lookup<'_>) -> Vec<TopCategoryItem> {
    let rows: Vec<TopCategoryItem> = group_by(
        stock_levels,
        |s| s.item_id,
        |on_hand: &mut i64, s| *on_hand += i64::from(s.quantity_on_hand),
    )
    .into_iter()
    .map(|(item_id, on_hand)| top_item(item_id, lookup.item(item_id), on_hand, Decimal::ZERO, 0))
    .collect();

    top_n_by(rows, TOP_N, |row| row.inventory_value)
}

fn supplier_distribution(snapshot: &CategorySnapshot, lookup: &Lookup<'_>) -> Vec<SupplierDistribution> {
    let links = group_by(
        snapshot
            .item_suppliers
            .iter()
            .filter(|l| lookup.suppliers.contains_key(&l.supplier_id)),
        |l| l.supplier_id,
        |count: &mut usize, _| *count += 1,
    );
    let total_links: usize = links.iter().map(|(_, count)| *count).sum();

    let mut spend: HashMap<Uuid, Decimal> = HashMap::new();
    for line in &snapshot.purchase_order_items {
        if let Some(order) = lookup.orders.get(&line.purchase_order_id) {
            *spend.entry(order.supplier_id).or_default() += line.total_price;
        }
    }

    let rows: Vec<SupplierDistribution> = links
        .into_iter()
        .filter_map(|(supplier_id, item_count)| {
            lookup.suppliers.get(&supplier_id).map(|s| SupplierDistribution {
                supplier_id,
                supplier_name: s.name.clone(),
                item_count,
                total_purchase_value: spend.get(&supplier_id).copied().unwrap_or_default(),
                percentage: math::count_percentage(item_count, total_links, Decimal::ZERO),
            })
        })
        .collect();

    top_n_by(rows, TOP_N, |row| Decimal::from(row.item_count))
}

/// Stock value per known warehouse; shares are taken against the value held in those warehouses.
fn warehouse_distribution(
    stock_levels: &[stock_level::Model],
    lookup: &Lookup<'_>,
) -> Vec<WarehouseDistribution> {
    let groups = group_by(
        stock_levels
            .iter()
            .filter(|s| lookup.warehouses.contains_key(&s.warehouse_id)),
        |s| s.warehouse_id,
        |acc: &mut (i64, Decimal), s| {
            acc.0 += i64::from(s.quantity_on_hand);
            acc.1 += lookup.stock_value(s);
        },
    );
    let total: Decimal = groups.iter().map(|(_, (_, value))| *value).sum();

    let rows: Vec<WarehouseDistribution> = groups
        .into_iter()
        .filter_map(|(warehouse_id, (on_hand, value))| {
            lookup.warehouses.get(&warehouse_id).map(|w| WarehouseDistribution {
                warehouse_id,
                warehouse_name: w.name.clone(),
                quantity_on_hand: on_hand,
                inventory_value: value,
                percentage: share_of_total(value, total),
            })
        })
        .collect();

    top_n_by(rows, TOP_N, |row| row.inventory_value)
}

fn recent_transactions(
    transactions: &[inventory_transaction::Model],
    lookup: &Lookup<'_>,
) -> Vec<CategoryRecentTransaction> {
    most_recent(transactions.iter().collect::<Vec<_>>(), RECENT_LIMIT, |t| t.transaction_date)
        .into_iter()
        .map(|t| CategoryRecentTransaction {
            transaction_id: t.id,
            transaction_type: if t.transaction_type.is_empty() {
                "Unknown".to_string()
            } else {
                t.transaction_type.clone()
            },
            item_name: lookup
                .item(t.item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            quantity: t.quantity,
            value: t.total_cost,
            transaction_date: t.transaction_date,
            warehouse_name: t
                .warehouse_id
                .and_then(|id| lookup.warehouses.get(&id))
                .map(|w| w.name.clone()),
        })
        .collect()
}

fn monthly_performance(
    snapshot: &CategorySnapshot,
    inventory_value: Decimal,
    period: &ReportingPeriod,
) -> Vec<CategoryMonthlyComparison> {
    let sales = sales(&snapshot.transactions);

    month_buckets_labelled(period.today, COMPARISON_MONTHS, "%B")
        .into_iter()
        .map(|bucket| {
            let month_sales: Vec<&&inventory_transaction::Model> = sales
                .iter()
                .filter(|t| bucket.contains(t.transaction_date.date_naive()))
                .collect();
            let month_purchases: Vec<&purchase_order_item::Model> = snapshot
                .purchase_order_items
                .iter()
                .filter(|p| bucket.contains(p.created_at.date_naive()))
                .collect();

            CategoryMonthlyComparison {
                year: bucket.year(),
                sales_value: month_sales.iter().map(|t| sale_value(t)).sum(),
                units_sold: month_sales.iter().map(|t| units(t)).sum(),
                purchase_value: month_purchases.iter().map(|p| p.total_price).sum(),
                units_ordered: month_purchases.iter().map(|p| i64::from(p.quantity)).sum(),
                inventory_value,
                margin_percentage: None,
                month: bucket.label,
            }
        })
        .collect()
}

fn alerts(
    stock_levels: &[stock_level::Model],
    lookup: &Lookup<'_>,
    period: &ReportingPeriod,
) -> Vec<DashboardAlert> {
    let stocked: Vec<(&stock_level::Model, &item::Model)> = stock_levels
        .iter()
        .filter_map(|s| lookup.item(s.item_id).map(|item| (s, item)))
        .collect();

    let low_stock = stocked
        .iter()
        .filter(|(s, item)| s.quantity_on_hand > 0 && s.quantity_on_hand <= item.reorder_point)
        .take(5)
        .map(|(s, item)| DashboardAlert {
            alert_type: "Low Stock".to_string(),
            severity: AlertSeverity::Warning,
            message: format!("Low stock for {}: {} units", item.name, s.quantity_on_hand),
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

    low_stock.chain(out_of_stock).take(ALERT_LIMIT).collect()
}
