//! Pure dashboard builders.
//!
//! Each submodule turns a snapshot of already fetched records into a response
//! value. Nothing in here performs I/O or reads the clock; the service layer
//! supplies the records and a [`period::ReportingPeriod`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod category;
pub mod math;
pub mod member;
pub mod period;
pub mod ranking;
pub mod supplier;
pub mod trends;
pub mod warehouse;

pub use period::{MonthBucket, ReportingPeriod};
pub use trends::TimeSeriesPoint;

/// Length of the trailing trend series.
pub const TREND_MONTHS: usize = 12;
/// Length of the month-over-month comparison tables.
pub const COMPARISON_MONTHS: usize = 6;
pub const TOP_N: usize = 10;
pub const RECENT_LIMIT: usize = 10;
pub const ALERT_LIMIT: usize = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DashboardKind {
    Warehouse,
    Supplier,
    Category,
    Member,
}

impl DashboardKind {
    /// Cache key for a subject, e.g. `warehouse-dashboard:<uuid>`.
    pub fn cache_key(&self, id: Uuid) -> String {
        format!("{}-dashboard:{}", self, id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum StockStatus {
    #[strum(serialize = "Out of Stock")]
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[strum(serialize = "Low Stock")]
    #[serde(rename = "Low Stock")]
    LowStock,
    Overstock,
    Healthy,
}

impl StockStatus {
    pub fn classify(quantity: i32, reorder_point: i32, maximum_stock: i32) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_point {
            StockStatus::LowStock
        } else if quantity > maximum_stock {
            StockStatus::Overstock
        } else {
            StockStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardAlert {
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub related_id: Option<Uuid>,
    pub related_name: Option<String>,
}

/// Display reference: the business number when present, else the first 8 chars of the id.
pub(crate) fn reference_or_short_id(number: Option<&str>, id: Uuid) -> String {
    match number {
        Some(number) if !number.is_empty() => number.to_string(),
        _ => id.simple().to_string()[..8].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cache_keys_are_namespaced_by_kind() {
        let id = Uuid::nil();
        assert_eq!(
            DashboardKind::Warehouse.cache_key(id),
            "warehouse-dashboard:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(DashboardKind::from_str("member").unwrap(), DashboardKind::Member);
    }

    #[test]
    fn stock_status_thresholds() {
        assert_eq!(StockStatus::classify(0, 5, 100), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(5, 5, 100), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(101, 5, 100), StockStatus::Overstock);
        assert_eq!(StockStatus::classify(50, 5, 100), StockStatus::Healthy);
        assert_eq!(StockStatus::LowStock.to_string(), "Low Stock");
    }

    #[test]
    fn references_fall_back_to_short_id() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(reference_or_short_id(Some("PA-7"), id), "PA-7");
        assert_eq!(reference_or_short_id(None, id), "a1b2c3d4");
    }
}
