use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum GoodsReceiptStatus {
    Pending,
    Received,
    Completed,
    Cancelled,
}

/// Receipt of goods against a purchase order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "goods_receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub receipt_number: Option<String>,
    pub status: String,
    pub received_date: DateTime<Utc>,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<GoodsReceiptStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: GoodsReceiptStatus) -> bool {
        self.status() == Some(status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "GoodsReceipt";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Warehouse => self.warehouse_id,
            ForeignKey::PurchaseOrder => self.purchase_order_id,
            _ => None,
        }
    }
}

impl ForeignKeyColumns for Entity {
    fn id_column() -> Column {
        Column::Id
    }

    fn foreign_key_column(key: ForeignKey) -> Option<Column> {
        match key {
            ForeignKey::Warehouse => Some(Column::WarehouseId),
            ForeignKey::PurchaseOrder => Some(Column::PurchaseOrderId),
            _ => None,
        }
    }
}
