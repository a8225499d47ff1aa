use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

/// Signed stock movement. Positive quantities are inbound, negative outbound.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub transaction_type: String,
    pub quantity: i32,
    pub total_cost: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "InventoryTransaction";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Item => Some(self.item_id),
            ForeignKey::Warehouse => self.warehouse_id,
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
            ForeignKey::Item => Some(Column::ItemId),
            ForeignKey::Warehouse => Some(Column::WarehouseId),
            _ => None,
        }
    }
}

impl Model {
    pub fn is_inbound(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_outbound(&self) -> bool {
        self.quantity < 0
    }
}
