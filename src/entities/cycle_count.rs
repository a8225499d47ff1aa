use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum CycleCountStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cycle_counts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub count_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<CycleCountStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: CycleCountStatus) -> bool {
        self.status() == Some(status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "CycleCount";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Warehouse => Some(self.warehouse_id),
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
            _ => None,
        }
    }
}
