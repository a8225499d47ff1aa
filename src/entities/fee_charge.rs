use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum FeeChargeStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Waived,
    Reversed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_charges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub fee_definition_id: Option<Uuid>,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub charge_date: NaiveDate,
    pub status: String,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<FeeChargeStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: FeeChargeStatus) -> bool {
        self.status() == Some(status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id"
    )]
    Member,
    #[sea_orm(
        belongs_to = "super::fee_definition::Entity",
        from = "Column::FeeDefinitionId",
        to = "super::fee_definition::Column::Id"
    )]
    FeeDefinition,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::fee_definition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeDefinition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "FeeCharge";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Member => Some(self.member_id),
            ForeignKey::FeeDefinition => self.fee_definition_id,
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
            ForeignKey::Member => Some(Column::MemberId),
            ForeignKey::FeeDefinition => Some(Column::FeeDefinitionId),
            _ => None,
        }
    }
}
