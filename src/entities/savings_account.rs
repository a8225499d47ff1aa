use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum SavingsAccountStatus {
    Pending,
    Active,
    Dormant,
    Closed,
    Frozen,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub savings_product_id: Option<Uuid>,
    pub account_number: String,
    pub balance: Decimal,
    pub opened_date: NaiveDate,
    pub status: String,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<SavingsAccountStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: SavingsAccountStatus) -> bool {
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
        belongs_to = "super::savings_product::Entity",
        from = "Column::SavingsProductId",
        to = "super::savings_product::Column::Id"
    )]
    SavingsProduct,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::savings_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "SavingsAccount";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Member => Some(self.member_id),
            ForeignKey::SavingsProduct => self.savings_product_id,
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
            ForeignKey::SavingsProduct => Some(Column::SavingsProductId),
            _ => None,
        }
    }
}
