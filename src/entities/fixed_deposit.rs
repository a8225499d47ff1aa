use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum FixedDepositStatus {
    Pending,
    Active,
    Matured,
    PrematurelyClosed,
    Renewed,
}

/// Term deposit held by a member.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fixed_deposits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub certificate_number: String,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub interest_earned: Decimal,
    pub deposit_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub status: String,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<FixedDepositStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: FixedDepositStatus) -> bool {
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
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "FixedDeposit";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Member => Some(self.member_id),
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
            _ => None,
        }
    }
}

impl Model {
    pub fn maturity_value(&self) -> Decimal {
        self.principal_amount + self.interest_earned
    }
}
