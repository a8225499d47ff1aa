use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum SavingsTransactionType {
    Deposit,
    Withdrawal,
    Interest,
    Fee,
    Transfer,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub savings_account_id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
}

impl Model {
    pub fn kind(&self) -> Option<SavingsTransactionType> {
        self.transaction_type.parse().ok()
    }

    pub fn is(&self, kind: SavingsTransactionType) -> bool {
        self.kind() == Some(kind)
    }

    /// Deposits and interest postings credit the account; everything else debits it.
    pub fn is_credit(&self) -> bool {
        matches!(
            self.kind(),
            Some(SavingsTransactionType::Deposit | SavingsTransactionType::Interest)
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::savings_account::Entity",
        from = "Column::SavingsAccountId",
        to = "super::savings_account::Column::Id"
    )]
    SavingsAccount,
}

impl Related<super::savings_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "SavingsTransaction";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::SavingsAccount => Some(self.savings_account_id),
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
            ForeignKey::SavingsAccount => Some(Column::SavingsAccountId),
            _ => None,
        }
    }
}
