use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum LoanStatus {
    #[strum(serialize = "PENDING")]
    Pending,
    #[strum(serialize = "APPROVED")]
    Approved,
    #[strum(serialize = "DISBURSED")]
    Disbursed,
    #[strum(serialize = "CLOSED")]
    Closed,
    #[strum(serialize = "WRITTEN_OFF")]
    WrittenOff,
    #[strum(serialize = "REJECTED")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub loan_product_id: Option<Uuid>,
    pub loan_number: String,
    pub principal_amount: Decimal,
    pub outstanding_principal: Decimal,
    pub outstanding_interest: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub disbursement_date: Option<NaiveDate>,
    pub expected_end_date: Option<NaiveDate>,
    pub status: String,
}

impl Model {
    /// Parsed status; `None` for values this service does not recognise.
    pub fn status(&self) -> Option<LoanStatus> {
        self.status.parse().ok()
    }

    pub fn is(&self, status: LoanStatus) -> bool {
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
        belongs_to = "super::loan_product::Entity",
        from = "Column::LoanProductId",
        to = "super::loan_product::Column::Id"
    )]
    LoanProduct,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::loan_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "Loan";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::Member => Some(self.member_id),
            ForeignKey::LoanProduct => self.loan_product_id,
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
            ForeignKey::LoanProduct => Some(Column::LoanProductId),
            _ => None,
        }
    }
}

impl Model {
    pub fn total_outstanding(&self) -> Decimal {
        self.outstanding_principal + self.outstanding_interest
    }
}
