use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_definitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "FeeDefinition";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, _key: ForeignKey) -> Option<Uuid> {
        None
    }
}

impl ForeignKeyColumns for Entity {
    fn id_column() -> Column {
        Column::Id
    }

    fn foreign_key_column(_key: ForeignKey) -> Option<Column> {
        None
    }
}
