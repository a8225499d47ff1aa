use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::repositories::{ForeignKey, ForeignKeyColumns, Record};

/// Product category; categories nest through `parent_category_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub parent_category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::ParentCategoryId",
        to = "super::category::Column::Id"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    const KIND: &'static str = "Category";

    fn id(&self) -> Uuid {
        self.id
    }

    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
        match key {
            ForeignKey::ParentCategory => self.parent_category_id,
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
            ForeignKey::ParentCategory => Some(Column::ParentCategoryId),
            _ => None,
        }
    }
}
