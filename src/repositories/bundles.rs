//! Named sets of repositories, one per bounded context, so services take a
//! single argument instead of a dozen.

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::{InMemoryRepository, Repo, SeaOrmRepository};
use crate::errors::ServiceError;
use crate::entities::{
    category, cycle_count, fee_charge, fee_definition, fixed_deposit, goods_receipt,
    goods_receipt_item, inventory_transaction, item, item_supplier, loan, loan_product,
    loan_repayment, loan_schedule, member, pick_list, purchase_order, purchase_order_item,
    put_away_task, savings_account, savings_product, savings_transaction, share_account,
    stock_level, supplier, warehouse, warehouse_location,
};

/// Declares a repository bundle plus the serialisable snapshot that can back it in memory.
macro_rules! repository_bundle {
    ($(#[$meta:meta])* $bundle:ident, $snapshot:ident { $($field:ident: $entity:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $bundle {
            $(pub $field: Repo<$entity::Model>,)+
        }

        /// Every record of the bundle, as loaded from a fixture file.
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $snapshot {
            $(pub $field: Vec<$entity::Model>,)+
        }

        impl $bundle {
            pub fn sea_orm(db: Arc<DatabaseConnection>) -> Self {
                Self {
                    $($field: Arc::new(SeaOrmRepository::<$entity::Entity>::new(db.clone())),)+
                }
            }

            pub fn in_memory(snapshot: $snapshot) -> Self {
                Self {
                    $($field: Arc::new(InMemoryRepository::new(snapshot.$field)),)+
                }
            }
        }
    };
}

repository_bundle!(
    /// Inventory, warehousing and purchasing records.
    StoreRepositories,
    StoreSnapshot {
        categories: category,
        items: item,
        warehouses: warehouse,
        warehouse_locations: warehouse_location,
        stock_levels: stock_level,
        inventory_transactions: inventory_transaction,
        put_away_tasks: put_away_task,
        pick_lists: pick_list,
        cycle_counts: cycle_count,
        goods_receipts: goods_receipt,
        goods_receipt_items: goods_receipt_item,
        suppliers: supplier,
        item_suppliers: item_supplier,
        purchase_orders: purchase_order,
        purchase_order_items: purchase_order_item,
    }
);

repository_bundle!(
    /// Member accounts and their loan, savings, share, deposit and fee records.
    MicrofinanceRepositories,
    MicrofinanceSnapshot {
        members: member,
        loan_products: loan_product,
        loans: loan,
        loan_repayments: loan_repayment,
        loan_schedules: loan_schedule,
        savings_products: savings_product,
        savings_accounts: savings_account,
        savings_transactions: savings_transaction,
        share_accounts: share_account,
        fixed_deposits: fixed_deposit,
        fee_definitions: fee_definition,
        fee_charges: fee_charge,
    }
);

/// JSON fixture holding both contexts, as read by the CLI and the test suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub store: StoreSnapshot,
    pub microfinance: MicrofinanceSnapshot,
}

impl Fixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::InvalidInput(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn into_repositories(self) -> (StoreRepositories, MicrofinanceRepositories) {
        (
            StoreRepositories::in_memory(self.store),
            MicrofinanceRepositories::in_memory(self.microfinance),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Filter;

    #[tokio::test]
    async fn empty_snapshot_deserialises_with_defaults() {
        let snapshot: StoreSnapshot = serde_json::from_str("{}").unwrap();
        let repos = StoreRepositories::in_memory(snapshot);
        assert!(repos.warehouses.list(Filter::All).await.unwrap().is_empty());

        let members: MicrofinanceSnapshot = serde_json::from_str(r#"{"members": []}"#).unwrap();
        assert!(members.loans.is_empty());
    }

    #[test]
    fn fixture_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"{"store": {"warehouses": []}}"#).unwrap();

        let fixture = Fixture::load(&path).unwrap();
        assert!(fixture.store.warehouses.is_empty());
        assert!(fixture.microfinance.members.is_empty());
    }

    #[test]
    fn missing_fixture_is_invalid_input() {
        let err = Fixture::load("/nonexistent/fixture.json").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
