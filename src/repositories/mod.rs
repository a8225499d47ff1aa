//! Read-only data access port used by the dashboard assemblers.
//!
//! Every consumed record type implements [`Record`], which exposes its id and
//! the foreign keys it can be filtered by. Storage adapters implement
//! [`ReadRepository`] for those records: [`SeaOrmRepository`] for a live
//! database and [`InMemoryRepository`] for snapshots loaded from fixtures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod bundles;
pub mod memory;
pub mod sea_orm;

pub use bundles::{
    Fixture, MicrofinanceRepositories, MicrofinanceSnapshot, StoreRepositories, StoreSnapshot,
};
pub use memory::InMemoryRepository;
pub use self::sea_orm::{ForeignKeyColumns, SeaOrmRepository};

/// Relationship a record can be listed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ForeignKey {
    Warehouse,
    WarehouseLocation,
    Item,
    Category,
    ParentCategory,
    Supplier,
    PurchaseOrder,
    GoodsReceipt,
    Member,
    Loan,
    LoanProduct,
    SavingsAccount,
    SavingsProduct,
    FeeDefinition,
}

/// Selection passed to [`ReadRepository::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Ids(Vec<Uuid>),
    Eq(ForeignKey, Uuid),
    In(ForeignKey, Vec<Uuid>),
}

impl Filter {
    pub fn by(key: ForeignKey, id: Uuid) -> Self {
        Filter::Eq(key, id)
    }

    pub fn any_of(key: ForeignKey, ids: impl IntoIterator<Item = Uuid>) -> Self {
        Filter::In(key, ids.into_iter().collect())
    }

    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Filter::Ids(ids.into_iter().collect())
    }

    /// True when the filter can only ever select nothing, so storage need not be touched.
    pub fn is_empty_selection(&self) -> bool {
        match self {
            Filter::Ids(ids) | Filter::In(_, ids) => ids.is_empty(),
            Filter::All | Filter::Eq(..) => false,
        }
    }

    pub fn matches<T: Record>(&self, record: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Ids(ids) => ids.contains(&record.id()),
            Filter::Eq(key, id) => record.foreign_key(*key) == Some(*id),
            Filter::In(key, ids) => record
                .foreign_key(*key)
                .map(|fk| ids.contains(&fk))
                .unwrap_or(false),
        }
    }
}

/// A record the dashboards can read.
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable entity name used in NotFound messages and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// Value of the given relationship, `None` when unset or not applicable.
    fn foreign_key(&self, key: ForeignKey) -> Option<Uuid>;
}

#[async_trait]
pub trait ReadRepository<T: Record>: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, ServiceError>;

    async fn list(&self, filter: Filter) -> Result<Vec<T>, ServiceError>;
}

pub type Repo<T> = Arc<dyn ReadRepository<T>>;

/// Fetches a record or fails with NotFound naming the entity kind and id.
pub async fn require<T: Record>(repo: &dyn ReadRepository<T>, id: Uuid) -> Result<T, ServiceError> {
    repo.get_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(T::KIND, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        id: Uuid,
        owner: Option<Uuid>,
    }

    impl Record for Row {
        const KIND: &'static str = "Row";

        fn id(&self) -> Uuid {
            self.id
        }

        fn foreign_key(&self, key: ForeignKey) -> Option<Uuid> {
            match key {
                ForeignKey::Member => self.owner,
                _ => None,
            }
        }
    }

    #[test]
    fn filters_match_on_foreign_keys_and_ids() {
        let owner = Uuid::new_v4();
        let row = Row {
            id: Uuid::new_v4(),
            owner: Some(owner),
        };
        let orphan = Row {
            id: Uuid::new_v4(),
            owner: None,
        };

        assert!(Filter::All.matches(&row));
        assert!(Filter::by(ForeignKey::Member, owner).matches(&row));
        assert!(!Filter::by(ForeignKey::Member, owner).matches(&orphan));
        assert!(!Filter::by(ForeignKey::Loan, owner).matches(&row));
        assert!(Filter::any_of(ForeignKey::Member, [Uuid::new_v4(), owner]).matches(&row));
        assert!(Filter::ids([orphan.id]).matches(&orphan));
        assert!(!Filter::ids([orphan.id]).matches(&row));
    }

    #[test]
    fn empty_set_filters_select_nothing() {
        assert!(Filter::any_of(ForeignKey::Loan, Vec::new()).is_empty_selection());
        assert!(Filter::ids(Vec::new()).is_empty_selection());
        assert!(!Filter::All.is_empty_selection());
        assert!(!Filter::by(ForeignKey::Loan, Uuid::nil()).is_empty_selection());
    }
}
