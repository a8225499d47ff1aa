use async_trait::async_trait;
use metrics::{counter, histogram};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PrimaryKeyTrait, QueryFilter, QueryOrder,
};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

use super::{Filter, ForeignKey, ReadRepository, Record};
use crate::errors::ServiceError;

/// Maps the port's relationship names onto an entity's columns.
pub trait ForeignKeyColumns: EntityTrait {
    fn id_column() -> Self::Column;

    fn foreign_key_column(key: ForeignKey) -> Option<Self::Column>;
}

/// Generic SeaORM adapter; one instance per entity.
pub struct SeaOrmRepository<E> {
    db: Arc<DatabaseConnection>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SeaOrmRepository<E> {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for SeaOrmRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

fn record_query<T: Record>(op: &'static str, started: Instant, rows: usize) {
    let elapsed = started.elapsed();
    histogram!("erp_dashboards.repository.query_seconds", elapsed.as_secs_f64(), "entity" => T::KIND, "op" => op);
    debug!(entity = T::KIND, op, rows, ?elapsed, "repository query completed");
}

#[async_trait]
impl<E> ReadRepository<E::Model> for SeaOrmRepository<E>
where
    E: ForeignKeyColumns + Send + Sync,
    E::Model: Record,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    async fn get_by_id(&self, id: Uuid) -> Result<Option<E::Model>, ServiceError> {
        let started = Instant::now();
        let row = E::find_by_id(id).one(self.db.as_ref()).await.map_err(|e| {
            error!(entity = <E::Model as Record>::KIND, %id, "get_by_id failed: {}", e);
            counter!("erp_dashboards.repository.error", 1, "entity" => <E::Model as Record>::KIND);
            ServiceError::db_error(e)
        })?;
        record_query::<E::Model>("get_by_id", started, usize::from(row.is_some()));
        Ok(row)
    }

    async fn list(&self, filter: Filter) -> Result<Vec<E::Model>, ServiceError> {
        if filter.is_empty_selection() {
            return Ok(Vec::new());
        }

        let kind = <E::Model as Record>::KIND;
        let column = |key: ForeignKey| {
            E::foreign_key_column(key).ok_or_else(|| {
                ServiceError::InvalidInput(format!("{} cannot be listed by {}", kind, key))
            })
        };

        let query = match filter {
            Filter::All => E::find(),
            Filter::Ids(ids) => E::find().filter(E::id_column().is_in(ids)),
            Filter::Eq(key, id) => E::find().filter(column(key)?.eq(id)),
            Filter::In(key, ids) => E::find().filter(column(key)?.is_in(ids)),
        };

        let started = Instant::now();
        let rows = query
            .order_by_asc(E::id_column())
            .all(self.db.as_ref())
            .await
            .map_err(|e| {
                error!(entity = kind, "list failed: {}", e);
                counter!("erp_dashboards.repository.error", 1, "entity" => kind);
                ServiceError::db_error(e)
            })?;
        record_query::<E::Model>("list", started, rows.len());
        Ok(rows)
    }
}
