use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::{Filter, ReadRepository, Record};
use crate::errors::ServiceError;

/// Repository over an immutable snapshot of records, in insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryRepository<T> {
    records: Arc<Vec<T>>,
}

impl<T: Record> InMemoryRepository<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Record> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl<T: Record> ReadRepository<T> for InMemoryRepository<T> {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, ServiceError> {
        Ok(self.records.iter().find(|record| record.id() == id).cloned())
    }

    async fn list(&self, filter: Filter) -> Result<Vec<T>, ServiceError> {
        if filter.is_empty_selection() {
            return Ok(Vec::new());
        }
        Ok(self
            .records
            .iter()
            .filter(|record| filter.matches(*record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::loan_schedule;
    use crate::repositories::ForeignKey;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn schedule(loan_id: Uuid, n: i32) -> loan_schedule::Model {
        loan_schedule::Model {
            id: Uuid::new_v4(),
            loan_id,
            installment_number: n,
            due_date: NaiveDate::from_ymd_opt(2024, n as u32, 1).unwrap(),
            principal_amount: dec!(100),
            interest_amount: dec!(5),
            is_paid: false,
        }
    }

    #[tokio::test]
    async fn lists_by_foreign_key_in_insertion_order() {
        let loan_a = Uuid::new_v4();
        let loan_b = Uuid::new_v4();
        let repo = InMemoryRepository::new(vec![
            schedule(loan_a, 1),
            schedule(loan_b, 2),
            schedule(loan_a, 3),
        ]);

        let rows = repo.list(Filter::by(ForeignKey::Loan, loan_a)).await.unwrap();
        let numbers: Vec<i32> = rows.iter().map(|s| s.installment_number).collect();
        assert_eq!(numbers, vec![1, 3]);

        let first = rows[0].id;
        assert_eq!(repo.get_by_id(first).await.unwrap().unwrap().installment_number, 1);
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_in_filter_returns_nothing() {
        let repo = InMemoryRepository::new(vec![schedule(Uuid::new_v4(), 1)]);
        let rows = repo
            .list(Filter::any_of(ForeignKey::Loan, Vec::new()))
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(repo.list(Filter::All).await.unwrap().len(), 1);
    }
}
