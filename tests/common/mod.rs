//! Shared doubles and fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use erp_dashboards::{
    cache::{CacheBackend, CacheError, InMemoryCache},
    config::DashboardConfig,
    entities::{
        category, fee_charge, fee_definition, goods_receipt, inventory_transaction, item,
        item_supplier, loan, loan_product, loan_repayment, loan_schedule, member,
        purchase_order, purchase_order_item, savings_account, savings_transaction, stock_level,
        supplier, warehouse, warehouse_location,
    },
    errors::ServiceError,
    repositories::{
        Filter, InMemoryRepository, MicrofinanceRepositories, MicrofinanceSnapshot, ReadRepository,
        Record, Repo, StoreRepositories, StoreSnapshot,
    },
    services::dashboards::{DashboardService, FixedClock},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DbErr;
use uuid::Uuid;

/// 2024-03-15 12:00 UTC, the instant every test dashboard is built at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Ordered log of repository calls, recorded as `"<Kind>.<op>"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn count_of(&self, kind: &str) -> usize {
        let prefix = format!("{}.", kind);
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(&prefix))
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// In-memory repository that records each call and can be slowed down.
pub struct CountingRepository<T> {
    inner: InMemoryRepository<T>,
    log: CallLog,
    delay: Option<Duration>,
}

impl<T: Record> CountingRepository<T> {
    pub fn new(records: Vec<T>, log: &CallLog) -> Self {
        Self {
            inner: InMemoryRepository::new(records),
            log: log.clone(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl<T: Record> ReadRepository<T> for CountingRepository<T> {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, ServiceError> {
        self.log.record(format!("{}.get_by_id", T::KIND));
        self.pause().await;
        self.inner.get_by_id(id).await
    }

    async fn list(&self, filter: Filter) -> Result<Vec<T>, ServiceError> {
        self.log.record(format!("{}.list", T::KIND));
        self.pause().await;
        self.inner.list(filter).await
    }
}

/// Repository whose every call fails with a database error.
pub struct FailingRepository;

pub const FAILURE_MESSAGE: &str = "connection reset by peer";

#[async_trait]
impl<T: Record> ReadRepository<T> for FailingRepository {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<T>, ServiceError> {
        Err(ServiceError::DatabaseError(DbErr::Custom(FAILURE_MESSAGE.into())))
    }

    async fn list(&self, _filter: Filter) -> Result<Vec<T>, ServiceError> {
        Err(ServiceError::DatabaseError(DbErr::Custom(FAILURE_MESSAGE.into())))
    }
}

/// Repository whose calls never complete.
pub struct HangingRepository;

#[async_trait]
impl<T: Record> ReadRepository<T> for HangingRepository {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<T>, ServiceError> {
        std::future::pending().await
    }

    async fn list(&self, _filter: Filter) -> Result<Vec<T>, ServiceError> {
        std::future::pending().await
    }
}

fn counting<T: Record>(records: Vec<T>, log: &CallLog, delay: Option<Duration>) -> Repo<T> {
    let repo = CountingRepository::new(records, log);
    match delay {
        Some(delay) => Arc::new(repo.with_delay(delay)),
        None => Arc::new(repo),
    }
}

pub fn counting_store(s: StoreSnapshot, log: &CallLog, delay: Option<Duration>) -> StoreRepositories {
    StoreRepositories {
        categories: counting(s.categories, log, delay),
        items: counting(s.items, log, delay),
        warehouses: counting(s.warehouses, log, delay),
        warehouse_locations: counting(s.warehouse_locations, log, delay),
        stock_levels: counting(s.stock_levels, log, delay),
        inventory_transactions: counting(s.inventory_transactions, log, delay),
        put_away_tasks: counting(s.put_away_tasks, log, delay),
        pick_lists: counting(s.pick_lists, log, delay),
        cycle_counts: counting(s.cycle_counts, log, delay),
        goods_receipts: counting(s.goods_receipts, log, delay),
        goods_receipt_items: counting(s.goods_receipt_items, log, delay),
        suppliers: counting(s.suppliers, log, delay),
        item_suppliers: counting(s.item_suppliers, log, delay),
        purchase_orders: counting(s.purchase_orders, log, delay),
        purchase_order_items: counting(s.purchase_order_items, log, delay),
    }
}

pub fn counting_microfinance(
    s: MicrofinanceSnapshot,
    log: &CallLog,
    delay: Option<Duration>,
) -> MicrofinanceRepositories {
    MicrofinanceRepositories {
        members: counting(s.members, log, delay),
        loan_products: counting(s.loan_products, log, delay),
        loans: counting(s.loans, log, delay),
        loan_repayments: counting(s.loan_repayments, log, delay),
        loan_schedules: counting(s.loan_schedules, log, delay),
        savings_products: counting(s.savings_products, log, delay),
        savings_accounts: counting(s.savings_accounts, log, delay),
        savings_transactions: counting(s.savings_transactions, log, delay),
        share_accounts: counting(s.share_accounts, log, delay),
        fixed_deposits: counting(s.fixed_deposits, log, delay),
        fee_definitions: counting(s.fee_definitions, log, delay),
        fee_charges: counting(s.fee_charges, log, delay),
    }
}

/// Cache that counts reads and writes on top of [`InMemoryCache`].
#[derive(Default)]
pub struct CountingCache {
    inner: InMemoryCache,
    pub gets: std::sync::atomic::AtomicUsize,
    pub sets: std::sync::atomic::AtomicUsize,
    pub last_ttl: Mutex<Option<Duration>>,
}

impl CountingCache {
    pub fn gets(&self) -> usize {
        self.gets.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.sets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_ttl.lock().unwrap() = ttl;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(key).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear().await
    }
}

/// A small but complete set of records touching every dashboard.
pub struct World {
    pub store: StoreSnapshot,
    pub microfinance: MicrofinanceSnapshot,
    pub warehouse_id: Uuid,
    pub supplier_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Uuid,
    pub member_id: Uuid,
}

impl World {
    pub fn new() -> Self {
        let warehouse = warehouse::Model {
            id: Uuid::new_v4(),
            name: "Central".into(),
            code: "WH-C".into(),
            address: Some("1 Dock Road".into()),
            manager_name: Some("R. Osei".into()),
            manager_email: None,
            manager_phone: None,
            warehouse_type: Some("Distribution".into()),
            is_active: true,
            total_capacity: dec!(1000),
            used_capacity: dec!(250),
        };
        let location = warehouse_location::Model {
            id: Uuid::new_v4(),
            warehouse_id: warehouse.id,
            code: "A-01".into(),
            aisle: Some("A".into()),
            capacity: dec!(100),
            used_capacity: dec!(40),
        };

        let root = category_model("Groceries", None);
        let child = category_model("Dairy", Some(root.id));
        let grandchild = category_model("Cheese", Some(child.id));

        let milk = item_model("Milk", dec!(2), Some(child.id));
        let brie = item_model("Brie", dec!(9), Some(grandchild.id));
        let rice = item_model("Rice", dec!(3), Some(root.id));

        let supplier = supplier_model("Acme Foods");
        let other_supplier = supplier_model("Bolt Wholesale");

        let stock_levels = vec![
            stock(&milk, &warehouse, 40),
            stock(&brie, &warehouse, 3),
            stock(&rice, &warehouse, 0),
        ];
        let inventory_transactions = vec![
            txn(&milk, &warehouse, 100, dec!(100), at(2024, 3, 5)),
            txn(&milk, &warehouse, -40, dec!(-40), at(2024, 3, 6)),
            txn(&brie, &warehouse, 25, dec!(25), at(2024, 3, 7)),
            txn(&rice, &warehouse, -10, dec!(-30), at(2024, 1, 20)),
        ];

        let order = purchase_order::Model {
            id: Uuid::new_v4(),
            supplier_id: supplier.id,
            order_number: Some("PO-1001".into()),
            order_date: at(2024, 2, 1),
            expected_delivery_date: Some(at(2024, 2, 10)),
            status: "Completed".into(),
            total_amount: dec!(500),
            created_at: at(2024, 2, 1),
        };
        let order_line = purchase_order_item::Model {
            id: Uuid::new_v4(),
            purchase_order_id: order.id,
            item_id: milk.id,
            quantity: 250,
            unit_price: dec!(2),
            total_price: dec!(500),
            created_at: at(2024, 2, 1),
        };
        let receipt = goods_receipt::Model {
            id: Uuid::new_v4(),
            warehouse_id: Some(warehouse.id),
            purchase_order_id: Some(order.id),
            receipt_number: Some("GR-1".into()),
            status: "Completed".into(),
            received_date: at(2024, 2, 9),
        };
        let link = item_supplier::Model {
            id: Uuid::new_v4(),
            item_id: milk.id,
            supplier_id: supplier.id,
            is_preferred: true,
            lead_time_days: 7,
            unit_cost: dec!(2),
        };

        let store = StoreSnapshot {
            categories: vec![root.clone(), child.clone(), grandchild],
            items: vec![milk, brie, rice],
            warehouses: vec![warehouse.clone()],
            warehouse_locations: vec![location],
            stock_levels,
            inventory_transactions,
            goods_receipts: vec![receipt],
            suppliers: vec![supplier.clone(), other_supplier],
            item_suppliers: vec![link],
            purchase_orders: vec![order],
            purchase_order_items: vec![order_line],
            ..Default::default()
        };

        let person = member::Model {
            id: Uuid::new_v4(),
            member_number: "M-0001".into(),
            first_name: "Ada".into(),
            last_name: "Mensah".into(),
            join_date: date(2023, 3, 15),
            is_active: true,
            monthly_income: Some(dec!(1000)),
        };
        let product = loan_product::Model {
            id: Uuid::new_v4(),
            name: "Working Capital".into(),
        };
        let facility = loan::Model {
            id: Uuid::new_v4(),
            member_id: person.id,
            loan_product_id: Some(product.id),
            loan_number: "LN-1".into(),
            principal_amount: dec!(1200),
            outstanding_principal: dec!(800),
            outstanding_interest: dec!(50),
            interest_rate: dec!(12),
            term_months: 12,
            disbursement_date: Some(date(2023, 10, 1)),
            expected_end_date: Some(date(2024, 10, 1)),
            status: "DISBURSED".into(),
        };
        let schedules = (1..=12)
            .map(|n| loan_schedule::Model {
                id: Uuid::new_v4(),
                loan_id: facility.id,
                installment_number: n,
                due_date: date(2023, 10, 1) + chrono::Months::new(n as u32),
                principal_amount: dec!(100),
                interest_amount: dec!(10),
                is_paid: n <= 4,
            })
            .collect::<Vec<_>>();
        let repayments = (1..=4)
            .map(|n| loan_repayment::Model {
                id: Uuid::new_v4(),
                loan_id: facility.id,
                repayment_date: date(2023, 10, 1) + chrono::Months::new(n),
                principal_amount: dec!(100),
                interest_amount: dec!(10),
                total_amount: dec!(110),
                payment_method: "CASH".into(),
            })
            .collect::<Vec<_>>();
        let account = savings_account::Model {
            id: Uuid::new_v4(),
            member_id: person.id,
            savings_product_id: None,
            account_number: "SA-1".into(),
            balance: dec!(300),
            opened_date: date(2023, 3, 20),
            status: "Active".into(),
        };
        let deposit = savings_transaction::Model {
            id: Uuid::new_v4(),
            savings_account_id: account.id,
            transaction_type: "Deposit".into(),
            amount: dec!(300),
            transaction_date: date(2024, 2, 2),
            description: None,
        };
        let fee_type = fee_definition::Model {
            id: Uuid::new_v4(),
            name: "Processing".into(),
        };
        let fee = fee_charge::Model {
            id: Uuid::new_v4(),
            member_id: person.id,
            fee_definition_id: Some(fee_type.id),
            amount: dec!(20),
            amount_paid: dec!(20),
            charge_date: date(2023, 10, 1),
            status: "Paid".into(),
        };

        let microfinance = MicrofinanceSnapshot {
            members: vec![person.clone()],
            loan_products: vec![product],
            loans: vec![facility],
            loan_repayments: repayments,
            loan_schedules: schedules,
            savings_accounts: vec![account],
            savings_transactions: vec![deposit],
            fee_definitions: vec![fee_type],
            fee_charges: vec![fee],
            ..Default::default()
        };

        Self {
            store,
            microfinance,
            warehouse_id: warehouse.id,
            supplier_id: supplier.id,
            category_id: root.id,
            subcategory_id: child.id,
            member_id: person.id,
        }
    }
}

/// Service over counting repositories, with its call log and cache.
pub struct Harness {
    pub service: DashboardService,
    pub log: CallLog,
    pub cache: Arc<CountingCache>,
}

impl Harness {
    pub fn new(world: &World) -> Self {
        Self::with_options(world, DashboardConfig::default(), None)
    }

    pub fn with_options(world: &World, config: DashboardConfig, delay: Option<Duration>) -> Self {
        let log = CallLog::default();
        let cache = Arc::new(CountingCache::default());
        let service = DashboardService::new(
            counting_store(world.store.clone(), &log, delay),
            counting_microfinance(world.microfinance.clone(), &log, delay),
            cache.clone(),
            &config,
        )
        .with_clock(Arc::new(FixedClock(now())));
        Self {
            service,
            log,
            cache,
        }
    }
}

fn category_model(name: &str, parent: Option<Uuid>) -> category::Model {
    category::Model {
        id: Uuid::new_v4(),
        name: name.into(),
        code: None,
        description: None,
        image_url: None,
        is_active: true,
        sort_order: 0,
        parent_category_id: parent,
        created_at: at(2023, 1, 1),
    }
}

fn item_model(name: &str, price: Decimal, category_id: Option<Uuid>) -> item::Model {
    item::Model {
        id: Uuid::new_v4(),
        name: name.into(),
        sku: Some(format!("SKU-{}", name.to_uppercase())),
        image_url: None,
        category_id,
        unit_price: price,
        cost: price / dec!(2),
        reorder_point: 5,
        maximum_stock: 100,
        is_active: true,
        created_at: at(2023, 6, 1),
    }
}

fn supplier_model(name: &str) -> supplier::Model {
    supplier::Model {
        id: Uuid::new_v4(),
        name: name.into(),
        code: None,
        contact_person: None,
        email: None,
        phone: None,
        image_url: None,
        is_active: true,
        rating: dec!(4),
        credit_limit: None,
        payment_terms_days: 30,
    }
}

fn stock(item: &item::Model, warehouse: &warehouse::Model, quantity: i32) -> stock_level::Model {
    stock_level::Model {
        id: Uuid::new_v4(),
        item_id: item.id,
        warehouse_id: warehouse.id,
        warehouse_location_id: None,
        quantity_on_hand: quantity,
        quantity_reserved: 0,
    }
}

fn txn(
    item: &item::Model,
    warehouse: &warehouse::Model,
    quantity: i32,
    cost: Decimal,
    when: DateTime<Utc>,
) -> inventory_transaction::Model {
    inventory_transaction::Model {
        id: Uuid::new_v4(),
        item_id: item.id,
        warehouse_id: Some(warehouse.id),
        transaction_type: "Adjustment".into(),
        quantity,
        total_cost: cost,
        transaction_date: when,
        reference: None,
        created_by: None,
    }
}
