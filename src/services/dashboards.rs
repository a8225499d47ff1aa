//! Dashboard assembly: fetch the records a dashboard needs, hand them to the
//! pure builders in [`crate::dashboards`], and cache the result.

use async_recursion::async_recursion;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    cache::{self, CacheBackend, InflightRegistry},
    config::DashboardConfig,
    dashboards::{
        category::{self, CategoryDashboard, CategorySnapshot},
        member::{self, MemberDashboard, MemberSnapshot},
        supplier::{self, SupplierDashboard, SupplierSnapshot},
        warehouse::{self, WarehouseDashboard, WarehouseSnapshot},
        DashboardKind, ReportingPeriod,
    },
    errors::ServiceError,
    repositories::{
        require, Filter, ForeignKey, MicrofinanceRepositories, StoreRepositories,
    },
};

/// Source of "now" for reporting periods.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, used by tests and the CLI `--as-of` flag.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Sending half of a [`CancellationSignal`].
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the assembler between and during fetch stages. Once
/// cancelled, the request ends with [`ServiceError::Cancelled`] and nothing is
/// written to the cache.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    pub fn new() -> (CancellationHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancellationHandle { tx: Arc::new(tx) }, Self { rx })
    }

    /// A signal that can never fire.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if every handle was dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Runs one fetch stage, abandoning it as soon as the signal fires.
async fn guarded<T, F>(signal: &CancellationSignal, stage: &str, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    if signal.is_cancelled() {
        return Err(ServiceError::Cancelled(format!("before {}", stage)));
    }
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(ServiceError::Cancelled(format!("during {}", stage))),
        result = fut => result,
    }
}

/// Ids in first-seen order without repeats.
fn distinct(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[derive(Clone)]
pub struct DashboardService {
    store: StoreRepositories,
    microfinance: MicrofinanceRepositories,
    cache: Arc<dyn CacheBackend>,
    ttl: Duration,
    inflight: Option<InflightRegistry>,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(
        store: StoreRepositories,
        microfinance: MicrofinanceRepositories,
        cache: Arc<dyn CacheBackend>,
        config: &DashboardConfig,
    ) -> Self {
        Self {
            store,
            microfinance,
            cache,
            ttl: config.ttl(),
            inflight: config.dedupe_inflight.then(InflightRegistry::new),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn period(&self) -> ReportingPeriod {
        ReportingPeriod::from_now(self.clock.now())
    }

    /// Removes a cached dashboard so the next request rebuilds it.
    pub async fn invalidate(&self, kind: DashboardKind, id: Uuid) -> Result<(), ServiceError> {
        let key = kind.cache_key(id);
        self.cache
            .delete(&key)
            .await
            .map_err(|e| ServiceError::CacheError(e.to_string()))?;
        debug!(%key, "dashboard cache entry removed");
        Ok(())
    }

    async fn read_cached<T: DeserializeOwned>(&self, kind: DashboardKind, key: &str) -> Option<T> {
        match cache::get_json::<T>(self.cache.as_ref(), key).await {
            Ok(Some(hit)) => {
                counter!("erp_dashboards.cache.hit", 1, "kind" => kind.to_string());
                debug!(%key, "dashboard served from cache");
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                counter!("erp_dashboards.cache.error", 1, "kind" => kind.to_string());
                warn!(%key, error = %e, "unreadable dashboard cache entry, rebuilding");
                None
            }
        }
    }

    /// Serves `kind`/`id` from the cache, or builds it with `build` and stores
    /// the result for the configured TTL.
    async fn cached<T, F, Fut>(
        &self,
        kind: DashboardKind,
        id: Uuid,
        signal: &CancellationSignal,
        build: F,
    ) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if signal.is_cancelled() {
            return Err(ServiceError::Cancelled(format!("{} dashboard {}", kind, id)));
        }

        let key = kind.cache_key(id);
        if let Some(hit) = self.read_cached(kind, &key).await {
            return Ok(hit);
        }

        let _inflight = match &self.inflight {
            Some(registry) => {
                let guard = guarded(signal, "in-flight wait", async {
                    Ok(registry.acquire(&key).await)
                })
                .await?;
                if let Some(hit) = self.read_cached(kind, &key).await {
                    return Ok(hit);
                }
                Some(guard)
            }
            None => None,
        };

        counter!("erp_dashboards.cache.miss", 1, "kind" => kind.to_string());
        let started = Instant::now();
        let dashboard = build().await?;
        histogram!(
            "erp_dashboards.dashboard.build_seconds",
            started.elapsed().as_secs_f64(),
            "kind" => kind.to_string()
        );

        if signal.is_cancelled() {
            return Err(ServiceError::Cancelled(format!("{} dashboard {}", kind, id)));
        }

        if let Err(e) = cache::set_json(self.cache.as_ref(), &key, &dashboard, Some(self.ttl)).await {
            counter!("erp_dashboards.cache.error", 1, "kind" => kind.to_string());
            warn!(%key, error = %e, "failed to cache dashboard");
        }
        Ok(dashboard)
    }

    #[instrument(skip(self, signal))]
    pub async fn warehouse_dashboard(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<WarehouseDashboard, ServiceError> {
        self.cached(DashboardKind::Warehouse, id, signal, || async {
            let snapshot = self.load_warehouse(id, signal).await?;
            let dashboard = warehouse::build(&snapshot, &self.period());
            info!(
                warehouse = %dashboard.warehouse_name,
                stock_rows = snapshot.stock_levels.len(),
                transactions = snapshot.transactions.len(),
                "warehouse dashboard generated"
            );
            Ok(dashboard)
        })
        .await
    }

    #[instrument(skip(self, signal))]
    pub async fn supplier_dashboard(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<SupplierDashboard, ServiceError> {
        self.cached(DashboardKind::Supplier, id, signal, || async {
            let snapshot = self.load_supplier(id, signal).await?;
            let dashboard = supplier::build(&snapshot, &self.period());
            info!(
                supplier = %dashboard.supplier_name,
                purchase_orders = snapshot.purchase_orders.len(),
                "supplier dashboard generated"
            );
            Ok(dashboard)
        })
        .await
    }

    #[instrument(skip(self, signal))]
    pub async fn category_dashboard(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<CategoryDashboard, ServiceError> {
        self.cached(DashboardKind::Category, id, signal, || async {
            let snapshot = self.load_category(id, signal).await?;
            let dashboard = category::build(&snapshot, &self.period());
            info!(
                category = %dashboard.category_name,
                items = snapshot.items.len(),
                "category dashboard generated"
            );
            Ok(dashboard)
        })
        .await
    }

    #[instrument(skip(self, signal))]
    pub async fn member_dashboard(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<MemberDashboard, ServiceError> {
        self.cached(DashboardKind::Member, id, signal, || async {
            let snapshot = self.load_member(id, signal).await?;
            let dashboard = member::build(&snapshot, &self.period());
            info!(
                loans = snapshot.loans.len(),
                savings_accounts = snapshot.savings_accounts.len(),
                "member dashboard generated"
            );
            Ok(dashboard)
        })
        .await
    }

    async fn load_warehouse(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<WarehouseSnapshot, ServiceError> {
        let store = &self.store;
        let warehouse = guarded(signal, "warehouse", require(store.warehouses.as_ref(), id)).await?;

        let here = Filter::by(ForeignKey::Warehouse, id);
        let (locations, stock_levels, transactions, put_away_tasks, pick_lists, cycle_counts, goods_receipts) =
            guarded(signal, "warehouse activity", async {
                tokio::try_join!(
                    store.warehouse_locations.list(here.clone()),
                    store.stock_levels.list(here.clone()),
                    store.inventory_transactions.list(here.clone()),
                    store.put_away_tasks.list(here.clone()),
                    store.pick_lists.list(here.clone()),
                    store.cycle_counts.list(here.clone()),
                    store.goods_receipts.list(here.clone()),
                )
            })
            .await?;

        let item_ids = distinct(
            stock_levels
                .iter()
                .map(|s| s.item_id)
                .chain(transactions.iter().map(|t| t.item_id)),
        );
        let items = guarded(signal, "items", store.items.list(Filter::ids(item_ids))).await?;
        let category_ids = distinct(items.iter().filter_map(|i| i.category_id));
        let categories =
            guarded(signal, "categories", store.categories.list(Filter::ids(category_ids))).await?;

        Ok(WarehouseSnapshot {
            warehouse,
            locations,
            stock_levels,
            transactions,
            put_away_tasks,
            pick_lists,
            cycle_counts,
            goods_receipts,
            items,
            categories,
        })
    }

    async fn load_supplier(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<SupplierSnapshot, ServiceError> {
        let store = &self.store;
        let supplier = guarded(signal, "supplier", require(store.suppliers.as_ref(), id)).await?;

        let theirs = Filter::by(ForeignKey::Supplier, id);
        let (purchase_orders, item_suppliers, all_suppliers) = guarded(signal, "purchase orders", async {
            tokio::try_join!(
                store.purchase_orders.list(theirs.clone()),
                store.item_suppliers.list(theirs.clone()),
                store.suppliers.list(Filter::All),
            )
        })
        .await?;

        let po_ids: Vec<Uuid> = purchase_orders.iter().map(|po| po.id).collect();
        let (goods_receipts, purchase_order_items) = guarded(signal, "order lines", async {
            tokio::try_join!(
                store
                    .goods_receipts
                    .list(Filter::any_of(ForeignKey::PurchaseOrder, po_ids.clone())),
                store
                    .purchase_order_items
                    .list(Filter::any_of(ForeignKey::PurchaseOrder, po_ids.clone())),
            )
        })
        .await?;

        let receipt_ids: Vec<Uuid> = goods_receipts.iter().map(|r| r.id).collect();
        let goods_receipt_items = guarded(
            signal,
            "receipt lines",
            store
                .goods_receipt_items
                .list(Filter::any_of(ForeignKey::GoodsReceipt, receipt_ids)),
        )
        .await?;

        let item_ids = distinct(
            item_suppliers
                .iter()
                .map(|l| l.item_id)
                .chain(purchase_order_items.iter().map(|l| l.item_id))
                .chain(goods_receipt_items.iter().map(|l| l.item_id)),
        );
        let items = guarded(signal, "items", store.items.list(Filter::ids(item_ids))).await?;
        let category_ids = distinct(items.iter().filter_map(|i| i.category_id));
        let categories =
            guarded(signal, "categories", store.categories.list(Filter::ids(category_ids))).await?;

        Ok(SupplierSnapshot {
            supplier,
            all_suppliers,
            purchase_orders,
            purchase_order_items,
            goods_receipts,
            goods_receipt_items,
            item_suppliers,
            items,
            categories,
        })
    }

    /// Walks the category tree below `frontier`, appending each newly seen id
    /// to `subtree`. Ids already present are skipped so a cyclic parent chain
    /// terminates.
    #[async_recursion]
    async fn collect_descendants(
        &self,
        frontier: Vec<Uuid>,
        subtree: &mut Vec<Uuid>,
        signal: &CancellationSignal,
    ) -> Result<(), ServiceError> {
        if frontier.is_empty() {
            return Ok(());
        }
        let children = guarded(
            signal,
            "subcategories",
            self.store
                .categories
                .list(Filter::any_of(ForeignKey::ParentCategory, frontier)),
        )
        .await?;

        let mut next = Vec::new();
        for child in children {
            if !subtree.contains(&child.id) {
                subtree.push(child.id);
                next.push(child.id);
            }
        }
        self.collect_descendants(next, subtree, signal).await
    }

    async fn load_category(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<CategorySnapshot, ServiceError> {
        let store = &self.store;
        let category = guarded(signal, "category", require(store.categories.as_ref(), id)).await?;

        let (parent, subcategories) = guarded(signal, "category neighbours", async {
            tokio::try_join!(
                async {
                    match category.parent_category_id {
                        Some(parent_id) => store.categories.get_by_id(parent_id).await,
                        None => Ok(None),
                    }
                },
                store
                    .categories
                    .list(Filter::by(ForeignKey::ParentCategory, id)),
            )
        })
        .await?;

        let mut subtree = vec![id];
        let mut frontier = Vec::new();
        for child in &subcategories {
            if !subtree.contains(&child.id) {
                subtree.push(child.id);
                frontier.push(child.id);
            }
        }
        self.collect_descendants(frontier, &mut subtree, signal).await?;

        let items = guarded(
            signal,
            "items",
            store
                .items
                .list(Filter::any_of(ForeignKey::Category, subtree)),
        )
        .await?;

        let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let by_item = Filter::any_of(ForeignKey::Item, item_ids);
        let (stock_levels, transactions, purchase_order_items, item_suppliers) =
            guarded(signal, "item activity", async {
                tokio::try_join!(
                    store.stock_levels.list(by_item.clone()),
                    store.inventory_transactions.list(by_item.clone()),
                    store.purchase_order_items.list(by_item.clone()),
                    store.item_suppliers.list(by_item.clone()),
                )
            })
            .await?;

        let warehouse_ids = distinct(
            stock_levels
                .iter()
                .map(|s| s.warehouse_id)
                .chain(transactions.iter().filter_map(|t| t.warehouse_id)),
        );
        let supplier_ids = distinct(item_suppliers.iter().map(|l| l.supplier_id));
        let po_ids = distinct(purchase_order_items.iter().map(|l| l.purchase_order_id));
        let (warehouses, suppliers, purchase_orders) = guarded(signal, "related records", async {
            tokio::try_join!(
                store.warehouses.list(Filter::ids(warehouse_ids)),
                store.suppliers.list(Filter::ids(supplier_ids)),
                store.purchase_orders.list(Filter::ids(po_ids)),
            )
        })
        .await?;

        Ok(CategorySnapshot {
            category,
            parent,
            subcategories,
            items,
            stock_levels,
            transactions,
            purchase_order_items,
            purchase_orders,
            item_suppliers,
            suppliers,
            warehouses,
        })
    }

    async fn load_member(
        &self,
        id: Uuid,
        signal: &CancellationSignal,
    ) -> Result<MemberSnapshot, ServiceError> {
        let mf = &self.microfinance;
        let member = guarded(signal, "member", require(mf.members.as_ref(), id)).await?;

        let theirs = Filter::by(ForeignKey::Member, id);
        let (loans, savings_accounts, share_accounts, fixed_deposits, fee_charges) =
            guarded(signal, "member accounts", async {
                tokio::try_join!(
                    mf.loans.list(theirs.clone()),
                    mf.savings_accounts.list(theirs.clone()),
                    mf.share_accounts.list(theirs.clone()),
                    mf.fixed_deposits.list(theirs.clone()),
                    mf.fee_charges.list(theirs.clone()),
                )
            })
            .await?;

        let loan_ids: Vec<Uuid> = loans.iter().map(|l| l.id).collect();
        let account_ids: Vec<Uuid> = savings_accounts.iter().map(|a| a.id).collect();
        let loan_product_ids = distinct(loans.iter().filter_map(|l| l.loan_product_id));
        let savings_product_ids =
            distinct(savings_accounts.iter().filter_map(|a| a.savings_product_id));
        let fee_definition_ids = distinct(fee_charges.iter().filter_map(|c| c.fee_definition_id));

        let (repayments, schedules, savings_transactions, loan_products, savings_products, fee_definitions) =
            guarded(signal, "account activity", async {
                tokio::try_join!(
                    mf.loan_repayments
                        .list(Filter::any_of(ForeignKey::Loan, loan_ids.clone())),
                    mf.loan_schedules
                        .list(Filter::any_of(ForeignKey::Loan, loan_ids.clone())),
                    mf.savings_transactions
                        .list(Filter::any_of(ForeignKey::SavingsAccount, account_ids)),
                    mf.loan_products.list(Filter::ids(loan_product_ids)),
                    mf.savings_products.list(Filter::ids(savings_product_ids)),
                    mf.fee_definitions.list(Filter::ids(fee_definition_ids)),
                )
            })
            .await?;

        Ok(MemberSnapshot {
            member,
            loans,
            loan_products,
            repayments,
            schedules,
            savings_accounts,
            savings_products,
            savings_transactions,
            share_accounts,
            fixed_deposits,
            fee_charges,
            fee_definitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let (handle, signal) = CancellationSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn never_signal_does_not_fire() {
        let signal = CancellationSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn guarded_stage_reports_cancellation() {
        let (handle, signal) = CancellationSignal::new();
        handle.cancel();
        let result: Result<(), ServiceError> = guarded(&signal, "items", async { Ok(()) }).await;
        assert!(matches!(result, Err(ServiceError::Cancelled(_))));
    }

    #[tokio::test]
    async fn guarded_stage_passes_errors_through() {
        let signal = CancellationSignal::never();
        let result: Result<(), ServiceError> = guarded(&signal, "items", async {
            Err(ServiceError::InternalError("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::InternalError(msg)) if msg == "boom"));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(distinct([b, a, b, a]), vec![b, a]);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }
}
