mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{
    counting_microfinance, counting_store, now, CallLog, CountingCache, FailingRepository,
    Harness, HangingRepository, World, FAILURE_MESSAGE,
};
use erp_dashboards::{
    cache::CacheBackend,
    config::DashboardConfig,
    dashboards::{DashboardKind, TREND_MONTHS},
    errors::ServiceError,
    services::dashboards::{CancellationSignal, DashboardService, FixedClock},
};
use rust_decimal_macros::dec;
use sea_orm::DbErr;
use uuid::Uuid;

fn service_with(
    world: &World,
    log: &CallLog,
    cache: Arc<CountingCache>,
    patch: impl FnOnce(&mut erp_dashboards::repositories::StoreRepositories),
) -> DashboardService {
    let mut store = counting_store(world.store.clone(), log, None);
    patch(&mut store);
    DashboardService::new(
        store,
        counting_microfinance(world.microfinance.clone(), log, None),
        cache,
        &DashboardConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(now())))
}

#[tokio::test]
async fn second_request_is_served_from_cache_without_repository_calls() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();

    let first = harness
        .service
        .warehouse_dashboard(world.warehouse_id, &signal)
        .await
        .unwrap();
    assert!(harness.log.len() > 0);
    assert_eq!(harness.cache.sets(), 1);
    assert_eq!(
        *harness.cache.last_ttl.lock().unwrap(),
        Some(Duration::from_secs(300))
    );

    harness.log.clear();
    let second = harness
        .service
        .warehouse_dashboard(world.warehouse_id, &signal)
        .await
        .unwrap();
    assert_eq!(harness.log.len(), 0);
    assert_eq!(harness.cache.sets(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn every_dashboard_is_stored_under_its_own_key() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();
    let service = &harness.service;

    service.warehouse_dashboard(world.warehouse_id, &signal).await.unwrap();
    service.supplier_dashboard(world.supplier_id, &signal).await.unwrap();
    service.category_dashboard(world.category_id, &signal).await.unwrap();
    service.member_dashboard(world.member_id, &signal).await.unwrap();

    for key in [
        format!("warehouse-dashboard:{}", world.warehouse_id),
        format!("supplier-dashboard:{}", world.supplier_id),
        format!("category-dashboard:{}", world.category_id),
        format!("member-dashboard:{}", world.member_id),
    ] {
        assert!(harness.cache.exists(&key).await.unwrap(), "missing {}", key);
    }
    assert_eq!(harness.cache.sets(), 4);
}

#[tokio::test]
async fn missing_subject_fails_before_any_related_fetch() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();
    let service = &harness.service;
    let unknown = Uuid::new_v4();

    let err = service.warehouse_dashboard(unknown, &signal).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(harness.log.entries(), vec!["Warehouse.get_by_id"]);

    harness.log.clear();
    let err = service.supplier_dashboard(unknown, &signal).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(harness.log.entries(), vec!["Supplier.get_by_id"]);

    harness.log.clear();
    let err = service.category_dashboard(unknown, &signal).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(harness.log.entries(), vec!["Category.get_by_id"]);

    harness.log.clear();
    let err = service.member_dashboard(unknown, &signal).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg.contains("Member"));
    assert_eq!(harness.log.entries(), vec!["Member.get_by_id"]);

    assert_eq!(harness.cache.sets(), 0);
}

#[tokio::test]
async fn cancelled_signal_stops_before_fetching() {
    let world = World::new();
    let harness = Harness::new(&world);
    let (handle, signal) = CancellationSignal::new();
    handle.cancel();

    let err = harness
        .service
        .supplier_dashboard(world.supplier_id, &signal)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(harness.log.len(), 0);
    assert_eq!(harness.cache.gets(), 0);
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_fetch() {
    let world = World::new();
    let log = CallLog::default();
    let cache = Arc::new(CountingCache::default());
    let service = service_with(&world, &log, cache.clone(), |store| {
        store.stock_levels = Arc::new(HangingRepository);
    });

    let (handle, signal) = CancellationSignal::new();
    let warehouse_id = world.warehouse_id;
    let task = tokio::spawn(async move { service.warehouse_dashboard(warehouse_id, &signal).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("cancellation should end the request")
        .unwrap();
    assert_matches!(result, Err(ServiceError::Cancelled(_)));
    assert_eq!(cache.sets(), 0);
}

#[tokio::test]
async fn repository_errors_propagate_unchanged() {
    let world = World::new();
    let log = CallLog::default();
    let cache = Arc::new(CountingCache::default());
    let service = service_with(&world, &log, cache.clone(), |store| {
        store.inventory_transactions = Arc::new(FailingRepository);
    });

    let err = service
        .warehouse_dashboard(world.warehouse_id, &CancellationSignal::never())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DatabaseError(DbErr::Custom(msg)) if msg == FAILURE_MESSAGE);
    assert_eq!(cache.sets(), 0);
}

#[tokio::test]
async fn rebuilding_the_same_data_is_idempotent() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();

    let first = harness
        .service
        .category_dashboard(world.category_id, &signal)
        .await
        .unwrap();
    harness
        .service
        .invalidate(DashboardKind::Category, world.category_id)
        .await
        .unwrap();
    harness.log.clear();
    let second = harness
        .service
        .category_dashboard(world.category_id, &signal)
        .await
        .unwrap();

    assert!(harness.log.len() > 0, "invalidated entry must be rebuilt");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn corrupted_cache_entry_is_rebuilt() {
    let world = World::new();
    let harness = Harness::new(&world);
    let key = DashboardKind::Member.cache_key(world.member_id);
    harness.cache.set(&key, "{not json", None).await.unwrap();

    let dashboard = harness
        .service
        .member_dashboard(world.member_id, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(dashboard.member_id, world.member_id);
    assert_eq!(harness.log.count_of("Member"), 1);
    let raw = harness.cache.get(&key).await.unwrap().unwrap();
    assert!(raw.starts_with('{') && raw.contains(&world.member_id.to_string()));
}

#[tokio::test]
async fn concurrent_misses_are_collapsed_when_dedupe_is_enabled() {
    let world = World::new();
    let config = DashboardConfig {
        dedupe_inflight: true,
        ..DashboardConfig::default()
    };
    let harness = Harness::with_options(&world, config, Some(Duration::from_millis(10)));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let service = harness.service.clone();
        let id = world.warehouse_id;
        tasks.push(tokio::spawn(async move {
            service
                .warehouse_dashboard(id, &CancellationSignal::never())
                .await
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap());
    }

    assert_eq!(harness.log.count_of("Warehouse"), 1);
    assert_eq!(harness.cache.sets(), 1);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn warehouse_month_totals_from_signed_movements() {
    let world = World::new();
    let harness = Harness::new(&world);

    let dashboard = harness
        .service
        .warehouse_dashboard(world.warehouse_id, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(dashboard.warehouse_name, "Central");
    let march = dashboard.inventory_value_trend.last().unwrap();
    assert_eq!(march.label, "Mar 2024");
    assert_eq!(march.value, dec!(85));
    assert_eq!(dashboard.monthly_performance.last().unwrap().outbound_value, dec!(40));
    assert_eq!(dashboard.capacity.utilization_percentage, dec!(25));
}

#[tokio::test]
async fn category_dashboard_covers_the_whole_subtree() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();

    let root = harness
        .service
        .category_dashboard(world.category_id, &signal)
        .await
        .unwrap();
    assert_eq!(root.items.total_items, 3);
    assert_eq!(root.parent_category_name, None);

    let dairy = harness
        .service
        .category_dashboard(world.subcategory_id, &signal)
        .await
        .unwrap();
    assert_eq!(dairy.items.total_items, 2);
    assert_eq!(dairy.parent_category_name.as_deref(), Some("Groceries"));
}

#[tokio::test]
async fn supplier_and_member_dashboards_assemble() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();

    let supplier = harness
        .service
        .supplier_dashboard(world.supplier_id, &signal)
        .await
        .unwrap();
    assert_eq!(supplier.supplier_name, "Acme Foods");
    assert_eq!(supplier.orders.total_orders, 1);
    assert_eq!(supplier.ranking.overall_rank, 1);
    assert_eq!(supplier.ranking.total_suppliers, 2);

    let member = harness
        .service
        .member_dashboard(world.member_id, &signal)
        .await
        .unwrap();
    assert_eq!(member.member_name, "Ada Mensah");
    assert_eq!(member.loan_portfolio.total_loans, 1);
    assert_eq!(member.loan_portfolio.active_loans, 1);
}

#[tokio::test]
async fn trends_have_fixed_length_oldest_first() {
    let world = World::new();
    let harness = Harness::new(&world);
    let signal = CancellationSignal::never();

    let warehouse = harness
        .service
        .warehouse_dashboard(world.warehouse_id, &signal)
        .await
        .unwrap();
    let supplier = harness
        .service
        .supplier_dashboard(world.supplier_id, &signal)
        .await
        .unwrap();
    let category = harness
        .service
        .category_dashboard(world.category_id, &signal)
        .await
        .unwrap();

    for series in [
        &warehouse.receiving_trend,
        &supplier.order_value_trend,
        &category.sales_trend,
    ] {
        assert_eq!(series.len(), TREND_MONTHS);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(series[0].label, "Apr 2023");
        assert_eq!(series[TREND_MONTHS - 1].label, "Mar 2024");
    }
}
