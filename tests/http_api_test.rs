mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{now, World};
use erp_dashboards::{
    app_router,
    cache::{CacheBackend, InMemoryCache},
    config::{AppConfig, DashboardConfig},
    repositories::{MicrofinanceRepositories, StoreRepositories},
    services::dashboards::{DashboardService, FixedClock},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

fn router(world: &World) -> Router {
    let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
    let dashboards = DashboardService::new(
        StoreRepositories::in_memory(world.store.clone()),
        MicrofinanceRepositories::in_memory(world.microfinance.clone()),
        cache.clone(),
        &DashboardConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(now())));

    app_router(AppState {
        config: AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        ),
        dashboards: Arc::new(dashboards),
        cache,
        db: None,
    })
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn serves_each_dashboard_in_the_response_envelope() {
    let world = World::new();
    let cases = [
        (format!("/api/v1/dashboards/warehouses/{}", world.warehouse_id), "warehouse_name", "Central"),
        (format!("/api/v1/dashboards/suppliers/{}", world.supplier_id), "supplier_name", "Acme Foods"),
        (format!("/api/v1/dashboards/categories/{}", world.category_id), "category_name", "Groceries"),
        (format!("/api/v1/dashboards/members/{}", world.member_id), "member_name", "Ada Mensah"),
    ];

    for (uri, field, expected) in cases {
        let (status, body) = get(router(&world), &uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["success"], Value::Bool(true));
        assert_eq!(body["data"][field], Value::String(expected.into()));
        assert!(body["meta"]["timestamp"].is_string());
    }
}

#[tokio::test]
async fn unknown_subject_is_a_404_with_error_body() {
    let world = World::new();
    let uri = format!("/api/v1/dashboards/members/{}", Uuid::new_v4());

    let (status, body) = get(router(&world), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], Value::String("Not Found".into()));
    assert!(body["message"].as_str().unwrap().contains("Member"));
}

#[tokio::test]
async fn malformed_id_is_rejected() {
    let world = World::new();
    let (status, _) = get(router(&world), "/api/v1/dashboards/warehouses/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_openapi_routes_respond() {
    let world = World::new();

    let (status, body) = get(router(&world), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], Value::String("up".into()));

    let (status, body) = get(router(&world), "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("database").is_none());

    let (status, body) = get(router(&world), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/dashboards/warehouses/{id}"].is_object());
}
