use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ERP Dashboards API",
        version = "1.0.0",
        description = r#"
# ERP Performance Dashboards

Read-only dashboards summarising a single warehouse, supplier, product category
or microfinance member. Every response is assembled from the underlying
records on demand and cached for a few minutes.

## Error Handling

Errors share one envelope:

```json
{
  "error": "Not Found",
  "message": "Not found: Warehouse 550e8400-e29b-41d4-a716-446655440000 not found",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Requests that exceed the server deadline end with status 499.
"#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "dashboards", description = "Entity performance dashboards")
    ),
    paths(
        crate::handlers::dashboards::get_warehouse_dashboard,
        crate::handlers::dashboards::get_supplier_dashboard,
        crate::handlers::dashboards::get_category_dashboard,
        crate::handlers::dashboards::get_member_dashboard,
    ),
    components(
        schemas(
            crate::dashboards::warehouse::WarehouseDashboard,
            crate::dashboards::supplier::SupplierDashboard,
            crate::dashboards::category::CategoryDashboard,
            crate::dashboards::member::MemberDashboard,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_dashboard_route() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("ERP Dashboards API"));
        for path in ["warehouses", "suppliers", "categories", "members"] {
            assert!(json.contains(&format!("/api/v1/dashboards/{}/{{id}}", path)));
        }
        assert!(json.contains("WarehouseDashboard"));
    }
}
