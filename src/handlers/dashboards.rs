use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    dashboards::{
        category::CategoryDashboard, member::MemberDashboard, supplier::SupplierDashboard,
        warehouse::WarehouseDashboard,
    },
    errors::ApiError,
    handlers::AppState,
    services::dashboards::CancellationSignal,
    ApiResponse,
};

/// Cancels its signal when the request deadline passes. Dropping it (because
/// the response finished or the client went away) stops the timer.
struct Deadline(JoinHandle<()>);

impl Drop for Deadline {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn deadline_signal(timeout: Duration) -> (CancellationSignal, Deadline) {
    let (handle, signal) = CancellationSignal::new();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        handle.cancel();
    });
    (signal, Deadline(timer))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboards/warehouses/{id}",
    summary = "Warehouse dashboard",
    description = "Capacity, stock health, movement, task and receiving metrics for one warehouse",
    params(("id" = Uuid, Path, description = "Warehouse id")),
    responses(
        (status = 200, description = "Dashboard assembled", body = ApiResponse<WarehouseDashboard>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 499, description = "Request cancelled", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "dashboards"
)]
pub async fn get_warehouse_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WarehouseDashboard>>, ApiError> {
    let (signal, _deadline) = deadline_signal(state.config.request_timeout());
    let dashboard = state.dashboards.warehouse_dashboard(id, &signal).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboards/suppliers/{id}",
    summary = "Supplier dashboard",
    description = "Spend, order, delivery and portfolio metrics for one supplier, with its ranking",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Dashboard assembled", body = ApiResponse<SupplierDashboard>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 499, description = "Request cancelled", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "dashboards"
)]
pub async fn get_supplier_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SupplierDashboard>>, ApiError> {
    let (signal, _deadline) = deadline_signal(state.config.request_timeout());
    let dashboard = state.dashboards.supplier_dashboard(id, &signal).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboards/categories/{id}",
    summary = "Category dashboard",
    description = "Item, inventory, sales and purchasing metrics across a category subtree",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Dashboard assembled", body = ApiResponse<CategoryDashboard>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 499, description = "Request cancelled", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "dashboards"
)]
pub async fn get_category_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CategoryDashboard>>, ApiError> {
    let (signal, _deadline) = deadline_signal(state.config.request_timeout());
    let dashboard = state.dashboards.category_dashboard(id, &signal).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboards/members/{id}",
    summary = "Member dashboard",
    description = "Loans, savings, shares, deposits, fees and credit indicators for one member",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "Dashboard assembled", body = ApiResponse<MemberDashboard>),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse),
        (status = 499, description = "Request cancelled", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "dashboards"
)]
pub async fn get_member_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MemberDashboard>>, ApiError> {
    let (signal, _deadline) = deadline_signal(state.config.request_timeout());
    let dashboard = state.dashboards.member_dashboard(id, &signal).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// Routes mounted under `/api/v1/dashboards`.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses/:id", get(get_warehouse_dashboard))
        .route("/suppliers/:id", get(get_supplier_dashboard))
        .route("/categories/:id", get(get_category_dashboard))
        .route("/members/:id", get(get_member_dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_cancels_after_timeout() {
        let (signal, _deadline) = deadline_signal(Duration::from_millis(5));
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("deadline should fire");
    }

    #[tokio::test]
    async fn dropped_deadline_never_fires() {
        let (signal, deadline) = deadline_signal(Duration::from_millis(5));
        drop(deadline);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!signal.is_cancelled());
    }
}
