use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{info, warn};

use erp_dashboards as app;
use app::{
    cache::CacheFactory,
    repositories::{MicrofinanceRepositories, StoreRepositories},
    services::dashboards::DashboardService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = app::config::load_config()?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);
    app::handlers::health::init_start_time();

    let db = Arc::new(app::db::establish_connection_from_app_config(&cfg).await?);
    let cache = CacheFactory::create_cache(cfg.cache());

    let dashboards = DashboardService::new(
        StoreRepositories::sea_orm(db.clone()),
        MicrofinanceRepositories::sea_orm(db.clone()),
        cache.clone(),
        &cfg.dashboard,
    );
    if cfg.dashboard.dedupe_inflight {
        info!("Concurrent cache misses for the same dashboard will be collapsed");
    }

    let state = app::AppState {
        config: cfg.clone(),
        dashboards: Arc::new(dashboards),
        cache,
        db: Some(db),
    };
    let router = app::app_router(state);

    let addr: SocketAddr = match format!("{}:{}", cfg.host, cfg.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid host {:?} ({}), binding to 0.0.0.0", cfg.host, e);
            SocketAddr::from(([0, 0, 0, 0], cfg.port))
        }
    };
    info!("erp-dashboards listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
