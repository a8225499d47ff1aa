use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, ValueEnum};
use erp_dashboards::{
    cache::InMemoryCache,
    config::{self, DashboardConfig},
    db,
    repositories::{Fixture, MicrofinanceRepositories, StoreRepositories},
    services::dashboards::{CancellationSignal, DashboardService, FixedClock},
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Warehouse,
    Supplier,
    Category,
    Member,
}

#[derive(Parser)]
#[command(
    name = "dashboard-cli",
    about = "Print a warehouse, supplier, category or member dashboard as JSON",
    version
)]
struct Cli {
    /// Dashboard to build
    #[arg(value_enum)]
    kind: Kind,
    /// Subject id
    id: Uuid,
    /// JSON fixture with `store` and `microfinance` snapshots
    #[arg(long, conflicts_with = "database_url")]
    fixture: Option<PathBuf>,
    /// Database to read from; defaults to the configured `database_url`
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Build as if the current time were this RFC 3339 instant
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,
    #[arg(long, action = ArgAction::SetTrue, help = "Print compact instead of pretty JSON")]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("warn", false);

    let (store, microfinance) = match (&cli.fixture, &cli.database_url) {
        (Some(path), _) => Fixture::load(path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?
            .into_repositories(),
        (None, url) => {
            let mut cfg = config::load_config().context("failed to load configuration")?;
            if let Some(url) = url {
                cfg.database_url = url.clone();
            }
            if cfg.database_url.trim().is_empty() {
                bail!("pass --fixture or --database-url");
            }
            let pool = Arc::new(
                db::establish_connection_from_app_config(&cfg)
                    .await
                    .context("failed to connect to database")?,
            );
            (
                StoreRepositories::sea_orm(pool.clone()),
                MicrofinanceRepositories::sea_orm(pool),
            )
        }
    };

    let mut service = DashboardService::new(
        store,
        microfinance,
        Arc::new(InMemoryCache::new()),
        &DashboardConfig::default(),
    );
    if let Some(as_of) = cli.as_of {
        debug!(%as_of, "using fixed clock");
        service = service.with_clock(Arc::new(FixedClock(as_of)));
    }

    let signal = CancellationSignal::never();
    match cli.kind {
        Kind::Warehouse => print_json(&service.warehouse_dashboard(cli.id, &signal).await?, cli.compact),
        Kind::Supplier => print_json(&service.supplier_dashboard(cli.id, &signal).await?, cli.compact),
        Kind::Category => print_json(&service.category_dashboard(cli.id, &signal).await?, cli.compact),
        Kind::Member => print_json(&service.member_dashboard(cli.id, &signal).await?, cli.compact),
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", rendered);
    Ok(())
}
