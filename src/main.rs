//! Campaign Lens server.
//!
//! # Environment
//!
//! - `LENS_PORT` - Listen port (default 3000)
//! - `LENS_DATASET_PATH` - Dataset JSON file (default `data/dataset.json`)
//! - `LENS_PAGE_SIZE` - Groups per page (default 10)
//! - `LENS_RECENT_CAMPAIGNS` - Campaigns in the recent view (default 10)
//! - `RUST_LOG` - Log filter, on top of `campaign_lens=info`

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use campaign_lens::api::{AppState, router};
use campaign_lens::config::Config;
use campaign_lens::dashboard::{Dashboard, DashboardConfig};
use campaign_lens::ingest::load_dataset;
use campaign_lens::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("campaign_lens=info".parse()?))
        .init();

    // Load configuration from environment
    let config = Config::from_env()?;
    info!(
        port = config.port,
        dataset = %config.dataset_path,
        page_size = config.page_size,
        "Starting Campaign Lens server"
    );

    // Load the dataset and enrich it into the store
    let dataset = load_dataset(&config.dataset_path)?;
    let store = Store::new(dataset);

    // Create application state
    let state = AppState {
        dashboard: Dashboard::new(store, DashboardConfig::from(&config)),
    };

    // Build router
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Campaign Lens is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
