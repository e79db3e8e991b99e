use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shuttle_server::cache::{CacheConfig, MokaResponseCache};
use shuttle_server::domain::SystemId;
use shuttle_server::gtfs::GtfsFeed;
use shuttle_server::passio::{PassioClient, PassioConfig};
use shuttle_server::planner::{Planner, PlannerConfig};
use shuttle_server::web::{AppState, FixedWindowLimiter, LimitConfig, create_router};

/// Harvard's PassioGO system.
const DEFAULT_SYSTEM_ID: &str = "831";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let system_id = std::env::var("PASSIO_SYSTEM_ID").unwrap_or_else(|_| DEFAULT_SYSTEM_ID.to_string());
    let default_system = SystemId::parse(&system_id).expect("PASSIO_SYSTEM_ID must be a positive integer");

    let mut passio_config = PassioConfig::default();
    if let Ok(url) = std::env::var("PASSIO_BASE_URL") {
        passio_config = passio_config.with_base_url(url);
    }
    let client = PassioClient::new(passio_config).expect("Failed to create PassioGO client");

    let mut planner = Planner::new(Arc::new(client), PlannerConfig::default());

    // The schedule feed is optional; without it the planner uses live data only.
    if let Ok(path) = std::env::var("GTFS_PATH") {
        let feed_system = match std::env::var("GTFS_SYSTEM_ID") {
            Ok(raw) => SystemId::parse(&raw).expect("GTFS_SYSTEM_ID must be a positive integer"),
            Err(_) => default_system,
        };
        match GtfsFeed::load(&path) {
            Ok(feed) => {
                info!(%path, system = %feed_system, "loaded schedule feed");
                planner = planner.with_feed(feed_system, Arc::new(feed));
            }
            Err(e) => warn!(%path, error = %e, "failed to load schedule feed, continuing without it"),
        }
    }

    let cache_config = CacheConfig::default();
    let state = AppState::new(
        planner,
        MokaResponseCache::new(&cache_config),
        FixedWindowLimiter::new(&LimitConfig::default()),
        default_system,
        cache_config,
    );

    let app = create_router(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .expect("BIND_ADDR must be a socket address");
    info!(%addr, system = %default_system, "shuttle planner listening");
    info!("endpoints: /health /systems /stops /nearest_stop /match_stops /vehicles /trip");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}
