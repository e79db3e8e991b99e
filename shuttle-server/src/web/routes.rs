//! HTTP route handlers.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::domain::{DomainError, SnapshotIndex, SystemId, validate_coordinate};
use crate::passio::LiveProvider;
use crate::planner::{PlanError, StopRef, TripRequest};

use super::dto::*;
use super::limit::{self, RateLimiter};
use super::state::AppState;

/// Create the application router.
pub fn create_router<P, C, L>(state: AppState<P, C, L>) -> Router
where
    P: LiveProvider + 'static,
    C: ResponseCache + 'static,
    L: RateLimiter + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/systems", get(list_systems::<P, C, L>))
        .route("/stops", get(list_stops::<P, C, L>))
        .route("/nearest_stop", get(nearest_stop::<P, C, L>))
        .route("/match_stops", get(match_stops::<P, C, L>))
        .route("/vehicles", get(list_vehicles::<P, C, L>))
        .route("/trip", get(plan_trip::<P, C, L>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "shuttle planner is running".to_string(),
    })
}

fn system_or(raw: Option<&str>, default: SystemId) -> Result<SystemId, AppError> {
    match raw {
        Some(s) => Ok(SystemId::parse(s)?),
        None => Ok(default),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Bytes, AppError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| AppError::Internal {
            message: format!("failed to serialize response: {e}"),
        })
}

fn json_response(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Key a client by its forwarded address, else its peer address.
fn client_key(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Every system the provider serves, sorted by name.
async fn list_systems<P, C, L>(State(state): State<AppState<P, C, L>>) -> Result<Response, AppError>
where
    P: LiveProvider,
    C: ResponseCache,
{
    let key = "systems".to_string();
    if let Some(body) = state.cache.get(&key).await {
        return Ok(json_response(body));
    }

    let systems = state.planner.systems().await?;
    let body = to_json(&systems)?;
    state
        .cache
        .set_with_ttl(key, body.clone(), state.cache_config.stops_ttl)
        .await;
    Ok(json_response(body))
}

/// Every stop of a system.
async fn list_stops<P, C, L>(
    State(state): State<AppState<P, C, L>>,
    query: Result<Query<SystemQuery>, QueryRejection>,
) -> Result<Response, AppError>
where
    P: LiveProvider,
    C: ResponseCache,
{
    let Query(req) = query?;
    let system = system_or(req.system_id.as_deref(), state.default_system)?;

    let key = format!("stops:{system}");
    if let Some(body) = state.cache.get(&key).await {
        return Ok(json_response(body));
    }

    let snapshot = state.planner.snapshot(system).await?;
    let body = to_json(&stop_results(&snapshot.stops))?;
    state
        .cache
        .set_with_ttl(key, body.clone(), state.cache_config.stops_ttl)
        .await;
    Ok(json_response(body))
}

/// The stop nearest a point.
async fn nearest_stop<P, C, L>(
    State(state): State<AppState<P, C, L>>,
    query: Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<NearestStopResponse>, AppError>
where
    P: LiveProvider,
{
    let Query(req) = query?;
    let point = validate_coordinate(req.lat, req.lng)?;
    let system = system_or(req.system_id.as_deref(), state.default_system)?;

    let snapshot = state.planner.snapshot(system).await?;
    let nearest = SnapshotIndex::new(&snapshot).nearest_stop(point);

    Ok(Json(NearestStopResponse {
        stop: nearest.map(|(stop, _)| StopRef::from(stop)),
        distance_m: nearest.map(|(_, d)| d),
    }))
}

/// Snap both ends of a trip to stops.
async fn match_stops<P, C, L>(
    State(state): State<AppState<P, C, L>>,
    query: Result<Query<TripQuery>, QueryRejection>,
) -> Result<Json<MatchStopsResponse>, AppError>
where
    P: LiveProvider,
{
    let Query(req) = query?;
    let origin = validate_coordinate(req.lat, req.lng)?;
    let destination = validate_coordinate(req.lat2, req.lng2)?;
    let system = system_or(req.system_id.as_deref(), state.default_system)?;

    let (origin, destination) = state.planner.match_stops(system, origin, destination).await?;
    Ok(Json(MatchStopsResponse { origin, destination }))
}

/// Current vehicle positions.
async fn list_vehicles<P, C, L>(
    State(state): State<AppState<P, C, L>>,
    query: Result<Query<SystemQuery>, QueryRejection>,
) -> Result<Json<Vec<VehicleResult>>, AppError>
where
    P: LiveProvider,
{
    let Query(req) = query?;
    let system = system_or(req.system_id.as_deref(), state.default_system)?;

    let snapshot = state.planner.snapshot(system).await?;
    let index = SnapshotIndex::new(&snapshot);
    let vehicles = snapshot
        .vehicles
        .iter()
        .map(|v| {
            let route = v.routes.iter().next().and_then(|r| index.route(r));
            VehicleResult::new(v, route)
        })
        .collect();
    Ok(Json(vehicles))
}

/// Plan a trip between two points.
async fn plan_trip<P, C, L>(
    State(state): State<AppState<P, C, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    query: Result<Query<TripQuery>, QueryRejection>,
) -> Result<Response, AppError>
where
    P: LiveProvider,
    C: ResponseCache,
    L: RateLimiter,
{
    let client = client_key(&headers, peer.as_ref());
    if !limit::allow(state.limiter.as_ref(), &client).await {
        return Err(AppError::TooManyRequests {
            message: "too many trip requests, slow down".to_string(),
        });
    }

    let Query(req) = query?;
    let system = system_or(req.system_id.as_deref(), state.default_system)?;
    let request = TripRequest::new(system, (req.lat, req.lng), (req.lat2, req.lng2))?.with_debug(req.debug);

    let key = format!(
        "trip:{system}:{:.5},{:.5}:{:.5},{:.5}:{}",
        req.lat, req.lng, req.lat2, req.lng2, req.debug
    );
    if let Some(body) = state.cache.get(&key).await {
        return Ok(json_response(body));
    }

    let trip = state.planner.plan_trip(request).await?;
    let body = to_json(&trip)?;
    state
        .cache
        .set_with_ttl(key, body.clone(), state.cache_config.trip_ttl)
        .await;
    Ok(json_response(body))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    TooManyRequests { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest {
            message: e.body_text(),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        let message = e.to_string();
        match e {
            PlanError::Invalid(_) => AppError::BadRequest { message },
            PlanError::NoStopFound(_) | PlanError::NoPathFound { .. } => AppError::NotFound { message },
            PlanError::Upstream(_) => AppError::Unavailable { message },
            PlanError::EnrichmentFailed { .. } => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::TooManyRequests { message } => (StatusCode::TOO_MANY_REQUESTS, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            warn!(%status, %message, "request failed");
        } else {
            debug!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::{CacheConfig, MokaResponseCache};
    use crate::domain::{LiveRouteId, LiveSnapshot, Route, Stop, TransitSystem, Vehicle, VehicleId};
    use crate::geo::{LatLng, offset_m};
    use crate::passio::StaticProvider;
    use crate::planner::{Planner, PlannerConfig};
    use crate::web::limit::{FixedWindowLimiter, LimitConfig};
    use serde_json::Value;

    fn origin() -> LatLng {
        LatLng::new(42.3736, -71.1190)
    }

    fn system() -> SystemId {
        SystemId::new(831).unwrap()
    }

    fn snapshot() -> LiveSnapshot {
        let a = origin();
        let mut route = Route::new("R1", "Allston Loop");
        route.color = Some("a51c30".into());
        LiveSnapshot {
            stops: vec![
                Stop::new("A", "Annenberg", a).on_route("R1", 0),
                Stop::new("B", "Boylston", offset_m(a, 200.0, 0.0)).on_route("R1", 1),
                Stop::new("C", "Canaday", offset_m(a, 0.0, 200.0)).on_route("R1", 2),
                Stop::new("Z", "Stadium", offset_m(a, 5_000.0, 0.0)),
            ],
            routes: vec![route],
            vehicles: vec![Vehicle {
                id: VehicleId::new("501"),
                location: Some(offset_m(a, 0.0, 100.0)),
                routes: [LiveRouteId::new("R1")].into_iter().collect(),
                heading: Some(270.0),
            }],
        }
    }

    async fn serve(provider: Arc<StaticProvider>, max_requests: u32) -> String {
        let planner = Planner::new(provider, PlannerConfig::default());
        let limiter = FixedWindowLimiter::new(&LimitConfig {
            max_requests,
            ..LimitConfig::default()
        });
        let state = AppState::new(
            planner,
            MokaResponseCache::default(),
            limiter,
            system(),
            CacheConfig::default(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn trip_url(base: &str, to: LatLng) -> String {
        let o = origin();
        format!("{base}/trip?lat={}&lng={}&lat2={}&lng2={}", o.lat, o.lng, to.lat, to.lng)
    }

    async fn get(url: &str) -> (StatusCode, Value) {
        let resp = client().get(url).send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn health_check() {
        let base = serve(Arc::new(StaticProvider::new()), 30).await;
        let (status, body) = get(&format!("{base}/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn systems_sorted_by_name() {
        let provider = Arc::new(StaticProvider::new());
        provider.set_systems(vec![
            TransitSystem {
                id: SystemId::new(1068).unwrap(),
                name: "chapel Hill Transit".into(),
                username: Some("chapelhill".into()),
                homepage: None,
            },
            TransitSystem {
                id: system(),
                name: "Harvard University".into(),
                username: Some("harvard".into()),
                homepage: Some("https://www.transportation.harvard.edu".into()),
            },
            TransitSystem {
                id: SystemId::new(5).unwrap(),
                name: "Boston University".into(),
                username: None,
                homepage: None,
            },
        ]);
        let base = serve(provider.clone(), 30).await;

        let (status, body) = get(&format!("{base}/systems")).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Boston University", "chapel Hill Transit", "Harvard University"]);
        assert_eq!(body[2]["id"], 831);
        assert_eq!(body[2]["username"], "harvard");
        assert!(body[0]["homepage"].is_null());

        // Served from the cache the second time.
        let calls = provider.call_count();
        assert_eq!(get(&format!("{base}/systems")).await.1, body);
        assert_eq!(provider.call_count(), calls);
    }

    #[tokio::test]
    async fn trip_returns_segments() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 30).await;
        let b = offset_m(origin(), 200.0, 0.0);

        let (status, body) = get(&trip_url(&base, b)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["system_id"], 831);
        assert_eq!(body["origin"]["nearest_stop"]["id"], "A");
        assert_eq!(body["destination"]["nearest_stop"]["id"], "B");
        assert_eq!(body["strategy"], "direct");
        let segments = body["segments"].as_array().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0]["route"]["name"], "Allston Loop");
        assert_eq!(segments[0]["next_bus"]["vehicle_id"], "501");
        assert_eq!(segments[0]["next_bus"]["speed_source"], "fallback");
        assert!(body.get("candidates").is_none());
    }

    #[tokio::test]
    async fn trip_debug_lists_candidates() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 30).await;
        let url = format!("{}&debug=true", trip_url(&base, offset_m(origin(), 200.0, 0.0)));
        let (status, body) = get(&url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidates"][0]["strategy"], "direct");
    }

    #[tokio::test]
    async fn invalid_coordinates_rejected() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider.clone(), 30).await;
        let (status, body) = get(&format!("{base}/trip?lat=95&lng=0&lat2=0&lng2=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid latitude: 95");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_parameters_rejected() {
        let base = serve(Arc::new(StaticProvider::new()), 30).await;
        let (status, body) = get(&format!("{base}/trip?lat=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bad_system_id_rejected() {
        let base = serve(Arc::new(StaticProvider::new()), 30).await;
        let (status, body) = get(&format!("{base}/stops?system_id=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid system id: abc");
    }

    #[tokio::test]
    async fn upstream_down_is_503() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        provider.set_failing(true);
        let base = serve(provider, 30).await;
        let (status, _) = get(&trip_url(&base, offset_m(origin(), 200.0, 0.0))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn no_path_is_404() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 30).await;
        let (status, body) = get(&trip_url(&base, offset_m(origin(), 5_000.0, 0.0))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no path found between A and Z");
    }

    #[tokio::test]
    async fn trip_requests_are_rate_limited() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 2).await;
        let url = trip_url(&base, offset_m(origin(), 200.0, 0.0));
        assert_eq!(get(&url).await.0, StatusCode::OK);
        assert_eq!(get(&url).await.0, StatusCode::OK);
        let (status, body) = get(&url).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].is_string());
        // Other endpoints are not limited.
        assert_eq!(get(&format!("{base}/stops")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn stops_are_cached() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider.clone(), 30).await;
        let (_, first) = get(&format!("{base}/stops")).await;
        let calls = provider.call_count();
        let (_, second) = get(&format!("{base}/stops")).await;
        assert_eq!(first, second);
        assert_eq!(first.as_array().unwrap().len(), 4);
        assert_eq!(provider.call_count(), calls);
    }

    #[tokio::test]
    async fn nearest_stop_and_empty_system() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        provider.set_snapshot(SystemId::new(2).unwrap(), LiveSnapshot::default());
        let base = serve(provider, 30).await;
        let o = origin();

        let (status, body) = get(&format!("{base}/nearest_stop?lat={}&lng={}", o.lat, o.lng)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stop"]["id"], "A");

        let (status, body) =
            get(&format!("{base}/nearest_stop?lat={}&lng={}&system_id=2", o.lat, o.lng)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["stop"].is_null());
        assert!(body["distance_m"].is_null());
    }

    #[tokio::test]
    async fn match_stops_snaps_both_ends() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 30).await;
        let o = origin();
        let b = offset_m(o, 195.0, 0.0);
        let (status, body) = get(&format!(
            "{base}/match_stops?lat={}&lng={}&lat2={}&lng2={}",
            o.lat, o.lng, b.lat, b.lng
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"]["nearest_stop"]["id"], "A");
        assert_eq!(body["destination"]["nearest_stop"]["id"], "B");
    }

    #[tokio::test]
    async fn vehicles_carry_route_colour() {
        let provider = Arc::new(StaticProvider::with_system(system(), snapshot()));
        let base = serve(provider, 30).await;
        let (status, body) = get(&format!("{base}/vehicles")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "501");
        assert_eq!(body[0]["route_id"], "R1");
        assert_eq!(body[0]["color"], "#a51c30");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let base = serve(Arc::new(StaticProvider::new()), 30).await;
        let resp = client()
            .get(format!("{base}/health"))
            .header("origin", "https://example.org")
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, None), "unknown");
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000)));
        assert_eq!(client_key(&headers, Some(&peer)), "10.0.0.1");
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, Some(&peer)), "203.0.113.7");
    }

    #[test]
    fn plan_errors_map_to_status() {
        use crate::planner::Endpoint;
        let resp = AppError::from(PlanError::NoStopFound(Endpoint::Origin)).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = AppError::from(PlanError::EnrichmentFailed { candidates: 2 }).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = AppError::from(PlanError::Invalid(DomainError::InvalidLongitude(200.0))).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
