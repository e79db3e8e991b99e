//! Conversion from PassioGO DTOs to domain types.
//!
//! Invalid records are logged and skipped rather than failing the whole
//! response. All the "is it a number or a string" probing lives here so the
//! rest of the crate only sees typed records.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::warn;

use crate::domain::{LiveRouteId, LiveStopId, Route, Stop, SystemId, TransitSystem, Vehicle, VehicleId};
use crate::geo::LatLng;

use super::types::{BusesResponse, RawRoute, StopsResponse, SystemsResponse};

/// Keys a vehicle record may use for its route association.
const ROUTE_KEY_FIELDS: &[&str] = &["routeId", "route_id", "routeIds", "route_ids", "routes"];

/// Keys a vehicle record may use for its id, in preference order.
const VEHICLE_ID_FIELDS: &[&str] = &["busId", "id", "vehicleId", "vehicle_id"];

/// Read a scalar as a non-empty trimmed string.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn scalar_f64(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Read a route position.
///
/// Positions arrive as a bare number, or as a list where the ordinal is the
/// second element.
fn route_position(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) if items.len() >= 2 => route_position(&items[1]),
        Value::Array(items) if items.len() == 1 => route_position(&items[0]),
        _ => None,
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Normalize a color to `#rrggbb` form.
fn normalize_color(color: Option<&str>) -> Option<String> {
    let color = non_empty(color)?;
    if color.starts_with('#') {
        Some(color)
    } else {
        Some(format!("#{color}"))
    }
}

/// Extract every route key a vehicle record reports.
///
/// Accepts any of [`ROUTE_KEY_FIELDS`], each either a scalar or a list of
/// scalars, strings or numbers. Nulls and empty strings are ignored.
pub fn route_keys(record: &Value) -> BTreeSet<LiveRouteId> {
    let mut keys = BTreeSet::new();
    let Some(object) = record.as_object() else {
        return keys;
    };

    for field in ROUTE_KEY_FIELDS {
        match object.get(*field) {
            Some(Value::Array(items)) => {
                keys.extend(items.iter().filter_map(scalar_string).map(LiveRouteId::new));
            }
            Some(value) => {
                if let Some(key) = scalar_string(value) {
                    keys.insert(LiveRouteId::new(key));
                }
            }
            None => {}
        }
    }

    keys
}

/// Convert a `getStops` response into stops with their route positions.
pub fn convert_stops(response: &StopsResponse) -> Vec<Stop> {
    let mut stops: Vec<Stop> = Vec::with_capacity(response.stops.len());

    for (key, raw) in &response.stops {
        let Some(id) = scalar_string(&raw.id) else {
            warn!(key = %key, "skipping stop without id");
            continue;
        };
        let (Some(lat), Some(lng)) = (scalar_f64(&raw.latitude), scalar_f64(&raw.longitude)) else {
            warn!(stop = %id, "skipping stop without coordinates");
            continue;
        };

        let mut stop = Stop::new(id, raw.name.as_deref().unwrap_or("").trim(), LatLng::new(lat, lng));

        // Single-route fallback; overridden by the route table below.
        if let Some(route) = raw.route_id.as_ref().and_then(scalar_string) {
            let position = raw.position.as_ref().and_then(route_position).unwrap_or(0);
            stop.route_positions.insert(LiveRouteId::new(route), position);
        }

        stops.push(stop);
    }

    for (route, entries) in &response.routes {
        let route = LiveRouteId::new(route);
        for entry in entries {
            let Some(items) = entry.as_array() else {
                continue;
            };
            if items.len() < 2 {
                continue;
            }
            let (Some(position), Some(stop_id)) =
                (route_position(&items[0]), scalar_string(&items[1]))
            else {
                continue;
            };
            let stop_id = LiveStopId::new(stop_id);
            // Header entries carry a color where the stop id would be and
            // never match a stop.
            if let Some(stop) = stops.iter_mut().find(|s| s.id == stop_id) {
                let slot = stop.route_positions.entry(route.clone()).or_insert(position);
                // A stop visited twice on one route keeps its first position,
                // so a loop's closing leg back to its start is not a graph
                // edge. Direct rides and the ETA ring wrap the chain instead.
                *slot = (*slot).min(position);
            }
        }
    }

    stops.sort_by(|a, b| a.id.cmp(&b.id));
    stops
}

/// Convert a `getSystems` response, skipping records without a usable id.
pub fn convert_systems(response: SystemsResponse) -> Vec<TransitSystem> {
    response
        .all
        .into_iter()
        .filter_map(|raw| {
            let id = scalar_string(&raw.id).and_then(|id| SystemId::parse(&id).ok());
            let Some(id) = id else {
                warn!(id = %raw.id, "skipping system without a valid id");
                return None;
            };
            Some(TransitSystem {
                id,
                name: non_empty(raw.fullname.as_deref()).unwrap_or_default(),
                username: non_empty(raw.username.as_deref()),
                homepage: non_empty(raw.homepage.as_deref()),
            })
        })
        .collect()
}

/// Convert `getRoutes` records into routes.
pub fn convert_routes(raw: Vec<RawRoute>) -> Vec<Route> {
    raw.into_iter()
        .filter_map(|r| {
            let id = r
                .myid
                .as_ref()
                .and_then(scalar_string)
                .or_else(|| r.id.as_ref().and_then(scalar_string))?;
            Some(Route {
                id: LiveRouteId::new(id),
                name: non_empty(r.name.as_deref()),
                short_name: non_empty(r.short_name.as_deref()),
                color: normalize_color(r.group_color.as_deref().or(r.color.as_deref())),
            })
        })
        .collect()
}

/// Convert a `getBuses` response into vehicles.
pub fn convert_vehicles(response: &BusesResponse) -> Vec<Vehicle> {
    let mut vehicles = Vec::new();

    for (key, records) in &response.buses {
        for record in records {
            let Some(object) = record.as_object() else {
                continue;
            };

            let id = VEHICLE_ID_FIELDS
                .iter()
                .find_map(|f| object.get(*f).and_then(scalar_string))
                .or_else(|| (key != "-1").then(|| key.clone()));
            let Some(id) = id else {
                continue;
            };

            let location = match (
                object.get("latitude").and_then(scalar_f64),
                object.get("longitude").and_then(scalar_f64),
            ) {
                (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
                _ => None,
            };

            let heading = object
                .get("calculatedCourse")
                .or_else(|| object.get("heading"))
                .and_then(scalar_f64);

            vehicles.push(Vehicle {
                id: VehicleId::new(id),
                location,
                routes: route_keys(record),
                heading,
            });
        }
    }

    vehicles.sort_by(|a, b| a.id.cmp(&b.id));
    vehicles
}
