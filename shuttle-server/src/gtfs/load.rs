//! CSV parsing for the feed tables.
//!
//! Each table is read whole, a leading UTF-8 byte-order mark is dropped, and
//! rows are deserialized with serde. Fields are trimmed; unknown columns are
//! ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{FeedRouteId, FeedStopId, FeedTripId, ShapeId};
use crate::geo::LatLng;

use super::error::FeedError;
use super::types::{FeedRoute, FeedStop, FeedTrip, StopTime};

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    #[serde(default)]
    stop_name: String,
    stop_lat: f64,
    stop_lon: f64,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    route_id: String,
    #[serde(default)]
    route_short_name: String,
    #[serde(default)]
    route_long_name: String,
    #[serde(default)]
    route_color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TripRow {
    route_id: String,
    #[serde(default)]
    service_id: String,
    trip_id: String,
    #[serde(default)]
    direction_id: Option<u8>,
    #[serde(default)]
    shape_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    #[serde(default)]
    arrival_time: String,
    #[serde(default)]
    departure_time: String,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct ShapeRow {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

/// Read every row of `dir/file`.
fn read_rows<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, FeedError> {
    let contents = std::fs::read_to_string(dir.join(file)).map_err(|source| FeedError::Io {
        file: file.to_string(),
        source,
    })?;
    parse_rows(&contents, file)
}

fn parse_rows<T: DeserializeOwned>(contents: &str, file: &str) -> Result<Vec<T>, FeedError> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.map_err(|source| FeedError::Csv {
            file: file.to_string(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub(super) fn load_stops(dir: &Path) -> Result<HashMap<FeedStopId, FeedStop>, FeedError> {
    let rows: Vec<StopRow> = read_rows(dir, "stops.txt")?;
    Ok(rows
        .into_iter()
        .map(|r| {
            let id = FeedStopId::new(&r.stop_id);
            let stop = FeedStop {
                id: id.clone(),
                name: r.stop_name,
                location: LatLng::new(r.stop_lat, r.stop_lon),
            };
            (id, stop)
        })
        .collect())
}

pub(super) fn load_routes(dir: &Path) -> Result<HashMap<FeedRouteId, FeedRoute>, FeedError> {
    let rows: Vec<RouteRow> = read_rows(dir, "routes.txt")?;
    Ok(rows
        .into_iter()
        .map(|r| {
            let id = FeedRouteId::new(&r.route_id);
            let route = FeedRoute {
                id: id.clone(),
                short_name: r.route_short_name,
                long_name: r.route_long_name,
                color: r.route_color.filter(|c| !c.is_empty()),
            };
            (id, route)
        })
        .collect())
}

pub(super) fn load_trips(dir: &Path) -> Result<HashMap<FeedTripId, FeedTrip>, FeedError> {
    let rows: Vec<TripRow> = read_rows(dir, "trips.txt")?;
    Ok(rows
        .into_iter()
        .map(|r| {
            let id = FeedTripId::new(&r.trip_id);
            let trip = FeedTrip {
                id: id.clone(),
                route: FeedRouteId::new(&r.route_id),
                service_id: r.service_id,
                direction: r.direction_id,
                shape: r.shape_id.filter(|s| !s.is_empty()).map(ShapeId::new),
            };
            (id, trip)
        })
        .collect())
}

/// Stop times grouped by trip, each sorted by `stop_sequence`.
pub(super) fn load_stop_times(dir: &Path) -> Result<HashMap<FeedTripId, Vec<StopTime>>, FeedError> {
    let rows: Vec<StopTimeRow> = read_rows(dir, "stop_times.txt")?;
    let mut by_trip: HashMap<FeedTripId, Vec<StopTime>> = HashMap::new();
    for r in rows {
        let trip = FeedTripId::new(&r.trip_id);
        by_trip.entry(trip.clone()).or_default().push(StopTime {
            trip,
            stop: FeedStopId::new(&r.stop_id),
            sequence: r.stop_sequence,
            arrival: r.arrival_time,
            departure: r.departure_time,
        });
    }
    for times in by_trip.values_mut() {
        times.sort_by_key(|st| st.sequence);
    }
    Ok(by_trip)
}

/// Shape polylines, each sorted by `shape_pt_sequence`.
///
/// `shapes.txt` is optional in a feed; a missing file yields no shapes.
pub(super) fn load_shapes(dir: &Path) -> Result<HashMap<ShapeId, Vec<LatLng>>, FeedError> {
    if !dir.join("shapes.txt").exists() {
        return Ok(HashMap::new());
    }
    let rows: Vec<ShapeRow> = read_rows(dir, "shapes.txt")?;
    let mut raw: HashMap<ShapeId, Vec<(u32, LatLng)>> = HashMap::new();
    for r in rows {
        raw.entry(ShapeId::new(&r.shape_id))
            .or_default()
            .push((r.shape_pt_sequence, LatLng::new(r.shape_pt_lat, r.shape_pt_lon)));
    }
    Ok(raw
        .into_iter()
        .map(|(id, mut points)| {
            points.sort_by_key(|(seq, _)| *seq);
            (id, points.into_iter().map(|(_, p)| p).collect())
        })
        .collect())
}
