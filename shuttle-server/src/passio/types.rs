//! PassioGO response DTOs.
//!
//! The provider is loose about types: ids and coordinates arrive as numbers
//! or strings depending on the system, and several fields are optional. Those
//! fields are kept as [`Value`] and normalized in `convert`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// PHP encodes an empty map as `[]`; accept either.
fn map_or_empty<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrSeq<T> {
        Map(HashMap<String, T>),
        Seq(Vec<serde::de::IgnoredAny>),
    }

    Ok(match MapOrSeq::deserialize(deserializer)? {
        MapOrSeq::Map(map) => map,
        MapOrSeq::Seq(_) => HashMap::new(),
    })
}

/// Response from `getStops`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopsResponse {
    /// Route id → ordered entries. The first entry is a route header
    /// (`[name, color, ...]`); the rest are `[position, stop id, ...]`.
    #[serde(default, deserialize_with = "map_or_empty")]
    pub routes: HashMap<String, Vec<Value>>,

    /// Keyed by `"ID<stop id>"`.
    #[serde(default, deserialize_with = "map_or_empty")]
    pub stops: HashMap<String, RawStop>,
}

/// A stop record inside `getStops`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
    /// Present on some systems as a single-route fallback for `routes`.
    #[serde(default)]
    pub route_id: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
}

/// Response from `getRoutes`. Some systems wrap the list in `all`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoutesResponse {
    Wrapped { all: Vec<RawRoute> },
    Bare(Vec<RawRoute>),
}

impl RoutesResponse {
    pub fn into_routes(self) -> Vec<RawRoute> {
        match self {
            RoutesResponse::Wrapped { all } => all,
            RoutesResponse::Bare(routes) => routes,
        }
    }
}

/// A route record inside `getRoutes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoute {
    /// The id stops and vehicles refer to.
    #[serde(default)]
    pub myid: Option<Value>,
    /// Internal id; used only when `myid` is missing.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub group_color: Option<String>,
}

/// Response from `getSystems`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemsResponse {
    #[serde(default)]
    pub all: Vec<RawSystem>,
}

/// A system record inside `getSystems`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSystem {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

/// Response from `getBuses`.
///
/// Vehicle records stay untyped: the route association appears under
/// different keys and shapes across systems.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusesResponse {
    #[serde(default, deserialize_with = "map_or_empty")]
    pub buses: HashMap<String, Vec<Value>>,
}
