//! Directed route graphs.
//!
//! A [`RouteGraph`] maps each stop to its outgoing ride edges and records the
//! ordered stop chain of every route. The same structure serves the live
//! namespace ([`LiveGraph`]) and the schedule-feed namespace
//! ([`FeedGraph`]), so the path search is written once.

mod cache;
mod feed;
mod live;

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::{FeedRouteId, FeedStopId, LiveRouteId, LiveStopId};

pub use cache::{GraphCache, GraphCacheConfig};
pub use feed::build_feed_graph;
pub use live::build_live_graph;

/// A directed ride edge between two consecutive stops of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<S, R> {
    pub to: S,
    pub route: R,
    pub distance_m: f64,
}

/// Adjacency lists plus per-route stop chains.
///
/// Read-only once built; shared between requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RouteGraph<S, R> {
    adjacency: HashMap<S, Vec<Edge<S, R>>>,
    chains: HashMap<R, Vec<S>>,
}

pub type LiveGraph = RouteGraph<LiveStopId, LiveRouteId>;
pub type FeedGraph = RouteGraph<FeedStopId, FeedRouteId>;

impl<S, R> Default for RouteGraph<S, R> {
    fn default() -> Self {
        Self {
            adjacency: HashMap::new(),
            chains: HashMap::new(),
        }
    }
}

impl<S, R> RouteGraph<S, R>
where
    S: Clone + Eq + Hash,
    R: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge unless one with the same target and route already leaves
    /// `from`.
    ///
    /// Returns whether the edge was added.
    pub fn add_edge(&mut self, from: S, edge: Edge<S, R>) -> bool {
        let edges = self.adjacency.entry(from).or_default();
        if edges
            .iter()
            .any(|e| e.to == edge.to && e.route == edge.route)
        {
            return false;
        }
        edges.push(edge);
        true
    }

    pub fn set_chain(&mut self, route: R, chain: Vec<S>) {
        self.chains.insert(route, chain);
    }

    pub fn edges_from(&self, stop: &S) -> &[Edge<S, R>] {
        self.adjacency.get(stop).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ordered stops of `route`.
    pub fn chain(&self, route: &R) -> Option<&[S]> {
        self.chains.get(route).map(Vec::as_slice)
    }

    pub fn routes(&self) -> impl Iterator<Item = &R> {
        self.chains.keys()
    }

    /// Number of stops with at least one outgoing edge.
    pub fn stop_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}
