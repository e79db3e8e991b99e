//! Bounded multi-path search over a route graph.
//!
//! A breadth-first search that keeps whole paths in its states so it can
//! return several distinct routes between two stops, not just the shortest.
//! The search is not guaranteed to find the best path; it stops at the first
//! `max_paths` it meets, and gives up after `max_expansions` states.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use tracing::{debug, trace};

use crate::graph::RouteGraph;

/// Limits for one search.
#[derive(Debug, Clone, Copy)]
pub struct PathLimits {
    pub max_paths: usize,
    pub max_transfers: usize,
    pub max_depth: usize,
    pub max_expansions: usize,
}

/// A path through the graph.
///
/// `routes[i]` is the route of the edge from `stops[i]` to `stops[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath<S, R> {
    pub stops: Vec<S>,
    pub routes: Vec<R>,
    pub transfers: usize,
    /// Sum of edge lengths in metres.
    pub distance_m: f64,
}

impl<S, R> GraphPath<S, R> {
    pub fn edge_count(&self) -> usize {
        self.routes.len()
    }
}

/// Paths found plus how much work it took.
#[derive(Debug, Clone)]
pub struct PathSearchResult<S, R> {
    pub paths: Vec<GraphPath<S, R>>,
    pub expanded: usize,
    /// Whether the expansion cap cut the search short.
    pub truncated: bool,
}

/// BFS state: a partial path ending at its last stop.
#[derive(Clone)]
struct SearchState<S, R> {
    stops: Vec<S>,
    routes: Vec<R>,
    transfers: usize,
    distance_m: f64,
}

/// Find up to `limits.max_paths` distinct paths from `origin` to
/// `destination`.
///
/// No returned path visits a stop twice or changes route more than
/// `limits.max_transfers` times. When `origin == destination` the result is
/// a single path with no edges.
pub fn find_paths<S, R>(
    graph: &RouteGraph<S, R>,
    origin: &S,
    destination: &S,
    limits: &PathLimits,
) -> PathSearchResult<S, R>
where
    S: Clone + Eq + Hash,
    R: Clone + Eq + Hash,
{
    if origin == destination {
        return PathSearchResult {
            paths: vec![GraphPath {
                stops: vec![origin.clone()],
                routes: Vec::new(),
                transfers: 0,
                distance_m: 0.0,
            }],
            expanded: 0,
            truncated: false,
        };
    }

    let mut paths: Vec<GraphPath<S, R>> = Vec::new();
    let mut seen: HashSet<(Vec<R>, Vec<S>)> = HashSet::new();
    let mut expanded = 0;
    let mut truncated = false;

    let mut queue: VecDeque<SearchState<S, R>> = VecDeque::new();
    queue.push_back(SearchState {
        stops: vec![origin.clone()],
        routes: Vec::new(),
        transfers: 0,
        distance_m: 0.0,
    });

    'search: while let Some(state) = queue.pop_front() {
        if limits.max_paths == 0 {
            break;
        }
        expanded += 1;
        if expanded > limits.max_expansions {
            truncated = true;
            debug!(expanded, "path search hit expansion cap");
            break;
        }
        if state.routes.len() >= limits.max_depth {
            continue;
        }

        let Some(current) = state.stops.last() else {
            continue;
        };

        for edge in graph.edges_from(current) {
            if state.stops.contains(&edge.to) {
                continue;
            }
            let transfers = match state.routes.last() {
                Some(last) if *last != edge.route => state.transfers + 1,
                _ => state.transfers,
            };
            if transfers > limits.max_transfers {
                continue;
            }

            let mut stops = state.stops.clone();
            stops.push(edge.to.clone());
            let mut routes = state.routes.clone();
            routes.push(edge.route.clone());
            let distance_m = state.distance_m + edge.distance_m;

            if edge.to == *destination {
                if !seen.insert((routes.clone(), stops.clone())) {
                    continue;
                }
                trace!(edges = routes.len(), transfers, "path accepted");
                paths.push(GraphPath {
                    stops,
                    routes,
                    transfers,
                    distance_m,
                });
                if paths.len() >= limits.max_paths {
                    break 'search;
                }
                continue;
            }

            queue.push_back(SearchState {
                stops,
                routes,
                transfers,
                distance_m,
            });
        }
    }

    debug!(paths = paths.len(), expanded, "path search complete");

    PathSearchResult {
        paths,
        expanded,
        truncated,
    }
}
