//! Configuration for the trip planner.

use std::time::Duration;

/// Configuration parameters for trip planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum number of paths the search returns.
    pub max_paths: usize,

    /// Maximum number of route changes in a path.
    pub max_transfers: usize,

    /// Maximum number of edges in a path.
    pub max_depth: usize,

    /// Maximum number of search states expanded per query.
    pub max_expansions: usize,

    /// Score added when a segment's route has no live vehicle.
    pub no_vehicle_penalty: f64,

    /// Score added per transfer.
    pub transfer_penalty: f64,

    /// Score added per metre walked to and from the stops.
    pub walk_penalty_per_m: f64,

    /// Radius for alternate boarding and alighting stops (metres).
    pub walk_radius_m: f64,

    /// Alternate stops considered per end of the trip.
    pub max_alternates: usize,

    /// Maximum alternate (origin, destination) pairs searched.
    pub max_walk_pairs: usize,

    /// Wall-clock budget for the alternate-pair search (milliseconds).
    pub walk_budget_ms: u64,

    /// How many of the best candidates get live ETAs and geometry.
    pub enrich_top_k: usize,

    /// Reject snaps further than this from the requested point (metres).
    /// Unlimited when unset.
    pub max_snap_distance_m: Option<f64>,
}

impl PlannerConfig {
    /// Returns the walk search budget as a Duration.
    pub fn walk_budget(&self) -> Duration {
        Duration::from_millis(self.walk_budget_ms)
    }

    /// Set the snap distance limit.
    pub fn with_max_snap_distance(mut self, metres: f64) -> Self {
        self.max_snap_distance_m = Some(metres);
        self
    }

    /// Set the number of paths returned by the search.
    pub fn with_max_paths(mut self, n: usize) -> Self {
        self.max_paths = n;
        self
    }

    /// Set the walk search budget.
    pub fn with_walk_budget(mut self, budget: Duration) -> Self {
        self.walk_budget_ms = budget.as_millis() as u64;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_paths: 5,
            max_transfers: 1,
            max_depth: 60,
            max_expansions: 10_000,
            no_vehicle_penalty: 10_000.0,
            transfer_penalty: 600.0,
            walk_penalty_per_m: 1.0,
            walk_radius_m: 400.0,
            max_alternates: 5,
            max_walk_pairs: 25,
            walk_budget_ms: 150,
            enrich_top_k: 3,
            max_snap_distance_m: None,
        }
    }
}
