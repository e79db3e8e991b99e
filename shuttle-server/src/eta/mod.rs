//! Live arrival estimates.
//!
//! Given a ride segment and the current vehicles, estimate when the nearest
//! vehicle on the route reaches the boarding stop and how long the ride
//! takes. Speeds come from each vehicle's recent positions when those are
//! plausible, otherwise from a fixed fallback.

mod estimate;
mod history;
mod speed;

pub use estimate::{
    DistanceSource, EtaEstimator, NextBus, RouteChain, loop_distance_to_stop, ride_eta_s,
};
pub use history::{DEFAULT_HISTORY_CAP, PositionSample, VehicleHistory};
pub use speed::{SpeedEstimate, SpeedSource, smoothed_speed};

/// Configuration for arrival estimates.
#[derive(Debug, Clone)]
pub struct EtaConfig {
    /// Sample pairs this close together (seconds) are ignored.
    pub min_dt_s: f64,

    /// Slowest plausible speed for a sample pair (m/s).
    pub min_pair_speed: f64,

    /// Fastest plausible speed for a sample pair (m/s).
    pub max_pair_speed: f64,

    /// Speed used when history gives nothing usable (m/s).
    pub fallback_speed: f64,

    /// Smoothed speeds below this are replaced by the fallback (m/s).
    pub min_usable_speed: f64,

    /// A vehicle this close to the boarding stop is treated as arrived (metres).
    pub near_stop_radius_m: f64,

    /// Samples kept per vehicle.
    pub history_cap: usize,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            min_dt_s: 1.0,
            min_pair_speed: 1.0,
            max_pair_speed: 20.0,
            fallback_speed: 6.0,
            min_usable_speed: 0.5,
            near_stop_radius_m: 30.0,
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}
