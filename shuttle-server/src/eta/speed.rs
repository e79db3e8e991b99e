//! Speed smoothing over a vehicle's recent samples.

use serde::Serialize;

use crate::geo::haversine_m;

use super::EtaConfig;
use super::history::PositionSample;

/// Where a speed figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSource {
    /// Smoothed from recorded positions.
    Cache,
    /// The configured fallback speed.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEstimate {
    pub m_per_s: f64,
    pub source: SpeedSource,
}

/// Smoothed speed over consecutive sample pairs.
///
/// A pair counts when more than `min_dt_s` separates it and its speed lies in
/// the configured band. The result is total qualifying distance over total
/// qualifying time; when nothing qualifies, or the result is unusable, the
/// fallback speed is returned instead.
pub fn smoothed_speed(samples: &[PositionSample], config: &EtaConfig) -> SpeedEstimate {
    let mut total_m = 0.0;
    let mut total_s = 0.0;

    for pair in samples.windows(2) {
        let dt = (pair[1].at - pair[0].at).num_milliseconds() as f64 / 1000.0;
        if dt <= config.min_dt_s {
            continue;
        }
        let d = haversine_m(pair[0].location, pair[1].location);
        let v = d / dt;
        if v < config.min_pair_speed || v > config.max_pair_speed {
            continue;
        }
        total_m += d;
        total_s += dt;
    }

    let fallback = SpeedEstimate {
        m_per_s: config.fallback_speed,
        source: SpeedSource::Fallback,
    };
    if total_s <= 0.0 {
        return fallback;
    }
    let speed = total_m / total_s;
    if !speed.is_finite() || speed < config.min_usable_speed {
        return fallback;
    }
    SpeedEstimate {
        m_per_s: speed,
        source: SpeedSource::Cache,
    }
}
