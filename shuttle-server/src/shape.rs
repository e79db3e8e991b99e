//! Slicing route shapes between two stops.
//!
//! Feed shapes describe a whole route; a ride segment needs only the part
//! between its boarding and alighting stops. Campus shuttles mostly run in
//! loops, so a slice may have to wrap past the end of the shape.

use crate::geo::{LatLng, haversine_m};

/// A shape whose endpoints are this close (metres) is treated as a loop.
pub const LOOP_CLOSE_M: f64 = 150.0;

/// Index of the shape point nearest `p`.
fn nearest_index(shape: &[LatLng], p: LatLng) -> Option<usize> {
    shape
        .iter()
        .enumerate()
        .map(|(i, q)| (i, haversine_m(p, *q)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Whether the shape closes on itself.
pub fn is_loop(shape: &[LatLng]) -> bool {
    match (shape.first(), shape.last()) {
        (Some(first), Some(last)) if shape.len() > 2 => haversine_m(*first, *last) <= LOOP_CLOSE_M,
        _ => false,
    }
}

/// Whether travel along `shape` reaches `board` before `alight`.
pub fn runs_forward(shape: &[LatLng], board: LatLng, alight: LatLng) -> bool {
    match (nearest_index(shape, board), nearest_index(shape, alight)) {
        (Some(b), Some(a)) => b < a,
        _ => false,
    }
}

/// The part of `shape` between `board` and `alight`.
///
/// Each stop snaps to its nearest shape point. Travel runs forward along the
/// shape; on a loop a slice whose alighting point comes first wraps past the
/// end, otherwise the reversed slice is returned. The result always has at
/// least two points, falling back to the two stop coordinates.
pub fn slice_shape(shape: &[LatLng], board: LatLng, alight: LatLng) -> Vec<LatLng> {
    let fallback = || vec![board, alight];

    let (Some(b), Some(a)) = (nearest_index(shape, board), nearest_index(shape, alight)) else {
        return fallback();
    };

    let slice: Vec<LatLng> = if b <= a {
        shape[b..=a].to_vec()
    } else if is_loop(shape) {
        // The closing point duplicates the first; skip it when wrapping.
        let end = if haversine_m(shape[0], shape[shape.len() - 1]) == 0.0 {
            shape.len() - 1
        } else {
            shape.len()
        };
        shape[b..end].iter().chain(&shape[..=a]).copied().collect()
    } else {
        let mut reversed = shape[a..=b].to_vec();
        reversed.reverse();
        reversed
    };

    if slice.len() < 2 {
        return fallback();
    }
    slice
}
