//! # Speed Profile Generation
//!
//! Builds the lookahead sequence of waypoints from a start index. When a stop index is active
//! within range the speeds of the sequence are replaced by a constant deceleration profile which
//! brings the vehicle to rest a margin short of the stop waypoint.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use crate::track::{Track, Waypoint};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A stop must be strictly more than this many waypoints ahead to be acted on.
pub const MIN_STOP_OFFSET_WPS: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the deceleration profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Distance short of the stop waypoint at which the vehicle shall be at rest.
    ///
    /// Units: meters
    pub stop_margin_m: f64,

    /// Stops this many waypoints or more ahead of the vehicle are ignored.
    pub stop_activation_wps: usize,

    /// Deceleration used to compute the profile.
    ///
    /// Units: meters/second^2
    pub max_deceleration_mss: f64,

    /// Profile speeds below this are replaced by zero.
    ///
    /// Units: meters/second
    pub stop_snap_speed_ms: f64,
}

/// The lookahead sequence built on one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Track index of the first waypoint
    pub start_idx: usize,

    /// The kind of speed profile applied
    pub kind: ProfileKind,

    pub waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The speed profile applied to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileKind {
    /// Base track speeds
    Nominal,

    /// Decelerating to stop before the given track index
    Stopping { stop_idx: usize },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns the number of waypoints between `start_idx` and the stop if the stop shall be acted
/// on, i.e. it is strictly more than [`MIN_STOP_OFFSET_WPS`] and strictly fewer than
/// `activation_wps` waypoints ahead, counting forwards around the loop.
pub fn active_stop_offset(
    track: &Track,
    start_idx: usize,
    stop_idx: Option<usize>,
    activation_wps: usize,
) -> Option<usize> {
    let stop_idx = stop_idx.filter(|&s| s < track.len())?;
    let offset = track.idx(start_idx).steps_to(stop_idx);

    if MIN_STOP_OFFSET_WPS < offset && offset < activation_wps {
        Some(offset)
    } else {
        None
    }
}

/// Speed from which the vehicle can stop at `max_deceleration_mss` over the distance left
/// once the margin is removed.
///
/// Speeds under the snap speed are returned as zero.
pub fn stopping_speed(dist_to_stop_m: f64, params: &ProfileParams) -> f64 {
    let dist_m = dist_to_stop_m - params.stop_margin_m;

    // v^2 = 2 a d
    let v = if dist_m > 0.0 {
        (2.0 * params.max_deceleration_mss * dist_m).sqrt()
    } else {
        0.0
    };

    if v < params.stop_snap_speed_ms {
        0.0
    } else {
        v
    }
}

/// Generate the `count` waypoints starting at `start_idx`.
///
/// The sequence wraps around the end of the track. If `stop_idx` is active (see
/// [`active_stop_offset`]) the speeds follow the stopping profile, capped at the base speeds,
/// otherwise the base waypoints are copied unchanged.
pub fn generate(
    track: &Track,
    start_idx: usize,
    count: usize,
    stop_idx: Option<usize>,
    params: &ProfileParams,
) -> Plan {
    let start = track.idx(start_idx);

    let stop = active_stop_offset(track, start.get(), stop_idx, params.stop_activation_wps)
        .and_then(|offset| stop_idx.map(|s| (s, offset)));

    let (kind, waypoints) = match stop {
        None => (
            ProfileKind::Nominal,
            start.iter(count).map(|i| *track.get(i)).collect(),
        ),
        Some((stop_idx, stop_offset)) => (
            ProfileKind::Stopping { stop_idx },
            (0..count)
                .map(|k| {
                    let i = start.advance(k).get();
                    let base = track.get(i);

                    // At or past the stop there is no distance left
                    let (dist_m, v) = if k < stop_offset {
                        let d = track.arc_len().distance_ahead(i, stop_idx);
                        (d, stopping_speed(d, params))
                    } else {
                        (0.0, 0.0)
                    };

                    trace!(
                        "{} -> {}, distance: {:.3}, velocity: {:.3}",
                        i,
                        stop_idx,
                        dist_m - params.stop_margin_m,
                        v
                    );

                    base.with_speed(v.min(base.speed_ms))
                })
                .collect(),
        ),
    };

    Plan {
        start_idx: start.get(),
        kind,
        waypoints,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::track::test::{circle_track, straight_track};
    use assert_approx_eq::assert_approx_eq;

    fn params(stop_margin_m: f64, max_deceleration_mss: f64) -> ProfileParams {
        ProfileParams {
            stop_margin_m,
            stop_activation_wps: 100,
            max_deceleration_mss,
            stop_snap_speed_ms: 1.0,
        }
    }

    #[test]
    fn test_no_stop_copies_base() {
        let track = circle_track(200, 40.0, 7.5);
        let p = params(5.0, 1.0);

        for &(start, count) in &[(0, 40), (37, 1), (150, 80), (199, 200)] {
            let plan = generate(&track, start, count, None, &p);
            assert_eq!(plan.kind, ProfileKind::Nominal);
            assert_eq!(plan.waypoints.len(), count);
            for (k, wp) in plan.waypoints.iter().enumerate() {
                assert_eq!(wp, track.get(start + k));
            }
        }
    }

    #[test]
    fn test_nominal_wraps() {
        let track = straight_track(100, 10.0);
        let plan = generate(&track, 95, 10, None, &params(5.0, 1.0));

        let xs: Vec<f64> = plan.waypoints.iter().map(|w| w.position_m[0]).collect();
        assert_eq!(xs, vec![95.0, 96.0, 97.0, 98.0, 99.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_stop_scenario() {
        let track = straight_track(100, 10.0);
        let plan = generate(&track, 40, 20, Some(50), &params(5.0, 1.0));

        assert_eq!(plan.kind, ProfileKind::Stopping { stop_idx: 50 });
        assert_eq!(plan.waypoints.len(), 20);

        for (k, wp) in plan.waypoints.iter().enumerate() {
            let i = 40 + k;
            // Pose is untouched
            assert_eq!(wp.position_m, track.get(i).position_m);

            let d = 50.0 - i as f64;
            if d > 5.0 {
                let v = (2.0 * (d - 5.0)).sqrt();
                let expected = if v < 1.0 { 0.0 } else { v.min(10.0) };
                assert_approx_eq!(wp.speed_ms, expected);
            } else {
                assert_eq!(wp.speed_ms, 0.0);
            }
        }

        // Decreasing towards the stop
        for pair in plan.waypoints.windows(2) {
            assert!(pair[1].speed_ms <= pair[0].speed_ms);
        }
        assert_approx_eq!(plan.waypoints[0].speed_ms, 10f64.sqrt());
    }

    #[test]
    fn test_capped_at_base_speed() {
        let track = straight_track(300, 4.0);
        let plan = generate(&track, 0, 120, Some(90), &params(5.0, 2.0));

        assert_eq!(plan.kind, ProfileKind::Stopping { stop_idx: 90 });
        for (k, wp) in plan.waypoints.iter().enumerate() {
            assert!(wp.speed_ms <= track.get(k).speed_ms);
        }
        // Far from the stop the profile would exceed the base speed
        assert_eq!(plan.waypoints[0].speed_ms, 4.0);
        // Past the stop
        assert_eq!(plan.waypoints[100].speed_ms, 0.0);
    }

    #[test]
    fn test_activation_window_is_open() {
        let track = straight_track(300, 10.0);
        let p = params(5.0, 1.0);

        // Exactly start + 2 and start + window are not acted on
        assert_eq!(generate(&track, 40, 20, Some(42), &p).kind, ProfileKind::Nominal);
        assert_eq!(generate(&track, 40, 20, Some(140), &p).kind, ProfileKind::Nominal);

        // Just inside
        assert_eq!(
            generate(&track, 40, 20, Some(43), &p).kind,
            ProfileKind::Stopping { stop_idx: 43 }
        );
        assert_eq!(
            generate(&track, 40, 20, Some(139), &p).kind,
            ProfileKind::Stopping { stop_idx: 139 }
        );

        // Beyond the window the base speeds are kept
        let plan = generate(&track, 40, 20, Some(200), &p);
        assert!(plan.waypoints.iter().all(|w| w.speed_ms == 10.0));
    }

    #[test]
    fn test_stop_behind_or_invalid_ignored() {
        let track = straight_track(300, 10.0);
        let p = params(5.0, 1.0);

        assert_eq!(generate(&track, 40, 20, Some(30), &p).kind, ProfileKind::Nominal);
        assert_eq!(generate(&track, 40, 20, Some(40), &p).kind, ProfileKind::Nominal);
        assert_eq!(generate(&track, 40, 20, Some(300), &p).kind, ProfileKind::Nominal);
    }

    #[test]
    fn test_stop_across_wrap() {
        let track = straight_track(100, 10.0);
        let plan = generate(&track, 95, 10, Some(3), &params(2.0, 1.0));

        assert_eq!(plan.kind, ProfileKind::Stopping { stop_idx: 3 });

        // Closing segment of the straight track is 99 m long, so from 99 the stop is 102 m away
        assert_eq!(plan.waypoints[4].speed_ms, 10.0);
        // From index 0 the stop is 3 m away, 1 m once the margin is removed
        assert_approx_eq!(plan.waypoints[5].speed_ms, 2f64.sqrt());
        assert_eq!(plan.waypoints[6].speed_ms, 0.0);
        assert_eq!(plan.waypoints[9].speed_ms, 0.0);
    }

    #[test]
    fn test_stopping_speed() {
        let p = params(5.0, 1.0);

        assert_eq!(stopping_speed(5.0, &p), 0.0);
        assert_eq!(stopping_speed(-3.0, &p), 0.0);
        // sqrt(2 * 0.2) < 1, snapped
        assert_eq!(stopping_speed(5.2, &p), 0.0);
        assert_approx_eq!(stopping_speed(7.0, &p), 2.0);
        assert_approx_eq!(stopping_speed(55.0, &p), 10.0);
    }

    #[test]
    fn test_idempotent() {
        let track = circle_track(150, 30.0, 9.0);
        let p = params(4.0, 1.5);

        let a = generate(&track, 120, 40, Some(140), &p);
        let b = generate(&track, 120, 40, Some(140), &p);
        assert_eq!(a, b);
    }
}
