//! # Localisation module
//!
//! Provides the vehicle pose, and localises the vehicle against the track by finding the first
//! track waypoint at or ahead of it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::wp::PoseMsg;
use log::debug;
use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::track::Track;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and attitude in the map frame) of the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude of the vehicle in the map frame.
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Pose at the given 2D position with an identity attitude.
    pub fn from_position2(x: f64, y: f64) -> Self {
        Self {
            position_m: Vector3::new(x, y, 0.0),
            attitude_q: UnitQuaternion::identity(),
        }
    }

    /// Position projected into the ground (XY) plane.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }
}

impl From<&PoseMsg> for Pose {
    fn from(msg: &PoseMsg) -> Self {
        let q = msg.attitude_q;
        Self {
            position_m: Vector3::from(msg.position_m),
            attitude_q: UnitQuaternion::from_quaternion(Quaternion::new(q[3], q[0], q[1], q[2])),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the index of the first track waypoint at or ahead of `position_m`.
///
/// The closest waypoint is found using the track index. If the vehicle has already passed it
/// (the vector from the closest waypoint to the vehicle points along the track) the following
/// waypoint is returned instead. Both the previous and the next index wrap around the loop.
pub fn locate(track: &Track, position_m: &Vector2<f64>) -> usize {
    let closest = track.idx(track.index().nearest(position_m));

    let closest_pos = track.get(closest.get()).position2();
    let prev_pos = track.get(closest.prev().get()).position2();

    let v_path = closest_pos - prev_pos;
    let v_to_vehicle = position_m - closest_pos;

    let idx = if v_path.dot(&v_to_vehicle) > 0.0 {
        closest.next().get()
    } else {
        closest.get()
    };

    debug!(
        "Closest wp: {}, ({:.3},{:.3})->({:.3},{:.3})",
        idx,
        position_m[0],
        position_m[1],
        track.get(idx).position_m[0],
        track.get(idx).position_m[1]
    );

    idx
}
