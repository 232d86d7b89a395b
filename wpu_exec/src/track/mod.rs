//! # Track module
//!
//! The track is the fixed closed-loop sequence of base waypoints the vehicle follows. It is
//! built once from the first base waypoints delivery, together with the structures derived from
//! it (the spatial index and the arc length table), and is immutable afterwards.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arc_len;
mod idx;
mod index;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::wp::{PoseMsg, WaypointMsg};
use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use util::raise_error;

pub use arc_len::*;
pub use idx::*;
pub use index::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single element of the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in the map frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Attitude in the map frame.
    pub attitude_q: UnitQuaternion<f64>,

    /// Nominal forward speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Nominal yaw rate, carried through untouched.
    ///
    /// Units: radians/second
    pub yaw_rate_rads: f64,
}

/// The closed-loop track and its derived structures.
#[derive(Debug)]
pub struct Track {
    waypoints: Vec<Waypoint>,

    index: TrackIndex,

    arc_len: ArcLenTable,

    frame_id: String,
}

/// Summary of a track, saved into the session when the track is built.
#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub num_waypoints: usize,
    pub frame_id: String,
    pub total_length_m: f64,
    pub min_speed_ms: f64,
    pub max_speed_ms: f64,
    pub cumulative_length_m: ArcLenTable,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Cannot build a track from an empty sequence of waypoints")]
    Empty,

    #[error("Waypoint {0} has a non-finite position or speed")]
    NonFinite(usize),

    #[error("Could not build the track index: {0}")]
    IndexError(TrackIndexError),

    #[error("Could not build the arc length table: {0}")]
    ArcLenError(ArcLenError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Position projected into the ground (XY) plane.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }

    /// Returns true if the position and speed are all finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|c| c.is_finite()) && self.speed_ms.is_finite()
    }

    /// Copy of this waypoint with a different speed.
    pub fn with_speed(&self, speed_ms: f64) -> Self {
        Self { speed_ms, ..*self }
    }
}

impl From<&WaypointMsg> for Waypoint {
    fn from(msg: &WaypointMsg) -> Self {
        let q = msg.pose.attitude_q;
        Self {
            position_m: Vector3::from(msg.pose.position_m),
            // Message order is [x, y, z, w]
            attitude_q: UnitQuaternion::from_quaternion(Quaternion::new(q[3], q[0], q[1], q[2])),
            speed_ms: msg.linear_x_ms,
            yaw_rate_rads: msg.angular_z_rads,
        }
    }
}

impl From<&Waypoint> for WaypointMsg {
    fn from(wp: &Waypoint) -> Self {
        let q = wp.attitude_q.quaternion();
        Self {
            pose: PoseMsg {
                position_m: [wp.position_m[0], wp.position_m[1], wp.position_m[2]],
                attitude_q: [q.i, q.j, q.k, q.w],
            },
            linear_x_ms: wp.speed_ms,
            angular_z_rads: wp.yaw_rate_rads,
        }
    }
}

impl Track {
    /// Build the track and its derived structures from the base waypoints.
    pub fn new(waypoints: Vec<Waypoint>, frame_id: &str) -> Result<Self, TrackError> {
        if waypoints.is_empty() {
            return Err(TrackError::Empty);
        }

        // Distances are 3D, so the height must be valid as well as the ground position
        if let Some(i) = waypoints.iter().position(|w| !w.is_finite()) {
            return Err(TrackError::NonFinite(i));
        }

        let positions_2d: Vec<Vector2<f64>> = waypoints.iter().map(|w| w.position2()).collect();
        let positions_3d: Vec<Vector3<f64>> = waypoints.iter().map(|w| w.position_m).collect();

        let index = TrackIndex::build(&positions_2d).map_err(TrackError::IndexError)?;
        let arc_len = ArcLenTable::build(&positions_3d).map_err(TrackError::ArcLenError)?;

        Ok(Self {
            waypoints,
            index,
            arc_len,
            frame_id: frame_id.to_string(),
        })
    }

    /// Number of waypoints in the track.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false, a track cannot be built from no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Get the waypoint at the given index, wrapping around the loop.
    pub fn get(&self, idx: usize) -> &Waypoint {
        &self.waypoints[idx % self.waypoints.len()]
    }

    /// Wrap-aware index into this track.
    pub fn idx(&self, idx: usize) -> TrackIdx {
        match TrackIdx::new(idx, self.waypoints.len()) {
            Some(i) => i,
            None => raise_error!("Track is never empty"),
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn index(&self) -> &TrackIndex {
        &self.index
    }

    pub fn arc_len(&self) -> &ArcLenTable {
        &self.arc_len
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// Returns true if `waypoints` is the sequence this track was built from.
    pub fn is_built_from(&self, waypoints: &[Waypoint]) -> bool {
        self.waypoints.as_slice() == waypoints
    }

    /// Build a summary of the track.
    pub fn summary(&self) -> TrackSummary {
        let (min_speed_ms, max_speed_ms) = self.waypoints.iter().fold(
            (std::f64::INFINITY, std::f64::NEG_INFINITY),
            |(min, max), w| (min.min(w.speed_ms), max.max(w.speed_ms)),
        );

        TrackSummary {
            num_waypoints: self.len(),
            frame_id: self.frame_id.clone(),
            total_length_m: self.arc_len.total_length_m(),
            min_speed_ms,
            max_speed_ms,
            cumulative_length_m: self.arc_len.clone(),
        }
    }
}
