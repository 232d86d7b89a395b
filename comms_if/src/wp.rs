//! # Waypoint Interface
//!
//! This module defines the messages exchanged between the waypoint updater and
//! its collaborators: the pose source, the base waypoint loader, the stop
//! (traffic light) detector, and the consumer of the final waypoints.
//!
//! All messages are serialised as JSON.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Value of a [`WpuInput::TrafficWaypoint`] message when there is no stop to respect.
pub const NO_STOP_WP_IDX: i32 = -1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position and attitude of an object in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    /// Position `[x, y, z]`.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Attitude quaternion in `[x, y, z, w]` order.
    pub attitude_q: [f64; 4],
}

/// A single waypoint of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointMsg {
    pub pose: PoseMsg,

    /// Target forward speed at this waypoint.
    ///
    /// Units: meters/second
    pub linear_x_ms: f64,

    /// Target yaw rate at this waypoint.
    ///
    /// Units: radians/second
    pub angular_z_rads: f64,
}

/// Header attached to every lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneHeader {
    /// Sequence number of the lane, incremented by the publisher.
    pub seq: u64,

    /// UTC time at which the lane was created
    #[serde(with = "ts_milliseconds")]
    pub stamp: DateTime<Utc>,

    /// Frame in which the waypoint poses are expressed
    pub frame_id: String,
}

/// An ordered sequence of waypoints.
///
/// Used both for the full base path and for the final (lookahead) waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMsg {
    pub header: LaneHeader,

    pub waypoints: Vec<WaypointMsg>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Messages the waypoint updater accepts on its input socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WpuInput {
    /// Current pose of the vehicle.
    Pose(PoseMsg),

    /// The full closed-loop base path.
    BaseWaypoints(LaneMsg),

    /// Index of the base waypoint at which the vehicle must stop, or
    /// [`NO_STOP_WP_IDX`].
    TrafficWaypoint(i32),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LaneHeader {
    fn default() -> Self {
        Self {
            seq: 0,
            stamp: Utc::now(),
            frame_id: String::from("world"),
        }
    }
}

impl PoseMsg {
    /// Create a pose at the given position with an identity attitude.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position_m: [x, y, z],
            attitude_q: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert the raw traffic waypoint index into an optional index.
///
/// Any negative value means there is no stop.
pub fn traffic_wp_to_idx(raw: i32) -> Option<usize> {
    if raw < 0 {
        None
    } else {
        Some(raw as usize)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_traffic_wp_to_idx() {
        assert_eq!(traffic_wp_to_idx(NO_STOP_WP_IDX), None);
        assert_eq!(traffic_wp_to_idx(-20), None);
        assert_eq!(traffic_wp_to_idx(0), Some(0));
        assert_eq!(traffic_wp_to_idx(292), Some(292));
    }

    #[test]
    fn test_input_json() {
        let input: WpuInput = serde_json::from_str(r#"{"TrafficWaypoint":-1}"#).unwrap();
        assert_eq!(input, WpuInput::TrafficWaypoint(NO_STOP_WP_IDX));

        let input: WpuInput = serde_json::from_str(
            r#"{"Pose":{"position_m":[1.0,2.0,0.0],"attitude_q":[0.0,0.0,0.0,1.0]}}"#,
        )
        .unwrap();
        assert_eq!(input, WpuInput::Pose(PoseMsg::from_position(1.0, 2.0, 0.0)));
    }
}
