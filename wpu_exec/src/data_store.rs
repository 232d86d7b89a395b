//! # Data Store
//!
//! Single owner of the asynchronously updated inputs of the waypoint updater. Producers (the
//! input client, or the executable itself when the path is loaded from file) write through the
//! setters, and the cycle reads a consistent [`InputData`] snapshot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::wp::{self, LaneMsg, WpuInput};
use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use util::session::Saver;

use crate::{
    loc::Pose,
    track::{Track, TrackError, Waypoint},
    wp_updater::InputData,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
///
/// Every field sits behind its own lock, updates are last-value-wins.
#[derive(Default)]
pub struct DataStore {
    /// Latest vehicle pose
    pose: Mutex<Option<Pose>>,

    /// Latest stop waypoint index, `None` if there is no stop
    stop_idx: Mutex<Option<usize>>,

    /// The track, built once from the first base path received
    track: Mutex<Option<Arc<Track>>>,

    /// Session the summary of each track built is saved into
    saver: Option<Saver>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of delivering a base path to the data store.
#[derive(Debug, Clone)]
pub enum TrackUpdate {
    /// The track was built from the delivered path
    Built(Arc<Track>),

    /// The path is the one the current track was built from, nothing was done
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    #[error("Could not build the track from the base waypoints: {0}")]
    TrackError(TrackError),

    #[error(
        "A different base path ({new} waypoints) was delivered while a track of {current} \
         waypoints is in use, reset the track first"
    )]
    TrackAlreadySet { current: usize, new: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create an empty data store which saves a summary of every track it builds into the
    /// session as `track_summary.json`.
    pub fn with_saver(saver: Saver) -> Self {
        Self {
            saver: Some(saver),
            ..Default::default()
        }
    }

    /// Overwrite the vehicle pose.
    pub fn set_pose(&self, pose: Pose) {
        trace!("Pose: ({:.3},{:.3})", pose.position_m[0], pose.position_m[1]);
        *lock(&self.pose) = Some(pose);
    }

    /// Overwrite the stop waypoint index, `None` clearing the stop.
    pub fn set_stop_idx(&self, stop_idx: Option<usize>) {
        let mut current = lock(&self.stop_idx);
        if *current != stop_idx {
            debug!("Stop index changed: {:?} -> {:?}", *current, stop_idx);
        }
        *current = stop_idx;
    }

    /// Deliver a base path.
    ///
    /// The track is built on the first delivery only. Delivering the same path again is a no-op,
    /// while a different path is rejected until [`DataStore::reset_track`] is called.
    pub fn set_base_waypoints(
        &self,
        waypoints: Vec<Waypoint>,
        frame_id: &str,
    ) -> Result<TrackUpdate, DataStoreError> {
        let mut track = lock(&self.track);

        if let Some(ref current) = *track {
            if current.is_built_from(&waypoints) {
                debug!("Same base path delivered again, ignoring it");
                return Ok(TrackUpdate::Unchanged);
            }

            return Err(DataStoreError::TrackAlreadySet {
                current: current.len(),
                new: waypoints.len(),
            });
        }

        let new_track =
            Arc::new(Track::new(waypoints, frame_id).map_err(DataStoreError::TrackError)?);

        info!(
            "Track built from {} base waypoints, {:.1} m long",
            new_track.len(),
            new_track.arc_len().total_length_m()
        );

        if let Some(ref saver) = self.saver {
            saver.save("track_summary.json", new_track.summary());
        }

        *track = Some(new_track.clone());

        Ok(TrackUpdate::Built(new_track))
    }

    /// Deliver a base path received as a lane message.
    pub fn set_base_lane(&self, lane: &LaneMsg) -> Result<TrackUpdate, DataStoreError> {
        self.set_base_waypoints(
            lane.waypoints.iter().map(Waypoint::from).collect(),
            &lane.header.frame_id,
        )
    }

    /// Drop the current track so that a different base path may be delivered.
    pub fn reset_track(&self) {
        if lock(&self.track).take().is_some() {
            info!("Track reset");
        }
    }

    /// Apply a message received on the input socket.
    pub fn apply(&self, input: &WpuInput) -> Result<(), DataStoreError> {
        match input {
            WpuInput::Pose(p) => self.set_pose(Pose::from(p)),
            WpuInput::TrafficWaypoint(raw) => self.set_stop_idx(wp::traffic_wp_to_idx(*raw)),
            WpuInput::BaseWaypoints(lane) => {
                self.set_base_lane(lane)?;
            }
        }

        Ok(())
    }

    pub fn pose(&self) -> Option<Pose> {
        *lock(&self.pose)
    }

    pub fn stop_idx(&self) -> Option<usize> {
        *lock(&self.stop_idx)
    }

    pub fn track(&self) -> Option<Arc<Track>> {
        lock(&self.track).clone()
    }

    /// Take a snapshot of the inputs for one cycle.
    pub fn snapshot(&self) -> InputData {
        InputData {
            pose: self.pose(),
            stop_idx: self.stop_idx(),
            track: self.track(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Lock a field, recovering the value if a writer panicked. Every field is a plain value that is
/// only ever replaced whole, so it is still consistent.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    m.lock().unwrap_or_else(|e| {
        warn!("DataStore lock poisoned, recovering");
        e.into_inner()
    })
}
