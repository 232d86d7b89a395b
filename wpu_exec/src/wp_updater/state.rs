//! Implementations for the WpUpdater state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use comms_if::wp::{LaneHeader, LaneMsg, WaypointMsg};
use log::{debug, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{Params, WpUpdaterError};
use crate::{
    loc::{self, Pose},
    profile::{self, Plan, ProfileKind, ProfileParams},
    track::Track,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Waypoint updater module state
pub struct WpUpdater {
    pub(crate) params: Params,

    profile_params: ProfileParams,

    /// Sequence number of the last lane produced
    seq: u64,

    pub(crate) report: StatusReport,
    arch_report: Option<Archiver>,
}

/// Input data to the waypoint updater, a snapshot of the data store.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Latest vehicle pose, `None` until the first pose is received
    pub pose: Option<Pose>,

    /// Latest stop waypoint index
    pub stop_idx: Option<usize>,

    /// The track, `None` until the base path is received
    pub track: Option<Arc<Track>>,
}

/// The lane produced on one cycle.
#[derive(Debug, Clone)]
pub struct Lane {
    pub header: LaneHeader,

    pub plan: Plan,
}

/// Status report for WpUpdater processing.
///
/// Flat so that it can be archived as CSV.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Session time of the cycle
    pub time_s: f64,

    /// True if no lane was produced because the pose or track is missing
    pub skipped: bool,

    /// Index of the first track waypoint at or ahead of the vehicle
    pub closest_wp_idx: Option<usize>,

    /// True if the stopping profile was applied
    pub decelerating: bool,

    /// The stop index in use this cycle
    pub stop_idx: Option<usize>,

    /// Speed of the first waypoint of the lane
    pub first_speed_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WpUpdater {
    /// Create a new module from parameters, without archiving.
    pub fn new(params: Params) -> Result<Self, WpUpdaterError> {
        params.validate()?;

        Ok(Self {
            profile_params: params.profile_params(),
            params,
            seq: 0,
            report: StatusReport::default(),
            arch_report: None,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Number of lanes produced so far.
    pub fn num_lanes(&self) -> u64 {
        self.seq
    }

    /// Returns the stop index if it is valid for the track.
    fn valid_stop_idx(track: &Track, stop_idx: Option<usize>) -> Option<usize> {
        match stop_idx {
            Some(s) if s >= track.len() => {
                warn!(
                    "Stop index {} is outside the track ({} waypoints), ignoring it",
                    s,
                    track.len()
                );
                None
            }
            s => s,
        }
    }
}

impl Default for WpUpdater {
    fn default() -> Self {
        let params = Params::default();
        Self {
            profile_params: params.profile_params(),
            params,
            seq: 0,
            report: StatusReport::default(),
            arch_report: None,
        }
    }
}

impl State for WpUpdater {
    type InitData = Params;
    type InitError = WpUpdaterError;

    type InputData = InputData;
    type OutputData = Option<Lane>;
    type StatusReport = StatusReport;
    type ProcError = WpUpdaterError;

    /// Initialise the WpUpdater module.
    ///
    /// Expected init data is the loaded parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.profile_params = init_data.profile_params();
        self.params = init_data;
        self.seq = 0;

        self.arch_report = Some(
            Archiver::from_path(session, "wp_updater/status_report.csv")
                .map_err(WpUpdaterError::ArchiveError)?,
        );

        Ok(())
    }

    /// Perform cyclic processing of the waypoint updater.
    ///
    /// Produces `None` when either the pose or the track is not yet available.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            ..Default::default()
        };

        let (pose, track) = match (input_data.pose, input_data.track.as_ref()) {
            (Some(p), Some(t)) => (p, t),
            (pose, track) => {
                trace!(
                    "Skipping cycle, pose: {}, track: {}",
                    pose.is_some(),
                    track.is_some()
                );
                self.report.skipped = true;
                self.archive();
                return Ok((None, self.report));
            }
        };

        let start_idx = loc::locate(track, &pose.position2());
        let stop_idx = Self::valid_stop_idx(track, input_data.stop_idx);

        let plan = profile::generate(
            track,
            start_idx,
            self.params.lookahead_wps,
            stop_idx,
            &self.profile_params,
        );

        if let ProfileKind::Stopping { stop_idx } = plan.kind {
            debug!(
                "Stopping profile from {} to stop at {}, first speed {:.3} m/s",
                start_idx,
                stop_idx,
                plan.waypoints.first().map(|w| w.speed_ms).unwrap_or(0.0)
            );
        }

        self.seq += 1;

        self.report.closest_wp_idx = Some(start_idx);
        self.report.decelerating = matches!(plan.kind, ProfileKind::Stopping { .. });
        self.report.stop_idx = stop_idx;
        self.report.first_speed_ms = plan.waypoints.first().map(|w| w.speed_ms);
        self.archive();

        let lane = Lane {
            header: LaneHeader {
                seq: self.seq,
                stamp: Utc::now(),
                frame_id: track.frame_id().to_string(),
            },
            plan,
        };

        Ok((Some(lane), self.report))
    }
}

impl WpUpdater {
    fn archive(&mut self) {
        if let Err(e) = self.write() {
            warn!("Could not archive the WpUpdater status report: {}", e);
        }
    }
}

impl Archived for WpUpdater {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.arch_report {
            Some(ref mut a) => a.serialise(self.report),
            None => Ok(()),
        }
    }
}

impl Lane {
    /// Number of waypoints in the lane.
    pub fn len(&self) -> usize {
        self.plan.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan.waypoints.is_empty()
    }
}

impl From<&Lane> for LaneMsg {
    fn from(lane: &Lane) -> Self {
        Self {
            header: lane.header.clone(),
            waypoints: lane.plan.waypoints.iter().map(WaypointMsg::from).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::track::test::{circle_track, straight_track};
    use assert_approx_eq::assert_approx_eq;

    fn params() -> Params {
        Params {
            lookahead_wps: 20,
            stop_margin_m: 5.0,
            stop_activation_wps: 100,
            max_deceleration_mss: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_skips_without_inputs() {
        let mut wpu = WpUpdater::new(params()).unwrap();
        let track = Arc::new(straight_track(100, 10.0));

        let no_track = InputData {
            pose: Some(Pose::from_position2(10.0, 0.0)),
            ..Default::default()
        };
        let no_pose = InputData {
            track: Some(track),
            stop_idx: Some(50),
            ..Default::default()
        };

        for input in [no_track, no_pose, InputData::default()].iter() {
            let (lane, report) = wpu.proc(input).unwrap();
            assert!(lane.is_none());
            assert!(report.skipped);
            assert_eq!(report.closest_wp_idx, None);
        }
        assert_eq!(wpu.num_lanes(), 0);
    }

    #[test]
    fn test_nominal_lane() {
        let mut wpu = WpUpdater::new(params()).unwrap();
        let input = InputData {
            pose: Some(Pose::from_position2(40.3, 0.2)),
            stop_idx: None,
            track: Some(Arc::new(straight_track(100, 10.0))),
        };

        let (lane, report) = wpu.proc(&input).unwrap();
        let lane = lane.unwrap();

        assert_eq!(lane.len(), 20);
        assert_eq!(lane.header.seq, 1);
        assert_eq!(lane.header.frame_id, "world");
        assert_eq!(lane.plan.start_idx, 41);
        assert!(lane.plan.waypoints.iter().all(|w| w.speed_ms == 10.0));

        assert!(!report.skipped);
        assert!(!report.decelerating);
        assert_eq!(report.closest_wp_idx, Some(41));
        assert_eq!(report.first_speed_ms, Some(10.0));

        // Sequence increments every lane
        let (lane, _) = wpu.proc(&input).unwrap();
        assert_eq!(lane.unwrap().header.seq, 2);
    }

    #[test]
    fn test_stopping_lane() {
        let mut wpu = WpUpdater::new(params()).unwrap();
        let input = InputData {
            pose: Some(Pose::from_position2(40.0, 0.0)),
            stop_idx: Some(50),
            track: Some(Arc::new(straight_track(100, 10.0))),
        };

        let (lane, report) = wpu.proc(&input).unwrap();
        let lane = lane.unwrap();

        assert!(report.decelerating);
        assert_eq!(report.stop_idx, Some(50));
        assert_eq!(lane.plan.kind, ProfileKind::Stopping { stop_idx: 50 });
        assert_approx_eq!(lane.plan.waypoints[0].speed_ms, 10f64.sqrt());
        assert_eq!(lane.plan.waypoints[5].speed_ms, 0.0);
    }

    #[test]
    fn test_out_of_range_stop_ignored() {
        let mut wpu = WpUpdater::new(params()).unwrap();
        let input = InputData {
            pose: Some(Pose::from_position2(40.0, 0.0)),
            stop_idx: Some(1000),
            track: Some(Arc::new(straight_track(100, 10.0))),
        };

        let (lane, report) = wpu.proc(&input).unwrap();
        assert!(!report.decelerating);
        assert_eq!(report.stop_idx, None);
        assert_eq!(lane.unwrap().plan.kind, ProfileKind::Nominal);
    }

    #[test]
    fn test_lane_msg() {
        let mut wpu = WpUpdater::new(params()).unwrap();
        let track = Arc::new(circle_track(100, 20.0, 6.0));
        let input = InputData {
            pose: Some(Pose::from_position2(20.0, 0.0)),
            stop_idx: None,
            track: Some(track.clone()),
        };

        let (lane, _) = wpu.proc(&input).unwrap();
        let lane = lane.unwrap();
        let msg = LaneMsg::from(&lane);

        assert_eq!(msg.waypoints.len(), 20);
        assert_eq!(msg.header, lane.header);
        for (i, wp) in msg.waypoints.iter().enumerate() {
            let base = track.get(lane.plan.start_idx + i);
            assert_approx_eq!(wp.pose.position_m[0], base.position_m[0]);
            assert_approx_eq!(wp.pose.position_m[1], base.position_m[1]);
            assert_eq!(wp.linear_x_ms, 6.0);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let p = Params {
            lookahead_wps: 0,
            ..Default::default()
        };
        assert!(WpUpdater::new(p).is_err());
    }
}
