//! Drives a simulated vehicle around a track through the data store, waypoint updater and
//! scheduler, feeding each lane back as the next pose.

use assert_approx_eq::assert_approx_eq;
use comms_if::wp::{LaneHeader, LaneMsg, PoseMsg, WaypointMsg, WpuInput, NO_STOP_WP_IDX};
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::Arc;

use util::{module::State, session::Session};
use wpu_lib::{
    data_store::DataStore,
    sched::{Scheduler, TickOutcome},
    track::Waypoint,
    wp_updater::{Lane, Params, WpUpdater},
};

const NUM_WPS: usize = 400;
const RADIUS_M: f64 = 100.0;
const SPEED_MS: f64 = 10.0;

fn base_lane() -> LaneMsg {
    let waypoints = (0..NUM_WPS)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / NUM_WPS as f64;
            let wp = Waypoint {
                position_m: Vector3::new(RADIUS_M * a.cos(), RADIUS_M * a.sin(), 0.0),
                attitude_q: UnitQuaternion::from_euler_angles(
                    0.0,
                    0.0,
                    a + std::f64::consts::FRAC_PI_2,
                ),
                speed_ms: SPEED_MS,
                yaw_rate_rads: SPEED_MS / RADIUS_M,
            };
            WaypointMsg::from(&wp)
        })
        .collect();

    LaneMsg {
        header: LaneHeader::default(),
        waypoints,
    }
}

fn params() -> Params {
    Params {
        lookahead_wps: 40,
        stop_margin_m: 10.0,
        stop_activation_wps: 100,
        max_deceleration_mss: 1.0,
        ..Default::default()
    }
}

/// Pose part way between the first and second waypoint of a lane.
fn pose_along(lane: &Lane) -> PoseMsg {
    let a = lane.plan.waypoints[0].position_m;
    let b = lane.plan.waypoints[1].position_m;
    let p = a + (b - a) * 0.6;
    PoseMsg::from_position(p[0], p[1], p[2])
}

#[test]
fn test_drive_around_loop() {
    let ds = DataStore::default();
    let mut wpu = WpUpdater::new(params()).unwrap();
    let mut sched = Scheduler::new(50.0).unwrap();
    let mut lanes: Vec<Lane> = Vec::new();

    // Nothing until both the pose and the path are known
    ds.apply(&WpuInput::Pose(PoseMsg::from_position(RADIUS_M, 0.5, 0.0)))
        .unwrap();
    assert_eq!(sched.tick(&ds, &mut wpu, &mut lanes), TickOutcome::Skipped);

    ds.apply(&WpuInput::BaseWaypoints(base_lane())).unwrap();
    ds.apply(&WpuInput::TrafficWaypoint(NO_STOP_WP_IDX)).unwrap();

    // Two full laps, one waypoint per cycle
    let mut last_start = None;
    for _ in 0..(2 * NUM_WPS) {
        assert_eq!(sched.tick(&ds, &mut wpu, &mut lanes), TickOutcome::Published);
        let lane = lanes.last().unwrap();

        assert_eq!(lane.len(), 40);
        assert!(lane.plan.waypoints.iter().all(|w| w.speed_ms == SPEED_MS));

        // The lane always advances by one waypoint around the loop
        if let Some(s) = last_start {
            assert_eq!(lane.plan.start_idx, (s + 1) % NUM_WPS);
        }
        last_start = Some(lane.plan.start_idx);

        ds.apply(&WpuInput::Pose(pose_along(lane))).unwrap();
    }

    assert_eq!(sched.stats().num_published, 2 * NUM_WPS as u64);
    assert_eq!(sched.stats().num_skipped, 1);
}

#[test]
fn test_stop_ahead_across_wrap() {
    let ds = DataStore::default();
    ds.apply(&WpuInput::BaseWaypoints(base_lane())).unwrap();

    let track = ds.track().unwrap();
    let spacing_m = track.arc_len().total_length_m() / NUM_WPS as f64;

    // Vehicle just before waypoint 380, stop 30 waypoints later across the end of the loop
    let p = track.get(379).position_m * 0.2 + track.get(380).position_m * 0.8;
    ds.apply(&WpuInput::Pose(PoseMsg::from_position(p[0], p[1], 0.0)))
        .unwrap();
    ds.apply(&WpuInput::TrafficWaypoint(10)).unwrap();

    let mut wpu = WpUpdater::new(params()).unwrap();
    let mut sched = Scheduler::new(50.0).unwrap();
    let mut lanes: Vec<Lane> = Vec::new();

    assert_eq!(sched.tick(&ds, &mut wpu, &mut lanes), TickOutcome::Published);
    let lane = &lanes[0];
    assert_eq!(lane.plan.start_idx, 380);

    for (k, wp) in lane.plan.waypoints.iter().enumerate() {
        assert!(wp.speed_ms <= SPEED_MS);

        let d = (30 - k.min(30)) as f64 * spacing_m - 10.0;
        let v = if d > 0.0 { (2.0 * d).sqrt() } else { 0.0 };
        let expected = if v < 1.0 { 0.0 } else { v.min(SPEED_MS) };
        assert_approx_eq!(wp.speed_ms, expected, 1e-6);
    }

    // Clearing the stop restores the base speeds
    ds.apply(&WpuInput::TrafficWaypoint(NO_STOP_WP_IDX)).unwrap();
    sched.tick(&ds, &mut wpu, &mut lanes);
    assert!(lanes[1].plan.waypoints.iter().all(|w| w.speed_ms == SPEED_MS));
}

#[test]
fn test_status_report_and_track_summary_archived() {
    let dir = std::env::temp_dir().join(format!("wpu_exec_test_{}", std::process::id()));
    let session = Session::new_in(&dir, "wpu_exec").unwrap();

    let ds = Arc::new(DataStore::with_saver(session.saver()));
    ds.apply(&WpuInput::BaseWaypoints(base_lane())).unwrap();

    let mut wpu = WpUpdater::default();
    wpu.init(params(), &session).unwrap();

    let mut sched = Scheduler::new(50.0).unwrap();
    let mut lanes: Vec<Lane> = Vec::new();

    // One skipped cycle then two lanes
    sched.tick(&ds, &mut wpu, &mut lanes);
    ds.set_pose(wpu_lib::loc::Pose::from_position2(RADIUS_M, 0.0));
    sched.tick(&ds, &mut wpu, &mut lanes);
    sched.tick(&ds, &mut wpu, &mut lanes);

    let report_path = session.arch_root.join("wp_updater/status_report.csv");
    let summary_path = session.session_root.join("track_summary.json");
    session.exit();

    // Track built from the network path is summarised in the session
    let summary: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["num_waypoints"], NUM_WPS);
    assert_eq!(summary["frame_id"], "world");

    let mut reader = csv::Reader::from_path(&report_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "closest_wp_idx"));
    assert_eq!(reader.records().count(), 3);

    std::fs::remove_dir_all(&dir).ok();
}
