//! # Waypoint updater library.
//!
//! This library allows other crates in the workspace, the benchmarks and the integration tests to
//! access items defined inside the waypoint updater crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - the latest inputs received by the waypoint updater
pub mod data_store;

/// Final waypoints server - publishes the lane produced each cycle
pub mod final_wps_server;

/// Input client - recieves the pose, base waypoints and stop index
pub mod input_client;

/// Localisation module - locates the vehicle on the track
pub mod loc;

/// Path loader - reads base paths from CSV files
pub mod path_loader;

/// Speed profile generation - builds the lookahead waypoints and the stopping profile
pub mod profile;

/// Scheduler - runs the waypoint updater at a fixed rate
pub mod sched;

/// Track - the closed-loop base path and the structures derived from it
pub mod track;

/// Waypoint updater module - produces the lane on each cycle
pub mod wp_updater;
