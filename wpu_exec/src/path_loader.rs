//! # Path Loader
//!
//! Loads a base path from a CSV file of `x, y, z, yaw` rows, without a header. Positions are in
//! meters in the map frame and yaw in radians.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use csv::{ReaderBuilder, Trim};
use log::debug;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};

use crate::track::Waypoint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single row of a path file
#[derive(Debug, Deserialize)]
struct PathRecord {
    x: f64,
    y: f64,
    z: f64,
    yaw: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathLoadError {
    #[error("Could not open the path file: {0}")]
    Io(std::io::Error),

    #[error("Could not parse the path file: {0}")]
    Csv(csv::Error),

    #[error("The path file contains no waypoints")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load the path at `path`, giving every waypoint the nominal speed `speed_ms`.
pub fn load_csv<P: AsRef<Path>>(path: P, speed_ms: f64) -> Result<Vec<Waypoint>, PathLoadError> {
    let file = File::open(path.as_ref()).map_err(PathLoadError::Io)?;
    let waypoints = from_reader(file, speed_ms)?;

    debug!(
        "Loaded {} waypoints from {:?}",
        waypoints.len(),
        path.as_ref()
    );

    Ok(waypoints)
}

/// Read a path from any CSV source.
pub fn from_reader<R: Read>(reader: R, speed_ms: f64) -> Result<Vec<Waypoint>, PathLoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(reader);

    let waypoints = csv_reader
        .deserialize::<PathRecord>()
        .map(|r| {
            r.map(|rec| Waypoint {
                position_m: Vector3::new(rec.x, rec.y, rec.z),
                attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, rec.yaw),
                speed_ms,
                yaw_rate_rads: 0.0,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(PathLoadError::Csv)?;

    if waypoints.is_empty() {
        return Err(PathLoadError::Empty);
    }

    Ok(waypoints)
}
