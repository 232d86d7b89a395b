//! Waypoint updater module
//!
//! Each cycle localises the vehicle against the track and builds the lookahead lane from the
//! located waypoint, applying the stopping profile when a stop is active.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during WpUpdater operation.
#[derive(Debug, thiserror::Error)]
pub enum WpUpdaterError {
    #[error("Invalid parameter {0}: {1}")]
    InvalidParam(&'static str, String),

    #[error("Could not create the status report archive: {0}")]
    ArchiveError(util::archive::ArchiveError),
}
