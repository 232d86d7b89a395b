//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the waypoint updater.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Waypoint, lane and pose message definitions
pub mod wp;

/// Network module
pub mod net;
