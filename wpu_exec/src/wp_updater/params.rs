//! Parameters structure for WpUpdater

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::WpUpdaterError;
use crate::profile::ProfileParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the waypoint updater.
///
/// Any field missing from the parameter file takes its default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- LANE ----
    /// Number of waypoints in each published lane.
    pub lookahead_wps: usize,

    /// Rate at which lanes are published.
    ///
    /// Units: hertz
    pub update_frequency_hz: f64,

    // ---- STOPPING ----
    /// Distance short of the stop waypoint at which the vehicle shall be at rest.
    ///
    /// Units: meters
    pub stop_margin_m: f64,

    /// Stops this many waypoints or more ahead of the vehicle are ignored.
    pub stop_activation_wps: usize,

    /// Deceleration used for the stopping profile.
    ///
    /// Units: meters/second^2
    pub max_deceleration_mss: f64,

    /// Stopping profile speeds below this are replaced by zero.
    ///
    /// Units: meters/second
    pub stop_snap_speed_ms: f64,

    // ---- BASE PATH ----
    /// CSV file of `x,y,z,yaw` rows to load the base path from, relative to the software root.
    /// If `None` the base path is received over the network.
    pub base_path_csv: Option<String>,

    /// Nominal speed given to every waypoint of a base path loaded from CSV.
    ///
    /// Units: meters/second
    pub base_path_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            lookahead_wps: 40,
            update_frequency_hz: 50.0,
            stop_margin_m: 15.0,
            stop_activation_wps: 100,
            max_deceleration_mss: 1.0,
            stop_snap_speed_ms: 1.0,
            base_path_csv: None,
            // 40 km/h
            base_path_speed_ms: 11.11,
        }
    }
}

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), WpUpdaterError> {
        if self.lookahead_wps == 0 {
            return Err(WpUpdaterError::InvalidParam(
                "lookahead_wps",
                String::from("must be at least 1"),
            ));
        }

        if !(self.update_frequency_hz.is_finite() && self.update_frequency_hz > 0.0) {
            return Err(WpUpdaterError::InvalidParam(
                "update_frequency_hz",
                format!("must be positive, got {}", self.update_frequency_hz),
            ));
        }

        if !(self.stop_margin_m.is_finite() && self.stop_margin_m >= 0.0) {
            return Err(WpUpdaterError::InvalidParam(
                "stop_margin_m",
                format!("must not be negative, got {}", self.stop_margin_m),
            ));
        }

        if !(self.max_deceleration_mss.is_finite() && self.max_deceleration_mss > 0.0) {
            return Err(WpUpdaterError::InvalidParam(
                "max_deceleration_mss",
                format!("must be positive, got {}", self.max_deceleration_mss),
            ));
        }

        if !(self.stop_snap_speed_ms.is_finite() && self.stop_snap_speed_ms >= 0.0) {
            return Err(WpUpdaterError::InvalidParam(
                "stop_snap_speed_ms",
                format!("must not be negative, got {}", self.stop_snap_speed_ms),
            ));
        }

        Ok(())
    }

    /// The parameters of the stopping profile.
    pub fn profile_params(&self) -> ProfileParams {
        ProfileParams {
            stop_margin_m: self.stop_margin_m,
            stop_activation_wps: self.stop_activation_wps,
            max_deceleration_mss: self.max_deceleration_mss,
            stop_snap_speed_ms: self.stop_snap_speed_ms,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let params: Params = util::params::from_toml_str(
            r#"
            lookahead_wps = 60
            base_path_csv = "data/wp_yaw.csv"
            "#,
        )
        .unwrap();

        assert_eq!(params.lookahead_wps, 60);
        assert_eq!(params.base_path_csv.as_deref(), Some("data/wp_yaw.csv"));
        assert_eq!(params.update_frequency_hz, 50.0);
        assert_eq!(params.stop_margin_m, 15.0);
        assert_eq!(params.stop_activation_wps, 100);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let invalid = [
            Params {
                lookahead_wps: 0,
                ..Default::default()
            },
            Params {
                update_frequency_hz: 0.0,
                ..Default::default()
            },
            Params {
                stop_margin_m: -1.0,
                ..Default::default()
            },
            Params {
                max_deceleration_mss: std::f64::NAN,
                ..Default::default()
            },
        ];

        for p in invalid.iter() {
            assert!(matches!(
                p.validate(),
                Err(WpUpdaterError::InvalidParam(_, _))
            ));
        }
    }
}
