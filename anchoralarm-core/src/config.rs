//! Plugin configuration
//!
//! Uses the same camelCase keys as the Signal K plugin options so an existing
//! options file can be read directly. Every field has a default; unknown keys
//! are ignored.

use serde::{Deserialize, Serialize};

use crate::alarm::Severity;
use crate::geo::Coordinate;

pub const DEFAULT_RADIUS_M: f64 = 60.0;
pub const DEFAULT_NO_POSITION_ALARM_S: u64 = 10;
pub const DEFAULT_INCOMPLETE_ANCHOR_ALARM_MIN: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnchorConfig {
    /// Anchor flag of the options layout
    pub on: bool,
    /// Anchor position of the options layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rode_length: Option<f64>,
    /// Seconds a breach must persist before alarming
    pub delay: u64,
    pub warning_percentage: f64,
    pub warning_notification: bool,
    /// Seconds without a position before alarming, 0 disables
    pub no_position_alarm_time: u64,
    /// Meters added to computed radii
    pub fudge: f64,
    /// Height of the bow roller above the water, meters
    pub bow_height: f64,
    /// Severity of a breach
    pub state: Severity,
    /// Minutes a drop may stay without radius or rode, 0 disables
    pub incomplete_anchor_alarm_time: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig {
            on: false,
            position: None,
            radius: Some(DEFAULT_RADIUS_M),
            rode_length: None,
            delay: 0,
            warning_percentage: 0.0,
            warning_notification: false,
            no_position_alarm_time: DEFAULT_NO_POSITION_ALARM_S,
            fudge: 0.0,
            bow_height: 0.0,
            state: Severity::Emergency,
            incomplete_anchor_alarm_time: DEFAULT_INCOMPLETE_ANCHOR_ALARM_MIN,
        }
    }
}

impl AnchorConfig {
    /// Fudge factor if it is a usable positive number
    pub fn fudge_m(&self) -> f64 {
        if self.fudge.is_finite() && self.fudge > 0.0 {
            self.fudge
        } else {
            0.0
        }
    }

    pub fn bow_height_m(&self) -> f64 {
        if self.bow_height.is_finite() && self.bow_height > 0.0 {
            self.bow_height
        } else {
            0.0
        }
    }
}
