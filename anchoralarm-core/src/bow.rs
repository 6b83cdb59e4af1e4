//! GPS antenna to bow projection

use crate::geo::{destination_point, Coordinate};

/// Moves a GPS fix forward to the bow roller.
///
/// The GPS antenna is rarely at the bow, and the anchor leaves the boat at
/// the bow, so positions are projected `gps_from_bow` meters along the
/// heading before they are compared with the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BowProjector {
    gps_from_bow: Option<f64>,
}

impl BowProjector {
    pub fn new(gps_from_bow: Option<f64>) -> Self {
        BowProjector {
            gps_from_bow: gps_from_bow.filter(|d| d.is_finite() && *d > 0.0),
        }
    }

    /// Offset in meters, 0 when unknown
    pub fn offset(&self) -> f64 {
        self.gps_from_bow.unwrap_or(0.0)
    }

    /// Bow position for a vessel position. Without an offset or a heading
    /// the vessel position is returned unchanged.
    pub fn project(&self, vessel: &Coordinate, heading_rad: Option<f64>) -> Coordinate {
        match (self.gps_from_bow, heading_rad.filter(|h| h.is_finite())) {
            (Some(offset), Some(heading)) => destination_point(vessel, heading, offset),
            _ => *vessel,
        }
    }
}

/// Horizontal swing radius of a rode.
///
/// The rode runs from the bow roller to the anchor: the hypotenuse of a
/// triangle whose height is depth plus bow height. A rode shorter than that
/// height would give a negative square; the absolute value is used instead.
/// Without a usable depth the whole rode counts as swing.
pub fn swing_radius(rode: f64, depth: Option<f64>, bow_height: f64) -> f64 {
    match depth.filter(|d| d.is_finite() && *d != 0.0) {
        Some(depth) => {
            let height = depth + bow_height;
            (rode * rode - height * height).abs().sqrt()
        }
        None => rode,
    }
}
