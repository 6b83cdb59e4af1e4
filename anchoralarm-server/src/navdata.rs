//! Sensor cache fed by incoming Signal K deltas.
//!
//! Keeps the latest value of every path the anchor engine reads. Position
//! and true heading are also queued as a fresh sample for the monitor tick;
//! a tick without a fresh position is what lets the no-position watchdog
//! see a dead GPS.

use anchoralarm_core::delta::paths;
use anchoralarm_core::{Coordinate, Delta};
use log::{debug, trace};
use serde_json::Value;

const SELF_CONTEXT: &str = "vessels.self";

#[derive(Debug, Clone, Default)]
pub struct NavData {
    position: Option<Coordinate>,
    heading_true: Option<f64>,
    heading_magnetic: Option<f64>,
    depth: Option<f64>,
    gps_from_bow: Option<f64>,

    fresh_position: Option<Coordinate>,
    fresh_heading: Option<f64>,
}

impl NavData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the values of a delta. Returns the number of values used.
    ///
    /// Deltas for other vessels are ignored. A `null` value clears the
    /// reading; a value of the wrong shape is skipped.
    pub fn apply(&mut self, delta: &Delta) -> usize {
        if let Some(context) = delta.context.as_deref() {
            if context != SELF_CONTEXT {
                debug!("Ignoring delta for {}", context);
                return 0;
            }
        }

        let mut used = 0;
        for pv in delta.values() {
            let taken = match pv.path.as_str() {
                paths::NAVIGATION_POSITION => match parse_position(&pv.value) {
                    Some(position) => {
                        self.position = position;
                        if position.is_some() {
                            self.fresh_position = position;
                        }
                        true
                    }
                    None => false,
                },
                paths::HEADING_TRUE => match parse_number(&pv.value) {
                    Some(heading) => {
                        self.heading_true = heading;
                        if heading.is_some() {
                            self.fresh_heading = heading;
                        }
                        true
                    }
                    None => false,
                },
                paths::HEADING_MAGNETIC => set_number(&mut self.heading_magnetic, &pv.value),
                paths::DEPTH_BELOW_SURFACE => set_number(&mut self.depth, &pv.value),
                paths::GPS_FROM_BOW => set_number(&mut self.gps_from_bow, &pv.value),
                _ => false,
            };
            if taken {
                trace!("{} = {}", pv.path, pv.value);
                used += 1;
            }
        }
        used
    }

    /// Position and true heading received since the previous call
    pub fn take_sample(&mut self) -> (Option<Coordinate>, Option<f64>) {
        (self.fresh_position.take(), self.fresh_heading.take())
    }

    pub fn position(&self) -> Option<Coordinate> {
        self.position
    }

    pub fn heading_true(&self) -> Option<f64> {
        self.heading_true
    }

    pub fn heading_magnetic(&self) -> Option<f64> {
        self.heading_magnetic
    }

    pub fn depth(&self) -> Option<f64> {
        self.depth
    }

    pub fn gps_from_bow(&self) -> Option<f64> {
        self.gps_from_bow
    }
}

/// `Some(None)` for null, `None` if the value is unusable
fn parse_position(value: &Value) -> Option<Option<Coordinate>> {
    if value.is_null() {
        return Some(None);
    }
    serde_json::from_value::<Coordinate>(value.clone())
        .ok()
        .filter(|c| c.is_valid())
        .map(Some)
}

fn parse_number(value: &Value) -> Option<Option<f64>> {
    if value.is_null() {
        return Some(None);
    }
    value.as_f64().filter(|v| v.is_finite()).map(Some)
}

fn set_number(slot: &mut Option<f64>, value: &Value) -> bool {
    match parse_number(value) {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}
