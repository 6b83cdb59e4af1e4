//! Signal K delta messages
//!
//! The same types are used for the deltas the engine emits and for the
//! sensor deltas a host ingests. Every anchor path the engine publishes is
//! built here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::alarm::{Notification, ZoneBound};
use crate::geo::Coordinate;

/// `$source` label of everything the engine emits
pub const SOURCE_LABEL: &str = "anchoralarm";

/// Signal K paths
pub mod paths {
    pub const ANCHOR_POSITION: &str = "navigation.anchor.position";
    pub const CURRENT_RADIUS: &str = "navigation.anchor.currentRadius";
    pub const MAX_RADIUS: &str = "navigation.anchor.maxRadius";
    pub const RODE_LENGTH: &str = "navigation.anchor.rodeLength";
    pub const DISTANCE_FROM_BOW: &str = "navigation.anchor.distanceFromBow";
    pub const BEARING_TRUE: &str = "navigation.anchor.bearingTrue";
    pub const APPARENT_BEARING: &str = "navigation.anchor.apparentBearing";
    pub const FUDGE_FACTOR: &str = "navigation.anchor.fudgeFactor";
    pub const BOW_ANCHOR_HEIGHT: &str = "design.bowAnchorHeight";

    pub const ANCHOR_NOTIFICATION: &str = "notifications.navigation.anchor";
    pub const SETUP_NOTIFICATION: &str = "notifications.navigation.anchorSetup";

    pub const NAVIGATION_POSITION: &str = "navigation.position";
    pub const HEADING_TRUE: &str = "navigation.headingTrue";
    pub const HEADING_MAGNETIC: &str = "navigation.headingMagnetic";
    pub const DEPTH_BELOW_SURFACE: &str = "environment.depth.belowSurface";
    pub const GPS_FROM_BOW: &str = "sensors.gps.fromBow";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub updates: Vec<Update>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<PathValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<PathValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathValue {
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

impl PathValue {
    pub fn new(path: &str, value: Value) -> Self {
        PathValue {
            path: path.to_string(),
            value,
        }
    }
}

impl Delta {
    /// Single-update delta from this engine
    pub fn from_values(values: Vec<PathValue>, meta: Vec<PathValue>) -> Self {
        Delta {
            context: None,
            updates: vec![Update {
                source: Some(Source {
                    label: SOURCE_LABEL.to_string(),
                }),
                timestamp: None,
                values,
                meta,
            }],
        }
    }

    /// All values across all updates, in order
    pub fn values(&self) -> impl Iterator<Item = &PathValue> {
        self.updates.iter().flat_map(|u| u.values.iter())
    }

    /// All meta entries across all updates
    pub fn meta(&self) -> impl Iterator<Item = &PathValue> {
        self.updates.iter().flat_map(|u| u.meta.iter())
    }

    /// Last value for a path, if present
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.values()
            .filter(|pv| pv.path == path)
            .last()
            .map(|pv| &pv.value)
    }
}

/// Build a notification delta
pub fn notification_delta(path: &str, notification: &Notification) -> Delta {
    let value = serde_json::to_value(notification).unwrap_or(Value::Null);
    Delta::from_values(vec![PathValue::new(path, value)], Vec::new())
}

/// Anchor geometry published after every sample and every setup change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryUpdate {
    /// `None` publishes the cleared (raised) anchor
    pub position: Option<Coordinate>,
    /// Distance from the GPS antenna to the anchor
    pub current_radius: Option<f64>,
    pub max_radius: Option<f64>,
    pub rode_length: Option<f64>,
    pub distance_from_bow: Option<f64>,
    /// Radians
    pub bearing_true: Option<f64>,
    /// Radians relative to the heading
    pub apparent_bearing: Option<f64>,
    pub fudge_factor: Option<f64>,
    pub bow_height: Option<f64>,
    pub zones: Option<Vec<ZoneBound>>,
}

fn push_number(values: &mut Vec<PathValue>, path: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        values.push(PathValue::new(path, json!(v)));
    }
}

impl GeometryUpdate {
    /// Delta for a raised anchor: every anchor path set to null
    pub fn cleared() -> Delta {
        let values = vec![
            PathValue::new(
                paths::ANCHOR_POSITION,
                json!({"latitude": null, "longitude": null, "altitude": null}),
            ),
            PathValue::new(paths::CURRENT_RADIUS, Value::Null),
            PathValue::new(paths::MAX_RADIUS, Value::Null),
            PathValue::new(paths::RODE_LENGTH, Value::Null),
            PathValue::new(paths::DISTANCE_FROM_BOW, Value::Null),
            PathValue::new(paths::BEARING_TRUE, Value::Null),
            PathValue::new(paths::APPARENT_BEARING, Value::Null),
        ];
        Delta::from_values(values, Vec::new())
    }

    pub fn to_delta(&self) -> Delta {
        let position = match &self.position {
            Some(p) => p,
            None => return GeometryUpdate::cleared(),
        };

        let mut values = Vec::with_capacity(10);
        values.push(PathValue::new(
            paths::ANCHOR_POSITION,
            serde_json::to_value(position).unwrap_or(Value::Null),
        ));
        push_number(&mut values, paths::CURRENT_RADIUS, self.current_radius);
        push_number(&mut values, paths::MAX_RADIUS, self.max_radius);
        push_number(&mut values, paths::RODE_LENGTH, self.rode_length);
        push_number(&mut values, paths::DISTANCE_FROM_BOW, self.distance_from_bow);
        push_number(&mut values, paths::BEARING_TRUE, self.bearing_true);
        push_number(&mut values, paths::APPARENT_BEARING, self.apparent_bearing);
        push_number(&mut values, paths::FUDGE_FACTOR, self.fudge_factor);
        push_number(&mut values, paths::BOW_ANCHOR_HEIGHT, self.bow_height);

        let mut meta = Vec::new();
        if let Some(zones) = &self.zones {
            meta.push(PathValue::new(
                paths::CURRENT_RADIUS,
                json!({ "zones": zones }),
            ));
        }

        Delta::from_values(values, meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{zone_table, NotificationState, Severity};

    #[test]
    fn test_cleared_delta() {
        let delta = GeometryUpdate::cleared();
        assert_eq!(
            delta.value(paths::ANCHOR_POSITION),
            Some(&json!({"latitude": null, "longitude": null, "altitude": null}))
        );
        assert_eq!(delta.value(paths::MAX_RADIUS), Some(&Value::Null));
        assert_eq!(delta.value(paths::CURRENT_RADIUS), Some(&Value::Null));
        assert_eq!(
            delta.updates[0].source.as_ref().map(|s| s.label.as_str()),
            Some(SOURCE_LABEL)
        );
    }

    #[test]
    fn test_no_position_means_cleared() {
        let update = GeometryUpdate {
            max_radius: Some(50.0),
            ..GeometryUpdate::default()
        };
        assert_eq!(update.to_delta(), GeometryUpdate::cleared());
    }

    #[test]
    fn test_geometry_values() {
        let update = GeometryUpdate {
            position: Some(Coordinate::new(52.0, 4.0).with_altitude(Some(-5.0))),
            current_radius: Some(12.5),
            max_radius: Some(40.0),
            rode_length: None,
            distance_from_bow: Some(10.0),
            bearing_true: Some(1.0),
            apparent_bearing: Some(-0.5),
            fudge_factor: Some(0.0),
            bow_height: Some(1.2),
            zones: None,
        };
        let delta = update.to_delta();

        assert_eq!(
            delta.value(paths::ANCHOR_POSITION),
            Some(&json!({"latitude": 52.0, "longitude": 4.0, "altitude": -5.0}))
        );
        assert_eq!(delta.value(paths::CURRENT_RADIUS), Some(&json!(12.5)));
        assert_eq!(delta.value(paths::MAX_RADIUS), Some(&json!(40.0)));
        assert_eq!(delta.value(paths::RODE_LENGTH), None);
        assert_eq!(delta.value(paths::APPARENT_BEARING), Some(&json!(-0.5)));
        assert_eq!(delta.value(paths::BOW_ANCHOR_HEIGHT), Some(&json!(1.2)));
        assert_eq!(delta.meta().count(), 0);
    }

    #[test]
    fn test_non_finite_values_dropped() {
        let update = GeometryUpdate {
            position: Some(Coordinate::new(52.0, 4.0)),
            current_radius: Some(f64::NAN),
            max_radius: Some(f64::INFINITY),
            ..GeometryUpdate::default()
        };
        let delta = update.to_delta();
        assert_eq!(delta.value(paths::CURRENT_RADIUS), None);
        assert_eq!(delta.value(paths::MAX_RADIUS), None);
        assert_eq!(delta.values().count(), 1);
    }

    #[test]
    fn test_zone_meta() {
        let update = GeometryUpdate {
            position: Some(Coordinate::new(52.0, 4.0)),
            zones: Some(zone_table(60.0, 0.0, false, Severity::Emergency)),
            ..GeometryUpdate::default()
        };
        let delta = update.to_delta();
        let meta: Vec<&PathValue> = delta.meta().collect();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].path, paths::CURRENT_RADIUS);
        assert_eq!(meta[0].value["zones"][1]["state"], "emergency");
        assert_eq!(meta[0].value["zones"][1]["lower"], 60.0);
    }

    #[test]
    fn test_notification_delta() {
        let n = Notification::new(NotificationState::Alarm, "Anchoring not completed");
        let delta = notification_delta(paths::SETUP_NOTIFICATION, &n);
        let value = delta.value(paths::SETUP_NOTIFICATION).unwrap();
        assert_eq!(value["state"], "alarm");
        assert_eq!(value["message"], "Anchoring not completed");
    }

    #[test]
    fn test_parse_sensor_delta() {
        let json = r#"{
            "context": "vessels.self",
            "updates": [{
                "source": {"label": "gps", "type": "NMEA0183"},
                "timestamp": "2024-06-01T10:00:00Z",
                "values": [
                    {"path": "navigation.position", "value": {"latitude": 52.0, "longitude": 4.0}},
                    {"path": "navigation.headingTrue", "value": 1.2}
                ]
            }]
        }"#;
        let delta: Delta = serde_json::from_str(json).unwrap();
        assert_eq!(delta.values().count(), 2);
        assert_eq!(delta.value(paths::HEADING_TRUE), Some(&json!(1.2)));
    }
}
