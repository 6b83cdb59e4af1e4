//! Persisted anchor state

use serde::{Deserialize, Serialize};

use crate::config::AnchorConfig;
use crate::geo::Coordinate;

/// The anchoring record that survives restarts.
///
/// `active` is serialized as `on`, matching the plugin options layout. An
/// active anchor always has a position; the radius may still be missing
/// right after a drop until the user sets a radius or rode length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorState {
    #[serde(rename = "on", default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rode_length: Option<f64>,
}

impl AnchorState {
    /// Initial state taken from the options layout of the configuration
    pub fn from_config(config: &AnchorConfig) -> Self {
        AnchorState {
            active: config.on,
            position: config.position,
            radius: config.radius,
            rode_length: config.rode_length,
        }
        .normalized()
    }

    /// Drop anything that violates the invariants: unusable numbers become
    /// `None`, and an anchor without a position is not active.
    pub fn normalized(mut self) -> Self {
        self.position = self.position.filter(|p| p.is_valid()).map(|p| {
            p.with_altitude(p.altitude.filter(|a| a.is_finite()))
        });
        self.radius = self.radius.filter(|r| r.is_finite() && *r > 0.0);
        self.rode_length = self.rode_length.filter(|r| r.is_finite() && *r > 0.0);
        if self.position.is_none() {
            self.active = false;
        }
        self
    }

    /// Anchor position if the anchor is down
    pub fn anchor_position(&self) -> Option<Coordinate> {
        if self.active {
            self.position
        } else {
            None
        }
    }

    /// True when there is enough to watch the vessel
    pub fn is_watchable(&self) -> bool {
        self.active && self.position.is_some() && self.radius.is_some()
    }

    /// Depth of the anchor below the surface from the position altitude
    pub fn anchor_depth(&self) -> Option<f64> {
        self.position
            .and_then(|p| p.altitude)
            .map(|a| -a)
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Replace the anchor position. Clearing it also clears `active`.
    /// Back to the raised state
    pub fn clear(&mut self) {
        *self = AnchorState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dropped() -> AnchorState {
        AnchorState {
            active: true,
            position: Some(Coordinate::new(52.0, 4.0).with_altitude(Some(-8.0))),
            radius: Some(40.0),
            rode_length: Some(30.0),
        }
    }

    #[test]
    fn test_serializes_active_as_on() {
        let json = serde_json::to_value(dropped()).unwrap();
        assert_eq!(json["on"], true);
        assert!(json.get("active").is_none());
        assert_eq!(json["rodeLength"], 30.0);
        assert_eq!(json["position"]["altitude"], -8.0);
    }

    #[test]
    fn test_empty_state_serialization() {
        let json = serde_json::to_string(&AnchorState::default()).unwrap();
        assert_eq!(json, r#"{"on":false}"#);
        let back: AnchorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AnchorState::default());
    }

    #[test]
    fn test_normalized_enforces_position_invariant() {
        let state = AnchorState {
            active: true,
            position: None,
            radius: Some(50.0),
            rode_length: None,
        }
        .normalized();
        assert!(!state.active);

        let state = AnchorState {
            active: true,
            position: Some(Coordinate::new(120.0, 0.0)),
            radius: Some(f64::NAN),
            rode_length: Some(-1.0),
        }
        .normalized();
        assert!(!state.active);
        assert_eq!(state.position, None);
        assert_eq!(state.radius, None);
        assert_eq!(state.rode_length, None);
    }

    #[test]
    fn test_from_config() {
        let config = AnchorConfig {
            on: true,
            position: Some(Coordinate::new(10.0, 20.0)),
            ..AnchorConfig::default()
        };
        let state = AnchorState::from_config(&config);
        assert!(state.active);
        assert_eq!(state.radius, Some(60.0));
        assert!(state.is_watchable());

        let state = AnchorState::from_config(&AnchorConfig {
            on: true,
            ..AnchorConfig::default()
        });
        assert!(!state.active);
        assert!(!state.is_watchable());
    }

    #[test]
    fn test_anchor_depth() {
        assert_eq!(dropped().anchor_depth(), Some(8.0));
        let mut state = dropped();
        state.position = Some(Coordinate::new(52.0, 4.0));
        assert_eq!(state.anchor_depth(), None);
    }

    #[test]
    fn test_clearing_position_deactivates() {
        let mut state = dropped();
        state.position = None;
        let state = state.normalized();
        assert!(!state.active);
        assert_eq!(state.anchor_position(), None);

        let mut state = dropped();
        state.clear();
        assert_eq!(state, AnchorState::default());
    }

    #[test]
    fn test_incomplete_drop_is_not_watchable() {
        let mut state = dropped();
        state.radius = None;
        assert!(state.active);
        assert!(state.anchor_position().is_some());
        assert!(!state.is_watchable());
    }
}
