//! [`AnchorHost`] for the native server.
//!
//! Sensor queries read the [`NavData`] cache, emitted deltas are merged into
//! [`Published`] (the values served under `/signalk/v1/api`) and the anchor
//! state goes to the [`StateFile`].

use anchoralarm_core::delta::paths;
use anchoralarm_core::{AnchorHost, AnchorState, Coordinate, Delta, Notification};
use log::{debug, error};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::navdata::NavData;
use crate::storage::StateFile;

const ANCHOR_PREFIX: &str = "navigation.anchor.";

/// Latest value per Signal K path, as published by the engine or written
/// by clients.
#[derive(Debug, Clone, Default)]
pub struct Published {
    values: BTreeMap<String, Value>,
    meta: BTreeMap<String, Value>,
}

impl Published {
    /// Merge a delta. `null` values are kept: a cleared path is still
    /// reported as cleared.
    pub fn record(&mut self, delta: &Delta) {
        for pv in delta.values() {
            self.values.insert(pv.path.clone(), pv.value.clone());
        }
        for pv in delta.meta() {
            self.meta.insert(pv.path.clone(), pv.value.clone());
        }
    }

    /// Take only the anchor notification of an incoming delta, so a client
    /// can change its methods.
    pub fn record_notifications(&mut self, delta: &Delta) {
        for pv in delta
            .values()
            .filter(|pv| pv.path == paths::ANCHOR_NOTIFICATION)
        {
            self.values.insert(pv.path.clone(), pv.value.clone());
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn notification(&self, path: &str) -> Option<Notification> {
        self.values
            .get(path)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The `navigation.anchor` subtree in Signal K full format:
    /// `{"currentRadius": {"value": 12.3}, ...}`. Cleared paths are left out.
    pub fn anchor_tree(&self) -> Value {
        let mut tree = Map::new();
        for (path, value) in self.values.range(ANCHOR_PREFIX.to_string()..) {
            let Some(key) = path.strip_prefix(ANCHOR_PREFIX) else {
                break;
            };
            if value.is_null() {
                continue;
            }
            let mut node = json!({ "value": value });
            if let Some(meta) = self.meta.get(path) {
                node["meta"] = meta.clone();
            }
            tree.insert(key.to_string(), node);
        }
        Value::Object(tree)
    }
}

/// Host bound to one locked view of the server state
pub struct ServerHost<'a> {
    navdata: &'a NavData,
    published: &'a mut Published,
    storage: &'a StateFile,
}

impl<'a> ServerHost<'a> {
    pub fn new(
        navdata: &'a NavData,
        published: &'a mut Published,
        storage: &'a StateFile,
    ) -> Self {
        ServerHost {
            navdata,
            published,
            storage,
        }
    }
}

impl AnchorHost for ServerHost<'_> {
    fn position(&self) -> Option<Coordinate> {
        self.navdata.position()
    }

    fn heading_true(&self) -> Option<f64> {
        self.navdata.heading_true()
    }

    fn heading_magnetic(&self) -> Option<f64> {
        self.navdata.heading_magnetic()
    }

    fn depth_below_surface(&self) -> Option<f64> {
        self.navdata.depth()
    }

    fn gps_from_bow(&self) -> Option<f64> {
        self.navdata.gps_from_bow()
    }

    fn anchor_notification(&self) -> Option<Notification> {
        self.published.notification(paths::ANCHOR_NOTIFICATION)
    }

    fn handle_message(&mut self, delta: Delta) {
        if log::log_enabled!(log::Level::Debug) {
            let paths: Vec<&str> = delta.values().map(|pv| pv.path.as_str()).collect();
            debug!("Publishing {}", paths.join(", "));
        }
        self.published.record(&delta);
    }

    fn save_state(&mut self, state: &AnchorState) -> Result<(), String> {
        self.storage.save(state).map_err(|e| {
            error!("Cannot save {}: {}", self.storage.path().display(), e);
            e.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchoralarm_core::{NotificationState, PathValue};
    use tempfile::tempdir;

    #[test]
    fn test_anchor_tree() {
        let mut published = Published::default();
        published.record(&Delta::from_values(
            vec![
                PathValue::new(paths::CURRENT_RADIUS, json!(12.5)),
                PathValue::new(paths::MAX_RADIUS, json!(40.0)),
                PathValue::new(paths::RODE_LENGTH, Value::Null),
                PathValue::new(paths::HEADING_TRUE, json!(1.0)),
            ],
            vec![PathValue::new(paths::CURRENT_RADIUS, json!({"zones": []}))],
        ));

        let tree = published.anchor_tree();
        assert_eq!(tree["currentRadius"]["value"], 12.5);
        assert_eq!(tree["currentRadius"]["meta"]["zones"], json!([]));
        assert_eq!(tree["maxRadius"]["value"], 40.0);
        assert!(tree.get("rodeLength").is_none());
        assert!(tree.get("headingTrue").is_none());
    }

    #[test]
    fn test_record_notifications_only() {
        let mut published = Published::default();
        published.record_notifications(&Delta::from_values(
            vec![
                PathValue::new(
                    paths::ANCHOR_NOTIFICATION,
                    json!({"state": "normal", "method": ["sound"], "message": ""}),
                ),
                PathValue::new(paths::MAX_RADIUS, json!(99.0)),
                PathValue::new(
                    paths::SETUP_NOTIFICATION,
                    json!({"state": "alarm", "method": [], "message": ""}),
                ),
                PathValue::new("notifications.mob", json!({"state": "emergency"})),
            ],
            Vec::new(),
        ));

        let notification = published.notification(paths::ANCHOR_NOTIFICATION).unwrap();
        assert_eq!(notification.method, vec!["sound".to_string()]);
        assert!(published.get(paths::MAX_RADIUS).is_none());
        assert!(published.get(paths::SETUP_NOTIFICATION).is_none());
        assert!(published.get("notifications.mob").is_none());
    }

    #[test]
    fn test_host_reads_navdata_and_records_deltas() {
        let dir = tempdir().unwrap();
        let storage = StateFile::new(dir.path().join("state.json"));
        let mut navdata = NavData::new();
        navdata.apply(&Delta::from_values(
            vec![
                PathValue::new(
                    paths::NAVIGATION_POSITION,
                    json!({"latitude": 10.0, "longitude": 20.0}),
                ),
                PathValue::new(paths::DEPTH_BELOW_SURFACE, json!(3.0)),
            ],
            Vec::new(),
        ));
        let mut published = Published::default();
        let mut host = ServerHost::new(&navdata, &mut published, &storage);

        assert_eq!(host.position(), Some(Coordinate::new(10.0, 20.0)));
        assert_eq!(host.depth_below_surface(), Some(3.0));
        assert_eq!(host.heading_true(), None);
        assert!(host.anchor_notification().is_none());

        let notification = Notification::new(NotificationState::Alarm, "Anchor Alarm - Alarm");
        host.handle_message(anchoralarm_core::delta::notification_delta(
            paths::ANCHOR_NOTIFICATION,
            &notification,
        ));
        assert_eq!(host.anchor_notification(), Some(notification));
    }

    #[test]
    fn test_save_state_writes_file() {
        let dir = tempdir().unwrap();
        let storage = StateFile::new(dir.path().join("state.json"));
        let navdata = NavData::new();
        let mut published = Published::default();
        let mut host = ServerHost::new(&navdata, &mut published, &storage);

        let state = AnchorState {
            active: true,
            position: Some(Coordinate::new(1.0, 1.0)),
            radius: Some(30.0),
            rode_length: None,
        };
        host.save_state(&state).unwrap();
        assert_eq!(storage.load().unwrap(), Some(state));
    }

    #[test]
    fn test_save_state_failure_is_reported() {
        let dir = tempdir().unwrap();
        let storage = StateFile::new(dir.path().to_path_buf());
        let navdata = NavData::new();
        let mut published = Published::default();
        let mut host = ServerHost::new(&navdata, &mut published, &storage);

        assert!(host.save_state(&AnchorState::default()).is_err());
    }
}
