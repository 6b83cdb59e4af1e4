//! Vessel track while at anchor
//!
//! A bounded, rate-limited history of vessel positions, kept so a client can
//! draw the swing pattern around the anchor.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::geo::Coordinate;

/// One recorded vessel position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    /// Maximum points kept; the oldest is dropped first
    pub max_points: usize,
    /// Minimum interval between points in milliseconds
    pub min_interval_ms: u64,
}

impl Default for TrackSettings {
    fn default() -> Self {
        TrackSettings {
            max_points: 1440, // a day at one point per minute
            min_interval_ms: 60_000,
        }
    }
}

/// Ring buffer of track points, oldest first
#[derive(Debug, Clone)]
pub struct SampleWindow {
    settings: TrackSettings,
    points: VecDeque<TrackPoint>,
}

impl Default for SampleWindow {
    fn default() -> Self {
        SampleWindow::new(TrackSettings::default())
    }
}

impl SampleWindow {
    pub fn new(settings: TrackSettings) -> Self {
        SampleWindow {
            points: VecDeque::with_capacity(settings.max_points.min(1440)),
            settings,
        }
    }

    /// Record a position. Returns false if it was rate limited.
    pub fn add(&mut self, timestamp: u64, position: &Coordinate) -> bool {
        if let Some(last) = self.points.back() {
            if timestamp.saturating_sub(last.timestamp) < self.settings.min_interval_ms {
                return false;
            }
        }
        if self.settings.max_points == 0 {
            return false;
        }
        while self.points.len() >= self.settings.max_points {
            self.points.pop_front();
        }
        self.points.push_back(TrackPoint {
            timestamp,
            latitude: position.latitude,
            longitude: position.longitude,
        });
        true
    }

    /// Copy of the track for export
    pub fn to_vec(&self) -> Vec<TrackPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
