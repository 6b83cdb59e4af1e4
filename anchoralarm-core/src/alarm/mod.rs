//! Anchor alarm classification and notification state
//!
//! - [`evaluator`] classifies a distance into normal / warning / breach,
//!   applying the warning zone and the trigger delay.
//! - [`zone`] turns the stream of classifications into edge-triggered
//!   notifications.

pub mod evaluator;
pub mod zone;

pub use evaluator::AlarmEvaluator;
pub use zone::{zone_table, AlarmLatch, Transition, ZoneBound, ZoneState};

use serde::{Deserialize, Serialize};

use crate::watchdog::{IncompleteSetupWatchdog, StalePositionWatchdog};

/// Signal K notification state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationState {
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl NotificationState {
    /// Capitalized label used in notification messages
    pub fn label(&self) -> &'static str {
        match self {
            NotificationState::Normal => "Normal",
            NotificationState::Alert => "Alert",
            NotificationState::Warn => "Warn",
            NotificationState::Alarm => "Alarm",
            NotificationState::Emergency => "Emergency",
        }
    }
}

impl Default for NotificationState {
    fn default() -> Self {
        NotificationState::Normal
    }
}

/// Severity used when the vessel leaves the alarm radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Emergency
    }
}

impl From<Severity> for NotificationState {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Alert => NotificationState::Alert,
            Severity::Warn => NotificationState::Warn,
            Severity::Alarm => NotificationState::Alarm,
            Severity::Emergency => NotificationState::Emergency,
        }
    }
}

/// Notification methods used when the host has no existing preference
pub const DEFAULT_METHODS: [&str; 2] = ["visual", "sound"];

/// Signal K notification value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub state: NotificationState,
    #[serde(default)]
    pub method: Vec<String>,
    #[serde(default)]
    pub message: String,
}

impl Notification {
    pub fn new(state: NotificationState, message: impl Into<String>) -> Self {
        Notification {
            state,
            method: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            message: message.into(),
        }
    }
}

/// Alarm bookkeeping for one anchoring session. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct AlarmSession {
    /// When a pending (delayed) alarm was first seen
    pub delay_start_ms: Option<u64>,
    /// Drift and no-position notifications (`notifications.navigation.anchor`)
    pub anchor: AlarmLatch,
    /// Incomplete setup notification
    pub setup: AlarmLatch,
    pub no_position: StalePositionWatchdog,
    pub incomplete_setup: IncompleteSetupWatchdog,
}

impl AlarmSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the last drift / no-position notification sent
    pub fn last_alarm_state(&self) -> Option<NotificationState> {
        self.anchor.last_state()
    }

    /// A drift or no-position alarm is outstanding
    pub fn anchor_alarm_active(&self) -> bool {
        self.anchor.is_active()
    }

    pub fn position_alarm_active(&self) -> bool {
        self.no_position.is_latched()
    }

    pub fn incomplete_setup_timer_active(&self) -> bool {
        self.incomplete_setup.is_armed()
    }

    /// Forget everything without emitting anything
    pub fn reset(&mut self) {
        *self = AlarmSession::default();
    }
}
