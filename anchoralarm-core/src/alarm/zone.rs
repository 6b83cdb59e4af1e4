//! Edge-triggered alarm state
//!
//! The evaluator runs on every sample; notifications must not. An
//! [`AlarmLatch`] remembers what was last sent on one notification path and
//! only lets a notification through when the zone changes.

use serde::{Deserialize, Serialize};

use super::{NotificationState, Severity};

/// Alarm zone of the vessel relative to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneState {
    Normal,
    Warning,
    Breach,
}

impl ZoneState {
    /// Notification state reported for this zone
    pub fn notification_state(&self, severity: Severity) -> NotificationState {
        match self {
            ZoneState::Normal => NotificationState::Normal,
            ZoneState::Warning => NotificationState::Warn,
            ZoneState::Breach => severity.into(),
        }
    }
}

impl Default for ZoneState {
    fn default() -> Self {
        ZoneState::Normal
    }
}

/// A notification the latch decided to let through
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: NotificationState,
    pub message: String,
}

/// Last notification sent on a single path
#[derive(Debug, Clone, Default)]
pub struct AlarmLatch {
    zone: ZoneState,
    sent: Option<Transition>,
}

impl AlarmLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a warning or breach notification is outstanding
    pub fn is_active(&self) -> bool {
        self.zone != ZoneState::Normal
    }

    pub fn last_state(&self) -> Option<NotificationState> {
        self.sent.as_ref().map(|t| t.state)
    }

    /// Feed a classification; returns the notification to send, if any.
    ///
    /// - Normal is only reported when leaving an active alarm.
    /// - Warning is reported on entry.
    /// - Breach is reported on entry, and again when the message changes
    ///   (for instance drift replacing a lost position).
    pub fn update(
        &mut self,
        zone: ZoneState,
        state: NotificationState,
        message: &str,
    ) -> Option<Transition> {
        let emit = match zone {
            ZoneState::Normal => self.zone != ZoneState::Normal,
            ZoneState::Warning => self.zone != ZoneState::Warning,
            ZoneState::Breach => match (&self.sent, self.zone) {
                (Some(sent), ZoneState::Breach) => sent.state != state || sent.message != message,
                _ => true,
            },
        };

        self.zone = zone;
        if !emit {
            return None;
        }

        let transition = Transition {
            state,
            message: message.to_string(),
        };
        self.sent = Some(transition.clone());
        Some(transition)
    }

    /// Return to normal, reporting the clear if an alarm was outstanding
    pub fn clear(&mut self, message: &str) -> Option<Transition> {
        self.update(ZoneState::Normal, NotificationState::Normal, message)
    }
}

/// One band of the zone table published as metadata on `currentRadius`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneBound {
    pub lower: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    pub state: NotificationState,
}

/// Zone table for a radius: normal, optional warning band, then the breach severity
pub fn zone_table(
    radius: f64,
    warning_threshold: f64,
    warning_notification: bool,
    severity: Severity,
) -> Vec<ZoneBound> {
    let mut zones = Vec::with_capacity(3);
    if warning_threshold > 0.0 && warning_notification && warning_threshold < radius {
        zones.push(ZoneBound {
            lower: 0.0,
            upper: Some(warning_threshold),
            state: NotificationState::Normal,
        });
        zones.push(ZoneBound {
            lower: warning_threshold,
            upper: Some(radius),
            state: NotificationState::Warn,
        });
    } else {
        zones.push(ZoneBound {
            lower: 0.0,
            upper: Some(radius),
            state: NotificationState::Normal,
        });
    }
    zones.push(ZoneBound {
        lower: radius,
        upper: None,
        state: severity.into(),
    });
    zones
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIFT: &str = "Anchor Alarm - Emergency";
    const NO_FIX: &str = "No position received";
    const CLEAR: &str = "Anchor Alarm - Normal";

    #[test]
    fn test_nothing_emitted_at_startup() {
        let mut latch = AlarmLatch::new();
        assert_eq!(latch.clear(CLEAR), None);
        assert_eq!(
            latch.update(ZoneState::Normal, NotificationState::Normal, CLEAR),
            None
        );
        assert!(!latch.is_active());
        assert_eq!(latch.last_state(), None);
    }

    #[test]
    fn test_breach_is_edge_triggered() {
        let mut latch = AlarmLatch::new();
        let first = latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT);
        assert_eq!(
            first,
            Some(Transition {
                state: NotificationState::Emergency,
                message: DRIFT.to_string()
            })
        );
        assert_eq!(
            latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT),
            None
        );
        assert_eq!(
            latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT),
            None
        );
        assert!(latch.is_active());
    }

    #[test]
    fn test_breach_with_new_message_re_emits() {
        let mut latch = AlarmLatch::new();
        latch.update(ZoneState::Breach, NotificationState::Emergency, NO_FIX);
        let t = latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT);
        assert_eq!(t.map(|t| t.message), Some(DRIFT.to_string()));
    }

    #[test]
    fn test_clear_after_breach_emits_once() {
        let mut latch = AlarmLatch::new();
        latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT);

        let t = latch.clear(CLEAR).unwrap();
        assert_eq!(t.state, NotificationState::Normal);
        assert_eq!(latch.clear(CLEAR), None);
        assert_eq!(latch.last_state(), Some(NotificationState::Normal));
    }

    #[test]
    fn test_retrigger_after_clear() {
        let mut latch = AlarmLatch::new();
        latch.update(ZoneState::Breach, NotificationState::Emergency, DRIFT);
        latch.clear(CLEAR);
        assert!(latch
            .update(ZoneState::Breach, NotificationState::Emergency, DRIFT)
            .is_some());
    }

    #[test]
    fn test_warning_transitions() {
        let mut latch = AlarmLatch::new();
        assert!(latch
            .update(ZoneState::Warning, NotificationState::Warn, "Anchor Alarm - Warn")
            .is_some());
        assert!(latch
            .update(ZoneState::Warning, NotificationState::Warn, "Anchor Alarm - Warn")
            .is_none());
        // Escalation
        assert!(latch
            .update(ZoneState::Breach, NotificationState::Emergency, DRIFT)
            .is_some());
        // De-escalation back to warning is a change too
        assert!(latch
            .update(ZoneState::Warning, NotificationState::Warn, "Anchor Alarm - Warn")
            .is_some());
        assert!(latch.clear(CLEAR).is_some());
    }

    #[test]
    fn test_zone_table_with_warning() {
        let zones = zone_table(60.0, 30.0, true, Severity::Emergency);
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].upper, Some(30.0));
        assert_eq!(zones[1].state, NotificationState::Warn);
        assert_eq!(zones[1].upper, Some(60.0));
        assert_eq!(zones[2].lower, 60.0);
        assert_eq!(zones[2].upper, None);
        assert_eq!(zones[2].state, NotificationState::Emergency);
    }

    #[test]
    fn test_zone_table_without_warning() {
        let zones = zone_table(45.0, 30.0, false, Severity::Alarm);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].state, NotificationState::Normal);
        assert_eq!(zones[1].state, NotificationState::Alarm);

        let json = serde_json::to_value(&zones[1]).unwrap();
        assert!(json.get("upper").is_none());
    }
}
