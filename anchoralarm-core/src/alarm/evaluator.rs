//! Distance classification with warning zone and trigger delay

use super::{AlarmSession, Severity, ZoneState};
use crate::config::AnchorConfig;

/// Classifies the distance to the anchor against the configured thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmEvaluator {
    /// Alarm radius in meters. `None` means no classification is possible.
    pub radius: Option<f64>,
    /// Warning zone as a percentage of the radius, 0 disables
    pub warning_percentage: f64,
    pub warning_notification: bool,
    /// Seconds a breach must persist before it is reported
    pub delay_seconds: u64,
    pub severity: Severity,
}

impl AlarmEvaluator {
    pub fn from_config(config: &AnchorConfig, radius: Option<f64>) -> Self {
        AlarmEvaluator {
            radius,
            warning_percentage: config.warning_percentage,
            warning_notification: config.warning_notification,
            delay_seconds: config.delay,
            severity: config.state,
        }
    }

    /// Distance beyond which the warning zone starts, 0 when disabled
    pub fn warning_threshold(&self) -> f64 {
        match self.radius {
            Some(radius) if self.warning_percentage > 0.0 => {
                radius * self.warning_percentage / 100.0
            }
            _ => 0.0,
        }
    }

    /// Zone the distance falls in, ignoring the delay
    pub fn classify(&self, distance: f64) -> ZoneState {
        let radius = match self.radius {
            Some(r) if r.is_finite() => r,
            _ => return ZoneState::Normal,
        };
        if !distance.is_finite() {
            return ZoneState::Normal;
        }

        let warning = self.warning_threshold();
        if distance > radius {
            ZoneState::Breach
        } else if warning > 0.0 && self.warning_notification && distance > warning {
            ZoneState::Warning
        } else {
            ZoneState::Normal
        }
    }

    /// Classify and apply the trigger delay.
    ///
    /// While a breach or warning is pending the result is `Normal`; the delay
    /// clock in `session` restarts whenever the distance is back in the
    /// normal zone.
    pub fn evaluate(&self, session: &mut AlarmSession, distance: f64, now_ms: u64) -> ZoneState {
        let candidate = self.classify(distance);

        if candidate == ZoneState::Normal {
            session.delay_start_ms = None;
            return ZoneState::Normal;
        }

        if self.delay_seconds == 0 {
            return candidate;
        }

        match session.delay_start_ms {
            None => {
                log::debug!(
                    "{:?} pending, waiting {}s before alarming",
                    candidate,
                    self.delay_seconds
                );
                session.delay_start_ms = Some(now_ms);
                ZoneState::Normal
            }
            Some(start)
                if now_ms.saturating_sub(start) >= self.delay_seconds.saturating_mul(1000) =>
            {
                candidate
            }
            Some(_) => ZoneState::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::NotificationState;

    fn evaluator(radius: f64) -> AlarmEvaluator {
        AlarmEvaluator {
            radius: Some(radius),
            warning_percentage: 0.0,
            warning_notification: false,
            delay_seconds: 0,
            severity: Severity::Emergency,
        }
    }

    #[test]
    fn test_inside_and_outside_radius() {
        let e = evaluator(60.0);
        let mut session = AlarmSession::new();

        assert_eq!(e.evaluate(&mut session, 59.0, 0), ZoneState::Normal);
        let zone = e.evaluate(&mut session, 61.0, 1000);
        assert_eq!(zone, ZoneState::Breach);
        assert_eq!(
            zone.notification_state(e.severity),
            NotificationState::Emergency
        );
    }

    #[test]
    fn test_on_the_radius_is_normal() {
        let e = evaluator(60.0);
        assert_eq!(e.classify(60.0), ZoneState::Normal);
    }

    #[test]
    fn test_no_radius_no_classification() {
        let mut e = evaluator(60.0);
        e.radius = None;
        let mut session = AlarmSession::new();
        assert_eq!(e.evaluate(&mut session, 10_000.0, 0), ZoneState::Normal);
    }

    #[test]
    fn test_non_finite_distance_is_ignored() {
        let e = evaluator(60.0);
        assert_eq!(e.classify(f64::NAN), ZoneState::Normal);
        assert_eq!(e.classify(f64::INFINITY), ZoneState::Normal);
    }

    #[test]
    fn test_delay_suppresses_then_triggers() {
        let mut e = evaluator(60.0);
        e.delay_seconds = 10;
        let mut session = AlarmSession::new();

        assert_eq!(e.evaluate(&mut session, 61.0, 0), ZoneState::Normal);
        assert_eq!(session.delay_start_ms, Some(0));
        assert_eq!(e.evaluate(&mut session, 61.0, 9_000), ZoneState::Normal);
        assert_eq!(e.evaluate(&mut session, 61.0, 11_000), ZoneState::Breach);
        // Stays triggered while outside
        assert_eq!(e.evaluate(&mut session, 62.0, 12_000), ZoneState::Breach);
    }

    #[test]
    fn test_delay_resets_when_back_inside() {
        let mut e = evaluator(60.0);
        e.delay_seconds = 10;
        let mut session = AlarmSession::new();

        e.evaluate(&mut session, 61.0, 0);
        assert_eq!(e.evaluate(&mut session, 50.0, 5_000), ZoneState::Normal);
        assert_eq!(session.delay_start_ms, None);

        // Clock restarts from the next excursion
        assert_eq!(e.evaluate(&mut session, 61.0, 6_000), ZoneState::Normal);
        assert_eq!(e.evaluate(&mut session, 61.0, 12_000), ZoneState::Normal);
        assert_eq!(e.evaluate(&mut session, 61.0, 16_000), ZoneState::Breach);
    }

    #[test]
    fn test_warning_zone() {
        let mut e = evaluator(60.0);
        e.warning_percentage = 50.0;
        e.warning_notification = true;
        let mut session = AlarmSession::new();

        assert_eq!(e.warning_threshold(), 30.0);
        let zone = e.evaluate(&mut session, 40.0, 0);
        assert_eq!(zone, ZoneState::Warning);
        assert_eq!(zone.notification_state(e.severity), NotificationState::Warn);
        assert_eq!(e.evaluate(&mut session, 20.0, 1000), ZoneState::Normal);
        assert_eq!(e.evaluate(&mut session, 61.0, 2000), ZoneState::Breach);
    }

    #[test]
    fn test_warning_zone_needs_notification_enabled() {
        let mut e = evaluator(60.0);
        e.warning_percentage = 50.0;
        e.warning_notification = false;
        assert_eq!(e.classify(40.0), ZoneState::Normal);
    }

    #[test]
    fn test_warning_percentage_zero_disables() {
        let mut e = evaluator(60.0);
        e.warning_notification = true;
        assert_eq!(e.warning_threshold(), 0.0);
        assert_eq!(e.classify(59.0), ZoneState::Normal);
    }

    #[test]
    fn test_from_config() {
        let config = AnchorConfig {
            warning_percentage: 80.0,
            warning_notification: true,
            delay: 5,
            state: Severity::Alarm,
            ..AnchorConfig::default()
        };
        let e = AlarmEvaluator::from_config(&config, Some(100.0));
        assert_eq!(e.warning_threshold(), 80.0);
        assert_eq!(e.delay_seconds, 5);
        assert_eq!(e.severity, Severity::Alarm);
    }

    #[test]
    fn test_huge_delay_never_alarms() {
        let config = AnchorConfig {
            delay: u64::MAX / 100,
            ..AnchorConfig::default()
        };
        let e = AlarmEvaluator::from_config(&config, Some(60.0));
        let mut session = AlarmSession::new();
        assert_eq!(e.evaluate(&mut session, 61.0, 0), ZoneState::Normal);
        assert_eq!(e.evaluate(&mut session, 61.0, u64::MAX), ZoneState::Normal);
    }
}
