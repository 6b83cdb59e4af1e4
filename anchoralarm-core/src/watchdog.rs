//! Timeout watchdogs
//!
//! Both watchdogs are plain deadlines checked from `AnchorEngine::poll`.
//! Cancelling one is a field reset, so nothing can fire after it.

/// Alarms when position samples stop arriving.
///
/// Checked every half timeout; fires once and stays latched until cleared.
#[derive(Debug, Clone, Default)]
pub struct StalePositionWatchdog {
    timeout_ms: u64,
    next_check_ms: Option<u64>,
    last_sample_ms: u64,
    latched: bool,
}

impl StalePositionWatchdog {
    /// Arm with a timeout in seconds. A zero timeout leaves it disarmed.
    pub fn arm(&mut self, timeout_s: u64, now_ms: u64) {
        self.latched = false;
        self.last_sample_ms = now_ms;
        if timeout_s == 0 {
            self.timeout_ms = 0;
            self.next_check_ms = None;
            return;
        }
        self.timeout_ms = timeout_s.saturating_mul(1000);
        self.next_check_ms = Some(now_ms.saturating_add(self.check_interval_ms()));
    }

    pub fn cancel(&mut self) {
        self.next_check_ms = None;
        self.latched = false;
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn clear_latch(&mut self) {
        self.latched = false;
    }

    /// Record that a position sample arrived
    pub fn sample(&mut self, now_ms: u64) {
        self.last_sample_ms = now_ms;
    }

    fn check_interval_ms(&self) -> u64 {
        (self.timeout_ms / 2).max(1)
    }

    /// Returns true exactly once when the position has gone stale
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let next = match self.next_check_ms {
            Some(next) => next,
            None => return false,
        };
        if now_ms < next {
            return false;
        }
        self.next_check_ms = Some(now_ms.saturating_add(self.check_interval_ms()));

        if self.latched || now_ms.saturating_sub(self.last_sample_ms) < self.timeout_ms {
            return false;
        }
        self.latched = true;
        true
    }
}

/// Alarms when a drop is not followed by a radius or rode length in time.
#[derive(Debug, Clone, Default)]
pub struct IncompleteSetupWatchdog {
    deadline_ms: Option<u64>,
    fired: bool,
}

impl IncompleteSetupWatchdog {
    /// Arm with a timeout in minutes. A zero timeout leaves it disarmed.
    pub fn arm(&mut self, timeout_min: u64, now_ms: u64) {
        self.fired = false;
        self.deadline_ms = if timeout_min == 0 {
            None
        } else {
            Some(now_ms.saturating_add(timeout_min.saturating_mul(60_000)))
        };
    }

    /// Disarm; returns true if it had already fired
    pub fn cancel(&mut self) -> bool {
        let fired = self.fired;
        self.deadline_ms = None;
        self.fired = false;
        fired
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Returns true once when the deadline passes
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                self.fired = true;
                true
            }
            _ => false,
        }
    }
}
