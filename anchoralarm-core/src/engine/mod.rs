//! AnchorEngine - anchor watch control loop
//!
//! Single owner of the anchor state. Hosts feed it position samples,
//! call [`AnchorEngine::poll`] periodically and forward user setup actions.
//! Everything the engine publishes goes out through [`AnchorHost`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │           AnchorEngine                                       │
//! │  ├─ AnchorState (persisted)                                  │
//! │  ├─ PositionWatch (while watching)                           │
//! │  ├─ AlarmSession                                             │
//! │  │   ├─ AlarmLatch x2 (anchor, setup)                        │
//! │  │   └─ watchdogs (stale position, incomplete setup)         │
//! │  └─ SampleWindow (track)                                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Setup operations validate and compute first and only then commit, so a
//! failed operation leaves the state untouched. A persistence failure is the
//! exception: the new state is kept and the error is reported.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::alarm::{
    zone_table, AlarmEvaluator, AlarmSession, Notification, NotificationState, Transition,
    ZoneState, DEFAULT_METHODS,
};
use crate::bow::{swing_radius, BowProjector};
use crate::config::AnchorConfig;
use crate::delta::{notification_delta, paths, GeometryUpdate};
use crate::error::{require_positive, AnchorError};
use crate::geo::{destination_point, distance, relative_bearing, rhumb_bearing, Coordinate};
use crate::host::AnchorHost;
use crate::state::AnchorState;
use crate::track::SampleWindow;

const NO_POSITION_MESSAGE: &str = "No position received";
const INCOMPLETE_SETUP_MESSAGE: &str = "Anchoring not completed";
const SETUP_COMPLETE_MESSAGE: &str = "Anchoring completed";

fn drift_message(state: NotificationState) -> String {
    format!("Anchor Alarm - {}", state.label())
}

fn usable_depth(depth: Option<f64>) -> Option<f64> {
    depth.filter(|d| d.is_finite() && *d > 0.0)
}

/// Depth arguments may be absent or zero, never negative
fn validate_depth(depth: Option<f64>) -> Result<Option<f64>, AnchorError> {
    match depth {
        Some(d) if !d.is_finite() || d < 0.0 => Err(AnchorError::InvalidInput(format!(
            "depth must be a non-negative number, got {}",
            d
        ))),
        other => Ok(other),
    }
}

fn validate_position(position: &Coordinate) -> Result<(), AnchorError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(AnchorError::InvalidInput(format!(
            "invalid position {},{}",
            position.latitude, position.longitude
        )))
    }
}

/// Value of a PUT on `navigation.anchor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPut {
    pub position: Coordinate,
    pub radius: f64,
}

/// Subscription to the position feed. Exists exactly while the engine is
/// watching; dropping it from the engine is the cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionWatch {
    id: u64,
    since_ms: u64,
}

impl PositionWatch {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn since_ms(&self) -> u64 {
        self.since_ms
    }
}

pub struct AnchorEngine {
    config: AnchorConfig,
    state: AnchorState,
    session: AlarmSession,
    watch: Option<PositionWatch>,
    next_watch_id: u64,
    track: SampleWindow,
    last_position: Option<Coordinate>,
    last_heading: Option<f64>,
}

impl Default for AnchorEngine {
    fn default() -> Self {
        Self::new(AnchorConfig::default())
    }
}

impl AnchorEngine {
    pub fn new(config: AnchorConfig) -> Self {
        let state = AnchorState::from_config(&config);
        AnchorEngine {
            config,
            state,
            session: AlarmSession::new(),
            watch: None,
            next_watch_id: 0,
            track: SampleWindow::default(),
            last_position: None,
            last_heading: None,
        }
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    pub fn state(&self) -> &AnchorState {
        &self.state
    }

    pub fn session(&self) -> &AlarmSession {
        &self.session
    }

    pub fn track(&self) -> &SampleWindow {
        &self.track
    }

    pub fn watch(&self) -> Option<&PositionWatch> {
        self.watch.as_ref()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.last_position
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the persisted state (or the options layout of the
    /// configuration) and resume watching if an anchor is set.
    pub fn start<H: AnchorHost>(
        &mut self,
        host: &mut H,
        persisted: Option<AnchorState>,
        now_ms: u64,
    ) {
        self.state = match persisted {
            Some(state) => state.normalized(),
            None => AnchorState::from_config(&self.config),
        };
        self.session.reset();
        self.watch = None;
        self.track.clear();
        self.observe(host);

        if self.state.is_watchable() {
            if let (Some(p), Some(r)) = (self.state.position, self.state.radius) {
                info!(
                    "Resuming anchor watch at {:.6},{:.6} radius {:.1}m",
                    p.latitude, p.longitude, r
                );
            }
            self.start_watching(now_ms);
            self.emit_geometry(host);
        } else {
            debug!("No anchor set, not watching");
        }
    }

    /// Clear alarms and stop all timers. The anchor state is left alone so
    /// the next start resumes it.
    pub fn stop<H: AnchorHost>(&mut self, host: &mut H) {
        self.clear_alarms(host);
        self.stop_watching();
        self.session.incomplete_setup.cancel();
        host.handle_message(GeometryUpdate::cleared());
        debug!("Anchor engine stopped");
    }

    // =========================================================================
    // Setup operations
    // =========================================================================

    /// Drop the anchor at the bow, optionally with a radius.
    pub fn drop_anchor<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        radius: Option<f64>,
    ) -> Result<(), AnchorError> {
        let radius = radius.map(|r| require_positive("radius", r)).transpose()?;
        self.observe(host);
        let vessel = self.last_position.ok_or_else(AnchorError::no_position)?;

        let bow = BowProjector::new(host.gps_from_bow()).project(&vessel, self.last_heading);
        let depth = usable_depth(host.depth_below_surface());
        let anchor = bow.horizontal().with_altitude(depth.map(|d| -d));

        info!(
            "Anchor dropped at {:.6},{:.6} depth {:?} radius {:?}",
            anchor.latitude, anchor.longitude, depth, radius
        );
        self.state = AnchorState {
            active: true,
            position: Some(anchor),
            radius,
            rode_length: None,
        };
        self.track.clear();
        self.clear_alarms(host);
        if radius.is_some() {
            self.session.incomplete_setup.cancel();
        } else {
            self.session
                .incomplete_setup
                .arm(self.config.incomplete_anchor_alarm_time, now_ms);
        }
        self.restart_watching(now_ms);
        self.emit_geometry(host);
        self.persist(host)
    }

    /// Raise the anchor. Safe to call when no anchor is set.
    pub fn raise_anchor<H: AnchorHost>(&mut self, host: &mut H) -> Result<(), AnchorError> {
        info!("Anchor raised");
        self.state.clear();
        self.stop_watching();
        self.session.incomplete_setup.cancel();
        self.clear_alarms(host);
        self.track.clear();
        host.handle_message(GeometryUpdate::cleared());
        self.persist(host)
    }

    /// Set the alarm radius, or derive it from the current distance to the
    /// anchor plus the fudge factor.
    pub fn set_radius<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        radius: Option<f64>,
    ) -> Result<(), AnchorError> {
        let radius = radius.map(|r| require_positive("radius", r)).transpose()?;
        let anchor = self
            .state
            .anchor_position()
            .ok_or_else(AnchorError::not_dropped)?;
        self.observe(host);

        let radius = match radius {
            Some(r) => r,
            None => {
                let vessel = self.last_position.ok_or_else(AnchorError::no_position)?;
                distance(&anchor, &vessel) + self.config.fudge_m()
            }
        };
        let rode_length = self
            .rode_from_geometry(host, &anchor)
            .or(self.state.rode_length);

        info!("Anchor radius set to {:.1}m", radius);
        self.state.radius = Some(radius);
        self.state.rode_length = rode_length;
        self.complete_setup(host);
        self.start_watching(now_ms);
        self.emit_geometry(host);
        self.persist(host)
    }

    /// Set the rode length; the radius follows from depth and bow height.
    pub fn set_rode_length<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        length: f64,
        depth: Option<f64>,
    ) -> Result<(), AnchorError> {
        let length = require_positive("rodeLength", length)?;
        let depth_arg = usable_depth(validate_depth(depth)?);
        let anchor = self
            .state
            .anchor_position()
            .ok_or_else(AnchorError::not_dropped)?;
        self.observe(host);

        let depth = depth_arg
            .or_else(|| usable_depth(host.depth_below_surface()))
            .or_else(|| self.state.anchor_depth());
        let swing = swing_radius(length, depth, self.config.bow_height_m());
        let radius =
            swing + BowProjector::new(host.gps_from_bow()).offset() + self.config.fudge_m();

        info!(
            "Rode length {:.1}m in {:?}m gives radius {:.1}m",
            length, depth, radius
        );
        self.state.radius = Some(radius);
        self.state.rode_length = Some(length);
        if let Some(d) = depth_arg {
            self.state.position = Some(anchor.with_altitude(Some(-d)));
        }
        self.complete_setup(host);
        self.start_watching(now_ms);
        self.emit_geometry(host);
        self.persist(host)
    }

    /// Move the anchor without touching the radius.
    pub fn set_anchor_position<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        position: Coordinate,
        depth: Option<f64>,
    ) -> Result<(), AnchorError> {
        validate_position(&position)?;
        let depth = validate_depth(depth)?;
        self.observe(host);

        let altitude = match depth {
            Some(d) => Some(-d),
            None => self
                .state
                .position
                .and_then(|p| p.altitude)
                .or(position.altitude),
        };
        let anchor = position.horizontal().with_altitude(altitude);

        info!(
            "Anchor position set to {:.6},{:.6}",
            anchor.latitude, anchor.longitude
        );
        self.state.position = Some(anchor);
        if self.state.is_watchable() {
            self.start_watching(now_ms);
        }
        self.emit_geometry(host);
        self.persist(host)
    }

    /// Place the anchor from rode length and depth when it was dropped
    /// without the alarm running: the anchor is put straight ahead of the
    /// bow at the swing radius.
    pub fn set_manual_anchor<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        depth: Option<f64>,
        rode_length: f64,
    ) -> Result<(), AnchorError> {
        let rode_length = require_positive("rodeLength", rode_length)?;
        let depth_arg = usable_depth(validate_depth(depth)?);
        self.observe(host);

        let vessel = self.last_position.ok_or_else(AnchorError::no_position)?;
        let heading = self
            .last_heading
            .or_else(|| host.heading_magnetic().filter(|h| h.is_finite()))
            .ok_or_else(AnchorError::no_heading)?;
        let depth = depth_arg
            .or_else(|| usable_depth(host.depth_below_surface()))
            .ok_or_else(AnchorError::no_depth)?;

        let projector = BowProjector::new(host.gps_from_bow());
        let swing = swing_radius(rode_length, Some(depth), self.config.bow_height_m());
        let bow = projector.project(&vessel, Some(heading));
        let anchor = destination_point(&bow, heading, swing).with_altitude(Some(-depth));
        let radius = swing + projector.offset() + self.config.fudge_m();

        info!(
            "Manual anchor at {:.6},{:.6}: rode {:.1}m depth {:.1}m radius {:.1}m",
            anchor.latitude, anchor.longitude, rode_length, depth, radius
        );
        self.state = AnchorState {
            active: true,
            position: Some(anchor),
            radius: Some(radius),
            rode_length: Some(rode_length),
        };
        self.track.clear();
        self.clear_alarms(host);
        self.session.incomplete_setup.cancel();
        self.restart_watching(now_ms);
        self.emit_geometry(host);
        self.persist(host)
    }

    /// PUT handler for `navigation.anchor`: `None` raises the anchor,
    /// a value sets position and radius.
    pub fn put_anchor<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        value: Option<AnchorPut>,
    ) -> Result<(), AnchorError> {
        let put = match value {
            Some(put) => put,
            None => return self.raise_anchor(host),
        };
        validate_position(&put.position)?;
        let radius = require_positive("radius", put.radius)?;
        self.observe(host);

        info!(
            "Anchor set to {:.6},{:.6} radius {:.1}m",
            put.position.latitude, put.position.longitude, radius
        );
        self.state = AnchorState {
            active: true,
            position: Some(put.position),
            radius: Some(radius),
            rode_length: None,
        };
        self.complete_setup(host);
        self.start_watching(now_ms);
        self.emit_geometry(host);
        self.persist(host)
    }

    // =========================================================================
    // Feed and timers
    // =========================================================================

    /// Process a sample of the position / heading feed.
    pub fn on_sample<H: AnchorHost>(
        &mut self,
        host: &mut H,
        now_ms: u64,
        position: Option<Coordinate>,
        heading: Option<f64>,
    ) {
        let position = position.filter(|p| p.is_valid());
        let heading = heading.filter(|h| h.is_finite());
        if heading.is_some() {
            self.last_heading = heading;
        }
        if let Some(p) = position {
            self.last_position = Some(p);
            self.session.no_position.sample(now_ms);
        }

        if !self.is_watching() {
            return;
        }
        let anchor = match self.state.anchor_position() {
            Some(a) => a,
            None => return,
        };

        let vessel = match position {
            Some(v) => v,
            None => {
                if heading.is_some() && self.last_position.is_some() {
                    self.emit_geometry(host);
                }
                return;
            }
        };

        let meters = distance(&anchor, &vessel);
        let evaluator = AlarmEvaluator::from_config(&self.config, self.state.radius);
        let zone = evaluator.evaluate(&mut self.session, meters, now_ms);
        debug!(
            "distance: {:.1}m, radius: {:?}, zone: {:?}",
            meters, self.state.radius, zone
        );

        self.track.add(now_ms, &vessel);
        self.emit_geometry(host);

        let state = zone.notification_state(evaluator.severity);
        if let Some(transition) = self
            .session
            .anchor
            .update(zone, state, &drift_message(state))
        {
            match zone {
                ZoneState::Normal => info!("Anchor alarm cleared at {:.1}m", meters),
                _ => warn!(
                    "Anchor alarm {:?}: {:.1}m from anchor, radius {:?}",
                    state, meters, self.state.radius
                ),
            }
            self.notify(host, paths::ANCHOR_NOTIFICATION, transition);
        }
        self.session.no_position.clear_latch();
    }

    /// Drive the watchdogs. Call at least once a second.
    pub fn poll<H: AnchorHost>(&mut self, host: &mut H, now_ms: u64) {
        if self.is_watching() && self.session.no_position.poll(now_ms) {
            warn!(
                "No position for {}s",
                self.config.no_position_alarm_time
            );
            let state: NotificationState = self.config.state.into();
            if let Some(transition) =
                self.session
                    .anchor
                    .update(ZoneState::Breach, state, NO_POSITION_MESSAGE)
            {
                self.notify(host, paths::ANCHOR_NOTIFICATION, transition);
            }
        }

        if self.session.incomplete_setup.poll(now_ms) {
            warn!(
                "Anchor down for {} minutes without radius or rode length",
                self.config.incomplete_anchor_alarm_time
            );
            if let Some(transition) = self.session.setup.update(
                ZoneState::Breach,
                NotificationState::Alarm,
                INCOMPLETE_SETUP_MESSAGE,
            ) {
                self.notify(host, paths::SETUP_NOTIFICATION, transition);
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Pick up the host's current position and heading
    fn observe<H: AnchorHost>(&mut self, host: &H) {
        if let Some(p) = host.position().filter(|p| p.is_valid()) {
            self.last_position = Some(p);
        }
        if let Some(h) = host.heading_true().filter(|h| h.is_finite()) {
            self.last_heading = Some(h);
        }
    }

    fn start_watching(&mut self, now_ms: u64) {
        if self.watch.is_some() {
            return;
        }
        self.next_watch_id += 1;
        debug!("Watching position (watch {})", self.next_watch_id);
        self.watch = Some(PositionWatch {
            id: self.next_watch_id,
            since_ms: now_ms,
        });
        self.session
            .no_position
            .arm(self.config.no_position_alarm_time, now_ms);
    }

    fn stop_watching(&mut self) {
        if let Some(watch) = self.watch.take() {
            debug!("Stopped watching position (watch {})", watch.id);
        }
        self.session.no_position.cancel();
        self.session.delay_start_ms = None;
    }

    fn restart_watching(&mut self, now_ms: u64) {
        self.stop_watching();
        self.start_watching(now_ms);
    }

    /// Radius or rode is known now: disarm the incomplete setup watchdog
    /// and clear its alarm
    fn complete_setup<H: AnchorHost>(&mut self, host: &mut H) {
        if self.session.incomplete_setup.cancel() {
            debug!("Anchor setup completed after the incomplete setup alarm");
        }
        if let Some(transition) = self.session.setup.clear(SETUP_COMPLETE_MESSAGE) {
            self.notify(host, paths::SETUP_NOTIFICATION, transition);
        }
    }

    fn clear_alarms<H: AnchorHost>(&mut self, host: &mut H) {
        if let Some(transition) = self
            .session
            .anchor
            .clear(&drift_message(NotificationState::Normal))
        {
            self.notify(host, paths::ANCHOR_NOTIFICATION, transition);
        }
        if let Some(transition) = self.session.setup.clear(SETUP_COMPLETE_MESSAGE) {
            self.notify(host, paths::SETUP_NOTIFICATION, transition);
        }
        self.session.no_position.clear_latch();
        self.session.delay_start_ms = None;
    }

    /// Rode from the bow to the anchor, when the depth is known
    fn rode_from_geometry<H: AnchorHost>(&self, host: &H, anchor: &Coordinate) -> Option<f64> {
        let vessel = self.last_position?;
        let depth = self
            .state
            .anchor_depth()
            .or_else(|| usable_depth(host.depth_below_surface()))?;
        let bow = BowProjector::new(host.gps_from_bow()).project(&vessel, self.last_heading);
        let horizontal = distance(anchor, &bow);
        let height = depth + self.config.bow_height_m();
        Some((horizontal * horizontal + height * height).sqrt())
    }

    fn geometry<H: AnchorHost>(&self, host: &H) -> GeometryUpdate {
        let anchor = match self.state.position {
            Some(p) => p,
            None => return GeometryUpdate::default(),
        };
        let vessel = self.last_position;
        let projector = BowProjector::new(host.gps_from_bow());
        let bow = vessel.map(|v| projector.project(&v, self.last_heading));
        let bearing_true = bow.map(|b| rhumb_bearing(&b, &anchor));
        let evaluator = AlarmEvaluator::from_config(&self.config, self.state.radius);

        GeometryUpdate {
            position: Some(anchor),
            current_radius: vessel.map(|v| distance(&anchor, &v)),
            max_radius: self.state.radius,
            rode_length: self.state.rode_length,
            distance_from_bow: bow.map(|b| distance(&anchor, &b)),
            bearing_true,
            apparent_bearing: bearing_true
                .zip(self.last_heading)
                .map(|(b, h)| relative_bearing(b, h)),
            fudge_factor: Some(self.config.fudge),
            bow_height: Some(self.config.bow_height),
            zones: self.state.radius.map(|r| {
                zone_table(
                    r,
                    evaluator.warning_threshold(),
                    evaluator.warning_notification,
                    evaluator.severity,
                )
            }),
        }
    }

    fn emit_geometry<H: AnchorHost>(&self, host: &mut H) {
        let delta = self.geometry(host).to_delta();
        host.handle_message(delta);
    }

    fn notify<H: AnchorHost>(&self, host: &mut H, path: &str, transition: Transition) {
        let method = host
            .anchor_notification()
            .map(|n| n.method)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_METHODS.iter().map(|m| m.to_string()).collect());
        let notification = Notification {
            state: transition.state,
            method,
            message: transition.message,
        };
        host.handle_message(notification_delta(path, &notification));
    }

    fn persist<H: AnchorHost>(&self, host: &mut H) -> Result<(), AnchorError> {
        host.save_state(&self.state).map_err(|e| {
            error!("Unable to save anchor state: {}", e);
            AnchorError::PersistenceFailed(e)
        })
    }
}
