//! Host abstraction for the anchor engine.
//!
//! The engine never touches the network, a clock or the filesystem. Whatever
//! runs it (the native server, a Signal K plugin shim, the unit tests)
//! implements [`AnchorHost`] and passes it into every engine call.
//!
//! # Example
//!
//! ```rust,ignore
//! use anchoralarm_core::{AnchorEngine, AnchorHost};
//!
//! fn tick<H: AnchorHost>(engine: &mut AnchorEngine, host: &mut H, now_ms: u64) {
//!     let position = host.position();
//!     let heading = host.heading_true();
//!     engine.on_sample(host, now_ms, position, heading);
//!     engine.poll(host, now_ms);
//! }
//! ```

use crate::alarm::Notification;
use crate::delta::Delta;
use crate::geo::Coordinate;
use crate::state::AnchorState;

/// Sensor queries, event sink and persistence for the engine.
///
/// Sensor queries return `None` when the reading is unavailable; that is a
/// normal condition and never an error.
pub trait AnchorHost {
    /// Current vessel (GPS antenna) position
    fn position(&self) -> Option<Coordinate>;

    /// True heading in radians
    fn heading_true(&self) -> Option<f64>;

    /// Magnetic heading in radians
    fn heading_magnetic(&self) -> Option<f64>;

    /// Depth below the surface in meters
    fn depth_below_surface(&self) -> Option<f64>;

    /// Distance from the GPS antenna back from the bow, meters
    fn gps_from_bow(&self) -> Option<f64>;

    /// Current value of the anchor notification, if one is set
    fn anchor_notification(&self) -> Option<Notification> {
        None
    }

    /// Publish a delta
    fn handle_message(&mut self, delta: Delta);

    /// Persist the anchor state
    fn save_state(&mut self, state: &AnchorState) -> Result<(), String>;
}
