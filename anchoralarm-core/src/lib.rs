//! # Anchor Alarm Core
//!
//! Platform-independent anchor drift monitoring for Signal K vessels.
//!
//! This crate contains the anchor watch logic with **zero I/O dependencies**:
//! no sockets, no filesystem, no clock, no async runtime. Time is passed in
//! as milliseconds, sensors are read and events published through the
//! [`AnchorHost`] trait.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  anchoralarm-core (no tokio/async deps)                     │
//! │  ├── geo/       (haversine, projection, rhumb bearing)      │
//! │  ├── bow/       (GPS to bow offset, rode geometry)          │
//! │  ├── alarm/     (evaluator, edge-triggered latch)           │
//! │  ├── watchdog/  (stale position, incomplete setup)          │
//! │  ├── track/     (swing track ring buffer)                   │
//! │  ├── delta/     (Signal K delta building)                   │
//! │  └── engine/    (AnchorEngine)                              │
//! └─────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴────────────┐
//!    │  anchoralarm-server     │
//!    │  (ServerHost)           │
//!    └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use anchoralarm_core::{AnchorConfig, AnchorEngine};
//!
//! let mut engine = AnchorEngine::new(AnchorConfig::default());
//! engine.start(&mut host, persisted_state, now_ms);
//! engine.drop_anchor(&mut host, now_ms, Some(40.0))?;
//!
//! // Every second
//! engine.on_sample(&mut host, now_ms, host.position(), host.heading_true());
//! engine.poll(&mut host, now_ms);
//! ```

pub mod alarm;
pub mod bow;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod geo;
pub mod host;
pub mod state;
pub mod track;
pub mod watchdog;

pub use alarm::{Notification, NotificationState, Severity, ZoneState};
pub use config::AnchorConfig;
pub use delta::{Delta, GeometryUpdate, PathValue};
pub use engine::{AnchorEngine, AnchorPut, PositionWatch};
pub use error::AnchorError;
pub use geo::Coordinate;
pub use host::AnchorHost;
pub use state::AnchorState;
pub use track::{SampleWindow, TrackPoint};
