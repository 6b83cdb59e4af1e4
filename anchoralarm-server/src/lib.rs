//! # Anchor Alarm Server
//!
//! Native host for [`anchoralarm_core`]: feeds the engine from Signal K
//! deltas, exposes the anchor setup actions over REST and keeps the anchor
//! state on disk.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  anchoralarm-server                     │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │ REST API    │  │ Delta ingest │  │ Monitor (tick) │  │
//! │  │ (axum)      │  │ (axum)       │  │ (tokio)        │  │
//! │  └──────┬──────┘  └──────┬───────┘  └───────┬────────┘  │
//! │         ▼                ▼                  ▼           │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ App                                                 ││
//! │  │  - AnchorEngine (Arc<Mutex>)                        ││
//! │  │  - NavData sensor cache (Arc<RwLock>)               ││
//! │  │  - Published values (Arc<RwLock>)                   ││
//! │  │  - StateFile                                        ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `POST /plugins/anchoralarm/dropAnchor` | Drop the anchor at the bow |
//! | `POST /plugins/anchoralarm/raiseAnchor` | Raise the anchor |
//! | `POST /plugins/anchoralarm/setRadius` | Set or derive the alarm radius |
//! | `POST /plugins/anchoralarm/setRodeLength` | Radius from rode length |
//! | `POST /plugins/anchoralarm/setAnchorPosition` | Move the anchor |
//! | `POST /plugins/anchoralarm/setManualAnchor` | Place the anchor from rode and depth |
//! | `GET /plugins/anchoralarm/state` | Anchor and alarm state |
//! | `GET /plugins/anchoralarm/track` | Swing track |
//! | `PUT /signalk/v1/api/vessels/self/navigation/anchor` | Signal K PUT action |
//! | `GET /signalk/v1/api/vessels/self/navigation/anchor` | Last published values |
//! | `POST /signalk/v1/delta` | Sensor feed |
//!
//! ## Example: Starting the Server
//!
//! ```rust,no_run
//! use clap::Parser;
//! use anchoralarm_server::{App, Cli};
//! use tokio_graceful_shutdown::Toplevel;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let args = Cli::parse_from(["anchoralarm-server", "-p", "3100"]);
//!
//!     Toplevel::new(|s| async move {
//!         let app = App::new(&s, args);
//!         // Start web server, etc.
//!     })
//!     .catch_signals()
//!     .handle_shutdown_requests(Duration::from_secs(5))
//!     .await
//!     .unwrap();
//! }
//! ```

use anchoralarm_core::{AnchorConfig, AnchorEngine};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};

pub mod config;
pub mod host;
pub mod monitor;
pub mod navdata;
pub mod storage;

use host::{Published, ServerHost};
use navdata::NavData;
use storage::StateFile;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 3100)]
    pub port: u16,

    /// Anchor alarm configuration (JSON, plugin options layout)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// File holding the anchor state between restarts
    #[arg(short, long)]
    pub state_file: Option<PathBuf>,

    /// Interval of the position feed and watchdog checks in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,
}

/// Milliseconds since the epoch
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Shared server state
#[derive(Clone)]
pub struct App {
    pub args: Cli,
    pub engine: Arc<Mutex<AnchorEngine>>,
    pub navdata: Arc<RwLock<NavData>>,
    pub published: Arc<RwLock<Published>>,
    pub storage: Arc<StateFile>,
}

impl App {
    /// Build the state without starting anything
    pub fn new_base(args: Cli, config: AnchorConfig, storage: StateFile) -> Self {
        App {
            args,
            engine: Arc::new(Mutex::new(AnchorEngine::new(config))),
            navdata: Arc::new(RwLock::new(NavData::new())),
            published: Arc::new(RwLock::new(Published::default())),
            storage: Arc::new(storage),
        }
    }

    /// Load configuration and state, start the engine and the monitor
    pub fn new(subsystem: &SubsystemHandle, args: Cli) -> Self {
        let anchor_config = config::load_config(args.config.as_deref());
        let state_path = args
            .state_file
            .clone()
            .unwrap_or_else(config::default_state_file);
        let storage = StateFile::new(state_path);
        let persisted = match storage.load() {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Ignoring anchor state file: {}", e);
                None
            }
        };

        let app = Self::new_base(args, anchor_config, storage);
        app.with_engine(|engine, host| engine.start(host, persisted, now_ms()));

        let monitor = monitor::Monitor::new(app.clone());
        subsystem.start(SubsystemBuilder::new("Monitor", |subsys| async move {
            monitor.run(subsys).await
        }));

        app
    }

    /// Run `f` with the engine locked and a host bound to the current
    /// sensor cache.
    ///
    /// Lock order is engine, then navdata, then published.
    pub fn with_engine<R>(
        &self,
        f: impl FnOnce(&mut AnchorEngine, &mut ServerHost<'_>) -> R,
    ) -> R {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let navdata = self.navdata.read().unwrap_or_else(PoisonError::into_inner);
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut host = ServerHost::new(&navdata, &mut published, &self.storage);
        f(&mut engine, &mut host)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "App {{ port: {} }}", self.args.port)
    }
}
