//! Periodic feed of the anchor engine.
//!
//! Once per tick the fresh position and heading are handed to the engine and
//! its watchdogs are polled. On shutdown the engine is stopped so alarms and
//! timers are released.

use log::{debug, info};
use std::sync::PoisonError;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::{now_ms, App};

const MIN_TICK_MS: u64 = 100;

pub struct Monitor {
    app: App,
}

impl Monitor {
    pub fn new(app: App) -> Self {
        Monitor { app }
    }

    /// One pass: sample, then watchdogs
    pub fn tick(&self, now_ms: u64) {
        let (position, heading) = self
            .app
            .navdata
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take_sample();

        self.app.with_engine(|engine, host| {
            if position.is_some() || heading.is_some() {
                engine.on_sample(host, now_ms, position, heading);
            }
            engine.poll(host, now_ms);
        });
    }

    pub async fn run(self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        let period = Duration::from_millis(self.app.args.tick_ms.max(MIN_TICK_MS));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("Monitor running every {:?}", period);

        loop {
            tokio::select! { biased;
                _ = subsys.on_shutdown_requested() => {
                    break;
                },
                _ = interval.tick() => {
                    self.tick(now_ms());
                },
            }
        }

        info!("Monitor stopping");
        self.app.with_engine(|engine, host| engine.stop(host));
        Ok(())
    }
}
