// SPDX-License-Identifier: MIT

//! Background timer driving scheduled update checks

use crate::updater::Updater;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at, sleep};

#[derive(Debug, Default)]
pub struct UpdateScheduler {
    task: Option<JoinHandle<()>>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start checking: once after the startup delay, then every `checkInterval`.
    ///
    /// Does nothing when checks are disabled in the config or a timer is already
    /// running. Returns whether a timer was started.
    pub fn start(&mut self, updater: Arc<Updater>) -> bool {
        if self.is_running() {
            tracing::debug!("Update scheduler already running");
            return false;
        }

        let config = updater.config().load();
        if config.disable_update_check {
            tracing::info!("Update checks disabled, scheduler not started");
            return false;
        }

        let startup_delay = updater.options().startup_delay;
        let period = config.check_interval_duration();
        tracing::info!(?startup_delay, ?period, "Starting update scheduler");

        self.task = Some(tokio::spawn(async move {
            sleep(startup_delay).await;
            let outcome = updater.run_scheduled_check().await;
            tracing::debug!(?outcome, "Initial update check finished");

            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = updater.run_scheduled_check().await;
                tracing::debug!(?outcome, "Scheduled update check finished");
            }
        }));
        true
    }

    /// Cancel the timer. Safe to call when nothing is scheduled.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Update scheduler stopped");
        }
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
