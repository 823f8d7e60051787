//! Service lifecycle: startup, the recurring timer and stop requests
//!
//! Passes never overlap. `run` drives every tick from the calling thread and
//! only sleeps between passes, so that loop is what serializes them. Stop
//! requests arrive from other threads through `StopHandle` and are only seen
//! between passes. `tick` also takes a try-lock on the pass guard, so a tick
//! issued while a pass holds it is skipped, not queued.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, TryLockError};
use std::time::Duration;
use log::{error, info, warn};
use crate::pipeline::orchestrator::{Orchestrator, PassReport};
use crate::Result;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cloneable handle that ends the service's sleeping interval. A pass that
/// is running when `stop` is called completes first.
#[derive(Clone)]
pub struct StopHandle {
    sender: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        // receiver already gone means the service has finished
        let _ = self.sender.send(());
    }
}

pub struct Service {
    orchestrator: Orchestrator,
    interval: Duration,
    pass_guard: Mutex<()>,
    stop_rx: Receiver<()>,
    stop_tx: Sender<()>,
}

impl Service {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let interval = Duration::from_secs(orchestrator.settings().poll_interval);
        let (stop_tx, stop_rx) = mpsc::channel();
        Self {
            orchestrator,
            interval,
            pass_guard: Mutex::new(()),
            stop_rx,
            stop_tx,
        }
    }

    /// Replaces the polling interval taken from the settings.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            sender: self.stop_tx.clone(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Logs the configuration and creates missing directories. An error here
    /// is fatal: no pass gets scheduled.
    pub fn on_start(&self) -> Result<()> {
        let settings = self.orchestrator.settings();
        info!("");
        info!(" -- track-courier started -- v{}", VERSION);
        info!("Base Path: {}", settings.base_path.display());
        info!("Local Path: {}", settings.local_path.display());
        info!("Poll Interval: {} seconds", self.interval.as_secs());
        info!(
            "Network Share: {}",
            if settings.include_share { "Enabled" } else { "Disabled" }
        );
        if let Some(network) = settings.share_root() {
            info!("Network Path: {}", network.display());
        }

        self.orchestrator.prepare().map_err(|e| {
            error!("Startup failed, cannot create required directories: {}", e);
            e
        })
    }

    pub fn on_stop(&self) {
        info!("track-courier stopping...");
    }

    /// Runs one pass unless another is still in flight.
    pub fn tick(&self) -> Option<PassReport> {
        let _guard = match self.pass_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("Previous pass still running, skipping this tick");
                return None;
            }
            // a panicked pass left nothing half-shared behind
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Some(self.orchestrator.run_pass())
    }

    /// Startup, an initial pass, then one pass per interval until stopped.
    pub fn run(&self) -> Result<()> {
        self.on_start()?;
        self.tick();

        loop {
            match self.stop_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {
                    info!("");
                    info!("Polling for new files...");
                    self.tick();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.on_stop();
        Ok(())
    }

    /// Startup followed by exactly one pass.
    pub fn run_once(&self) -> Result<PassReport> {
        self.on_start()?;
        Ok(self.tick().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use crate::config::Settings;

    fn service(dir: &TempDir) -> Service {
        let settings = Settings {
            base_path: dir.path().join("in"),
            local_path: dir.path().join("out"),
            poll_interval: 3600,
            file_stability_wait: 0,
            ..Settings::default()
        };
        Service::new(Orchestrator::from_settings(settings))
    }

    #[test]
    fn test_tick_skipped_while_pass_running() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let _running = service.pass_guard.lock().unwrap();
        assert!(service.tick().is_none());
    }

    #[test]
    fn test_stop_ends_sleeping_interval() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        service.stop_handle().stop();

        // returns instead of sleeping for an hour
        service.run().unwrap();
        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("in").join("copiedList.txt").exists());
    }

    #[test]
    fn test_startup_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let settings = Settings {
            base_path: blocker.join("in"),
            local_path: dir.path().join("out"),
            poll_interval: 1,
            ..Settings::default()
        };
        let service = Service::new(Orchestrator::from_settings(settings));

        assert!(service.run_once().is_err());
    }
}
