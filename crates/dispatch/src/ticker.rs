//! Host update-tick loop.
//!
//! Emulates the host runtime's update event stream: a dedicated OS thread
//! invokes the tick callback at a fixed cadence. The callback is the single
//! privileged "main thread": the dispatcher drain and cinematic advance
//! both run inside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::info;

/// Default tick cadence (matches the host's ~60 Hz update stream).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Handle to the running update-tick thread.
pub struct HostTicker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HostTicker {
    /// Start the tick thread. `on_tick` receives the tick's `Instant` and
    /// runs exclusively on the spawned (main) thread.
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = running.clone();
        let handle = std::thread::Builder::new()
            .name("host-update-tick".into())
            .spawn(move || {
                while running_flag.load(Ordering::SeqCst) {
                    on_tick(Instant::now());
                    std::thread::sleep(interval);
                }
            })
            .expect("spawning the update-tick thread cannot fail");
        info!(interval_ms = interval.as_millis() as u64, "Host update tick started");
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the tick thread and join it. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("Host update tick stopped");
        }
    }
}

impl Drop for HostTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
