//! Continuous autofocus emulation.
//!
//! The camera is asked to focus once on start, then again a fixed delay
//! after each cycle completes. The delay runs from completion, so a slow
//! or failed cycle pushes later cycles back rather than piling up.

use super::timer::{Scheduler, TimerTask};
use crate::capture::CameraHandle;
use crate::metrics::ScanMetrics;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default delay between a completed focus cycle and the next one.
pub const DEFAULT_FOCUS_INTERVAL: Duration = Duration::from_millis(1000);

/// Whether the scheduler is cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoFocusState {
    /// No cycle pending or in flight.
    Stopped,
    /// Cycling until stopped.
    Running,
}

struct FocusState {
    state: AutoFocusState,
    /// Bumped on every start and stop so stale completions are ignored.
    epoch: u64,
    pending: Option<Box<dyn TimerTask>>,
}

struct FocusShared {
    camera: Arc<dyn CameraHandle>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    metrics: Option<ScanMetrics>,
    state: Mutex<FocusState>,
}

/// Re-triggers autofocus on a camera at a fixed cadence.
pub struct AutoFocusScheduler {
    shared: Arc<FocusShared>,
}

impl AutoFocusScheduler {
    /// Creates a stopped scheduler for a camera.
    pub fn new(
        camera: Arc<dyn CameraHandle>,
        scheduler: Arc<dyn Scheduler>,
        interval: Duration,
    ) -> Self {
        Self::with_metrics(camera, scheduler, interval, None)
    }

    /// Creates a stopped scheduler that records focus cycles.
    pub fn with_metrics(
        camera: Arc<dyn CameraHandle>,
        scheduler: Arc<dyn Scheduler>,
        interval: Duration,
        metrics: Option<ScanMetrics>,
    ) -> Self {
        Self {
            shared: Arc::new(FocusShared {
                camera,
                scheduler,
                interval,
                metrics,
                state: Mutex::new(FocusState {
                    state: AutoFocusState::Stopped,
                    epoch: 0,
                    pending: None,
                }),
            }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> AutoFocusState {
        self.shared.state.lock().state
    }

    /// Starts cycling and triggers the first focus immediately.
    ///
    /// No-op while already running.
    pub fn start(&self) {
        let epoch = {
            let mut state = self.shared.state.lock();
            if state.state == AutoFocusState::Running {
                return;
            }
            state.state = AutoFocusState::Running;
            state.epoch += 1;
            state.epoch
        };
        tracing::debug!("Starting auto-focus");
        FocusShared::trigger(&self.shared, epoch);
    }

    /// Stops cycling and cancels any pending re-arm.
    pub fn stop(&self) {
        let pending = {
            let mut state = self.shared.state.lock();
            if state.state == AutoFocusState::Stopped {
                return;
            }
            state.state = AutoFocusState::Stopped;
            state.epoch += 1;
            state.pending.take()
        };
        if let Some(task) = pending {
            task.cancel();
        }
        tracing::debug!("Stopped auto-focus");
    }
}

impl Drop for AutoFocusScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl FocusShared {
    fn is_current(&self, epoch: u64) -> bool {
        let state = self.state.lock();
        state.state == AutoFocusState::Running && state.epoch == epoch
    }

    fn trigger(shared: &Arc<Self>, epoch: u64) {
        if !shared.is_current(epoch) {
            return;
        }
        if let Some(metrics) = &shared.metrics {
            metrics.record_focus_cycle();
        }

        let weak = Arc::downgrade(shared);
        let on_complete = Box::new(move |success: bool| {
            if let Some(shared) = weak.upgrade() {
                tracing::trace!(success, "Auto-focus cycle complete");
                Self::rearm(&shared, epoch);
            }
        });

        if let Err(e) = shared.camera.auto_focus(on_complete) {
            tracing::debug!(error = %e, "Auto-focus failed, retrying");
            if let Some(metrics) = &shared.metrics {
                metrics.record_focus_failure();
            }
            Self::rearm(shared, epoch);
        }
    }

    fn rearm(shared: &Arc<Self>, epoch: u64) {
        let mut state = shared.state.lock();
        if state.state != AutoFocusState::Running || state.epoch != epoch {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(shared);
        let task = shared.scheduler.schedule(
            shared.interval,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.state.lock().pending = None;
                    Self::trigger(&shared, epoch);
                }
            }),
        );
        if let Some(previous) = state.pending.replace(task) {
            previous.cancel();
        }
    }
}
