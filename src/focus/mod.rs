//! Autofocus scheduling.
//!
//! Cameras without a continuous focus mode are kept sharp by asking for
//! a single focus cycle over and over. This module owns that cadence;
//! the focus operation itself is the camera driver's business.

mod scheduler;
mod timer;

pub use scheduler::{AutoFocusScheduler, AutoFocusState, DEFAULT_FOCUS_INTERVAL};
pub use timer::{ManualScheduler, Scheduler, Task, TimerTask, TokioScheduler};
