//! In-memory camera for tests and demos.
//!
//! `MockCamera` behaves like a single physical camera: it hands out one
//! handle at a time, records every lifecycle call, and lets the caller
//! push frames and complete focus cycles by hand.

use super::camera::{
    CameraDevice, CameraError, CameraHandle, CameraParameters, FocusCallback, FrameCallback,
};
use super::{PixelFormat, Resolution};
use crate::geometry::DisplaySurface;
use parking_lot::Mutex;
use std::sync::Arc;

/// Counters and flags observed by a [`MockCamera`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Successful `open` calls.
    pub opens: u64,
    /// `release` calls on live handles.
    pub releases: u64,
    /// Handles currently open.
    pub live_handles: u64,
    /// Whether frames are flowing.
    pub previewing: bool,
    /// Whether a frame callback is installed.
    pub frame_callback_installed: bool,
    /// Preview start requests.
    pub preview_starts: u64,
    /// Preview stop requests.
    pub preview_stops: u64,
    /// Focus cycles requested.
    pub focus_requests: u64,
    /// Successful display target attachments.
    pub display_binds: u64,
    /// Last display orientation applied.
    pub display_orientation: Option<u32>,
    /// Frames delivered to an installed callback.
    pub frames_delivered: u64,
}

struct MockState {
    stats: MockStats,
    params: CameraParameters,
    callback: Option<FrameCallback>,
    pending_focus: Vec<FocusCallback>,
    current_handle: Option<u64>,
    next_handle: u64,
    sequence: u64,
    fail_open: bool,
    fail_focus: bool,
    fail_display: bool,
    parameters_available: bool,
}

/// Mock camera that records driver calls.
#[derive(Clone)]
pub struct MockCamera {
    state: Arc<Mutex<MockState>>,
}

impl MockCamera {
    /// Creates a mock delivering NV21 frames at 640x480.
    pub fn new() -> Self {
        Self::with_supported_sizes(vec![
            Resolution::new(640, 480),
            Resolution::new(320, 240),
            Resolution::new(1280, 720),
        ])
    }

    /// Creates a mock with the given supported preview sizes.
    ///
    /// The initial preview size is the first supported size, or 640x480
    /// if the list is empty.
    pub fn with_supported_sizes(sizes: Vec<Resolution>) -> Self {
        let preview_size = sizes
            .first()
            .copied()
            .unwrap_or(Resolution::new(640, 480));
        let state = MockState {
            stats: MockStats::default(),
            params: CameraParameters {
                preview_format: PixelFormat::Nv21,
                preview_size,
                supported_preview_sizes: sizes,
            },
            callback: None,
            pending_focus: Vec::new(),
            current_handle: None,
            next_handle: 1,
            sequence: 0,
            fail_open: false,
            fail_focus: false,
            fail_display: false,
            parameters_available: true,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Sets the preview format reported to callers.
    pub fn set_preview_format(&self, format: PixelFormat) {
        self.state.lock().params.preview_format = format;
    }

    /// Sets the preview size reported to callers.
    pub fn set_preview_size(&self, size: Resolution) {
        self.state.lock().params.preview_size = size;
    }

    /// Makes `open` fail while set.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Makes `auto_focus` fail while set.
    pub fn set_fail_focus(&self, fail: bool) {
        self.state.lock().fail_focus = fail;
    }

    /// Makes `set_display_target` fail while set.
    pub fn set_fail_display(&self, fail: bool) {
        self.state.lock().fail_display = fail;
    }

    /// Makes `parameters` return `None` while unset.
    pub fn set_parameters_available(&self, available: bool) {
        self.state.lock().parameters_available = available;
    }

    /// Returns a snapshot of the recorded calls.
    pub fn stats(&self) -> MockStats {
        self.state.lock().stats.clone()
    }

    /// Returns the parameters as last applied.
    pub fn current_parameters(&self) -> CameraParameters {
        self.state.lock().params.clone()
    }

    /// Returns the installed frame callback, as the driver holds it.
    pub fn frame_callback(&self) -> Option<FrameCallback> {
        self.state.lock().callback.clone()
    }

    /// Number of focus cycles waiting for completion.
    pub fn pending_focus(&self) -> usize {
        self.state.lock().pending_focus.len()
    }

    /// Delivers one preview frame, as the driver would.
    ///
    /// Returns `false` if no frame was delivered because the camera is
    /// closed, not previewing, or has no callback installed.
    pub fn emit_frame(&self, data: &[u8]) -> bool {
        let callback = {
            let mut state = self.state.lock();
            if state.current_handle.is_none() || !state.stats.previewing {
                return false;
            }
            let Some(callback) = state.callback.clone() else {
                return false;
            };
            state.stats.frames_delivered += 1;
            callback
        };
        callback(data);
        true
    }

    /// Delivers a synthetic NV21 frame at the current preview size.
    pub fn emit_synthetic_frame(&self) -> bool {
        let (size, sequence) = {
            let mut state = self.state.lock();
            state.sequence += 1;
            (state.params.preview_size, state.sequence)
        };

        // Deterministic pattern, never a decodable code
        let luma = size.pixel_count();
        let mut data: Vec<u8> = (0..luma)
            .map(|i| ((i as u64 ^ sequence) % 256) as u8)
            .collect();
        data.resize(luma + luma / 2, 128);

        self.emit_frame(&data)
    }

    /// Completes every pending focus cycle with the given result.
    ///
    /// Returns the number of cycles completed.
    pub fn complete_focus(&self, success: bool) -> usize {
        let pending = std::mem::take(&mut self.state.lock().pending_focus);
        let count = pending.len();
        for on_complete in pending {
            on_complete(success);
        }
        count
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDevice for MockCamera {
    fn open(&self) -> Result<Arc<dyn CameraHandle>, CameraError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(CameraError::OpenFailed("mock camera unavailable".into()));
        }
        if state.current_handle.is_some() {
            return Err(CameraError::OpenFailed("camera already in use".into()));
        }
        let id = state.next_handle;
        state.next_handle += 1;
        state.current_handle = Some(id);
        state.stats.opens += 1;
        state.stats.live_handles += 1;
        tracing::info!(handle = id, "MockCamera opened");

        Ok(Arc::new(MockHandle {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    id: u64,
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Runs `f` only while this handle is the live one.
    fn with_live<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.current_handle != Some(self.id) {
            tracing::trace!(handle = self.id, "Ignoring call on released handle");
            return None;
        }
        Some(f(&mut state))
    }
}

impl CameraHandle for MockHandle {
    fn start_preview(&self) {
        self.with_live(|state| {
            state.stats.preview_starts += 1;
            state.stats.previewing = true;
        });
    }

    fn stop_preview(&self) {
        self.with_live(|state| {
            state.stats.preview_stops += 1;
            state.stats.previewing = false;
        });
    }

    fn release(&self) {
        self.with_live(|state| {
            state.current_handle = None;
            state.callback = None;
            state.pending_focus.clear();
            state.stats.previewing = false;
            state.stats.frame_callback_installed = false;
            state.stats.releases += 1;
            state.stats.live_handles -= 1;
            tracing::info!(handle = self.id, "MockCamera released");
        });
    }

    fn set_frame_callback(&self, callback: Option<FrameCallback>) {
        self.with_live(|state| {
            state.stats.frame_callback_installed = callback.is_some();
            state.callback = callback;
        });
    }

    fn parameters(&self) -> Option<CameraParameters> {
        self.with_live(|state| state.parameters_available.then(|| state.params.clone()))
            .flatten()
    }

    fn set_parameters(&self, params: &CameraParameters) {
        self.with_live(|state| state.params = params.clone());
    }

    fn set_display_target(&self, _surface: &dyn DisplaySurface) -> Result<(), CameraError> {
        self.with_live(|state| {
            if state.fail_display {
                return Err(CameraError::DisplayBindFailed("mock surface rejected".into()));
            }
            state.stats.display_binds += 1;
            Ok(())
        })
        .unwrap_or(Err(CameraError::NotInitialized))
    }

    fn auto_focus(&self, on_complete: FocusCallback) -> Result<(), CameraError> {
        self.with_live(|state| {
            state.stats.focus_requests += 1;
            if state.fail_focus {
                return Err(CameraError::FocusFailed("mock focus failure".into()));
            }
            state.pending_focus.push(on_complete);
            Ok(())
        })
        .unwrap_or(Err(CameraError::NotInitialized))
    }

    fn set_display_orientation(&self, degrees: u32) {
        self.with_live(|state| state.stats.display_orientation = Some(degrees));
    }
}
