//! Camera lifecycle orchestration.
//!
//! [`CaptureManager`] owns the single camera handle and sequences
//! acquisition, display attachment, autofocus, frame callback
//! registration, and release. Lifecycle calls may come from a control
//! thread while frames arrive on the driver's thread, so the handle
//! lives behind a lock and every user of it branches on its absence.
//!
//! Teardown clears the shared handle before touching the hardware. A
//! frame or focus callback that fires mid-teardown therefore sees "no
//! camera" and does nothing.
//!
//! Camera calls that may start frame flow are never made while the lock
//! is held, since a driver is free to deliver a frame synchronously.

use super::camera::{CameraDevice, CameraError, CameraHandle, FrameCallback};
use super::config::CaptureConfig;
use super::registry::{ProcessorRegistry, Transition};
use super::PreviewFrame;
use crate::focus::{AutoFocusScheduler, Scheduler};
use crate::geometry::{DisplaySurface, PreviewGeometryPlanner, SurfaceEvent};
use crate::metrics::ScanMetrics;
use crate::processing::FrameProcessor;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct LifecycleState {
    camera: Option<Arc<dyn CameraHandle>>,
    processors: ProcessorRegistry,
    surface: Option<Weak<dyn DisplaySurface>>,
    autofocus: Option<Arc<AutoFocusScheduler>>,
    geometry: Option<Arc<PreviewGeometryPlanner>>,
}

struct Shared {
    state: Mutex<LifecycleState>,
    metrics: Option<ScanMetrics>,
}

/// Starts, stops, and feeds the camera.
pub struct CaptureManager {
    device: Arc<dyn CameraDevice>,
    scheduler: Arc<dyn Scheduler>,
    config: CaptureConfig,
    shared: Arc<Shared>,
}

impl CaptureManager {
    /// Creates a manager for a camera device.
    ///
    /// `scheduler` drives the autofocus cadence.
    pub fn new(
        device: Arc<dyn CameraDevice>,
        scheduler: Arc<dyn Scheduler>,
        config: CaptureConfig,
    ) -> Self {
        Self::with_metrics(device, scheduler, config, None)
    }

    /// Creates a manager that records capture metrics.
    pub fn with_metrics(
        device: Arc<dyn CameraDevice>,
        scheduler: Arc<dyn Scheduler>,
        config: CaptureConfig,
        metrics: Option<ScanMetrics>,
    ) -> Self {
        Self {
            device,
            scheduler,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(LifecycleState::default()),
                metrics,
            }),
        }
    }

    /// Returns true while a camera handle is held.
    pub fn is_capturing(&self) -> bool {
        self.shared.state.lock().camera.is_some()
    }

    /// Number of registered frame processors.
    pub fn processor_count(&self) -> usize {
        self.shared.state.lock().processors.len()
    }

    /// Opens the camera if needed and starts frame flow.
    ///
    /// With a camera already open this only restarts frame flow. An open
    /// failure is returned as is; so is a failure to attach the bound
    /// display surface, after the camera has been released again.
    pub fn start_capture(&self) -> Result<(), CameraError> {
        let (camera, surface) = {
            let mut state = self.shared.state.lock();
            if let Some(camera) = state.camera.clone() {
                drop(state);
                camera.start_preview();
                return Ok(());
            }

            let camera = self.device.open().map_err(|e| {
                tracing::warn!(error = %e, "Failed to open camera");
                e
            })?;
            if let Some(metrics) = &self.shared.metrics {
                metrics.record_camera_open();
            }
            tracing::info!("Camera opened");

            state.camera = Some(Arc::clone(&camera));
            (camera, state.surface.clone())
        };

        if let Some(surface) = surface {
            if let Err(e) = self.link_geometry(&camera, surface) {
                tracing::warn!(error = %e, "Failed to attach display surface, releasing camera");
                self.stop_capture();
                return Err(e);
            }
        }

        self.start_autofocus(&camera);

        {
            let state = self.shared.state.lock();
            self.sync_frame_callback(&state);
        }

        camera.start_preview();
        Ok(())
    }

    /// Stops frame flow and releases the camera. No-op when closed.
    pub fn stop_capture(&self) {
        let (camera, autofocus, geometry) = {
            let mut state = self.shared.state.lock();
            let Some(camera) = state.camera.take() else {
                return;
            };
            (camera, state.autofocus.take(), state.geometry.take())
        };
        tracing::info!("Stopping camera");

        if let Some(autofocus) = autofocus {
            autofocus.stop();
        }
        if let Some(geometry) = geometry {
            geometry.uninstall();
        }
        camera.stop_preview();
        camera.set_frame_callback(None);
        camera.release();

        if let Some(metrics) = &self.shared.metrics {
            metrics.record_camera_release();
        }
    }

    /// Registers a processor to receive every frame.
    pub fn add_frame_processor(&self, processor: Arc<dyn FrameProcessor>) {
        let mut state = self.shared.state.lock();
        if state.processors.insert(processor) == Transition::Activated {
            self.sync_frame_callback(&state);
        }
    }

    /// Unregisters a processor.
    pub fn remove_frame_processor(&self, processor: &Arc<dyn FrameProcessor>) {
        let mut state = self.shared.state.lock();
        if state.processors.remove(processor) == Transition::Deactivated {
            self.sync_frame_callback(&state);
        }
    }

    /// Binds the surface that shows the preview, or unbinds with `None`.
    ///
    /// Only a weak reference is kept. Binding the surface that is
    /// already bound does nothing. With a camera open, the preview is
    /// moved to the new surface and its size renegotiated.
    pub fn bind_display_surface(
        &self,
        surface: Option<&Arc<dyn DisplaySurface>>,
    ) -> Result<(), CameraError> {
        let surface = surface.map(Arc::downgrade);
        let (camera, previous) = {
            let mut state = self.shared.state.lock();
            if same_surface(state.surface.as_ref(), surface.as_ref()) {
                return Ok(());
            }
            state.surface = surface.clone();
            (state.camera.clone(), state.geometry.take())
        };

        if let Some(previous) = previous {
            previous.uninstall();
        }
        match (camera, surface) {
            (Some(camera), Some(surface)) => self.link_geometry(&camera, surface),
            _ => Ok(()),
        }
    }

    /// Forwards a lifecycle event from the bound display surface.
    pub fn on_surface_event(&self, event: SurfaceEvent) -> Result<(), CameraError> {
        let geometry = self.shared.state.lock().geometry.clone();
        match geometry {
            Some(geometry) => geometry.handle_event(event),
            None => Ok(()),
        }
    }

    fn link_geometry(
        &self,
        camera: &Arc<dyn CameraHandle>,
        surface: Weak<dyn DisplaySurface>,
    ) -> Result<(), CameraError> {
        if surface.strong_count() == 0 {
            return Ok(());
        }
        let planner = Arc::new(PreviewGeometryPlanner::new(
            Arc::clone(camera),
            surface,
            self.config.fallback_resolution(),
        ));

        {
            let mut state = self.shared.state.lock();
            if !is_current(state.camera.as_ref(), camera) {
                return Ok(());
            }
            state.geometry = Some(Arc::clone(&planner));
        }

        if let Err(e) = planner.install() {
            let mut state = self.shared.state.lock();
            if state
                .geometry
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &planner))
            {
                state.geometry = None;
            }
            return Err(e);
        }
        Ok(())
    }

    fn start_autofocus(&self, camera: &Arc<dyn CameraHandle>) {
        let autofocus = Arc::new(AutoFocusScheduler::with_metrics(
            Arc::clone(camera),
            Arc::clone(&self.scheduler),
            self.config.focus_interval(),
            self.shared.metrics.clone(),
        ));

        {
            let mut state = self.shared.state.lock();
            if !is_current(state.camera.as_ref(), camera) {
                return;
            }
            state.autofocus = Some(Arc::clone(&autofocus));
        }
        autofocus.start();
    }

    /// Installs or clears the frame callback to match the registry.
    fn sync_frame_callback(&self, state: &LifecycleState) {
        let Some(camera) = &state.camera else {
            return;
        };
        if state.processors.is_empty() {
            tracing::debug!("No processors, unregistering preview callback");
            camera.set_frame_callback(None);
        } else {
            tracing::debug!("Registering preview callback");
            camera.set_frame_callback(Some(self.dispatch_callback()));
        }
    }

    fn dispatch_callback(&self) -> FrameCallback {
        let shared = Arc::downgrade(&self.shared);
        Arc::new(move |data: &[u8]| {
            if let Some(shared) = shared.upgrade() {
                shared.dispatch(data);
            }
        })
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

impl Shared {
    /// Fans one raw frame out to every registered processor.
    fn dispatch(&self, data: &[u8]) {
        let (camera, processors) = {
            let state = self.state.lock();
            let Some(camera) = state.camera.clone() else {
                return;
            };
            (camera, state.processors.snapshot())
        };

        let Some(params) = camera.parameters() else {
            tracing::trace!("No camera parameters, dropping frame");
            if let Some(metrics) = &self.metrics {
                metrics.record_frame_dropped();
            }
            return;
        };

        let frame = PreviewFrame::new(
            params.preview_size.width,
            params.preview_size.height,
            params.preview_format,
            data,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_frame_dispatched();
        }
        for processor in &processors {
            processor.on_frame(&frame);
        }
    }
}

fn same_surface(a: Option<&Weak<dyn DisplaySurface>>, b: Option<&Weak<dyn DisplaySurface>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Weak::ptr_eq(a, b),
        _ => false,
    }
}

fn is_current(held: Option<&Arc<dyn CameraHandle>>, camera: &Arc<dyn CameraHandle>) -> bool {
    held.is_some_and(|held| {
        std::ptr::eq(
            Arc::as_ptr(held) as *const (),
            Arc::as_ptr(camera) as *const (),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, PixelFormat, Resolution};
    use crate::focus::ManualScheduler;
    use crate::geometry::{ConfigOrientation, FixedSurface, Rotation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingProcessor {
        frames: AtomicUsize,
        last_size: Mutex<Option<(u32, u32, PixelFormat)>>,
    }

    impl FrameProcessor for CountingProcessor {
        fn on_frame(&self, frame: &PreviewFrame<'_>) {
            self.frames.fetch_add(1, Ordering::SeqCst);
            *self.last_size.lock() = Some((frame.width(), frame.height(), frame.format()));
        }
    }

    fn setup() -> (MockCamera, ManualScheduler, CaptureManager) {
        let mock = MockCamera::new();
        let clock = ManualScheduler::new();
        let manager = CaptureManager::new(
            Arc::new(mock.clone()),
            Arc::new(clock.clone()),
            CaptureConfig::default(),
        );
        (mock, clock, manager)
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mock, _clock, manager) = setup();
        manager.start_capture().unwrap();
        manager.start_capture().unwrap();

        let stats = mock.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.preview_starts, 2);
        assert_eq!(stats.focus_requests, 1);
        assert!(manager.is_capturing());
    }

    #[test]
    fn test_stop_releases_and_is_idempotent() {
        let (mock, clock, manager) = setup();
        manager.start_capture().unwrap();
        mock.complete_focus(true);
        assert_eq!(clock.pending(), 1);

        manager.stop_capture();
        manager.stop_capture();

        let stats = mock.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.live_handles, 0);
        assert_eq!(clock.pending(), 0, "focus re-arm cancelled");
        assert!(!manager.is_capturing());
    }

    #[test]
    fn test_callback_follows_registry_edges() {
        let (mock, _clock, manager) = setup();
        manager.start_capture().unwrap();
        assert!(!mock.stats().frame_callback_installed);

        let a: Arc<dyn FrameProcessor> = Arc::new(CountingProcessor::default());
        let b: Arc<dyn FrameProcessor> = Arc::new(CountingProcessor::default());
        manager.add_frame_processor(a.clone());
        assert!(mock.stats().frame_callback_installed);
        manager.add_frame_processor(b.clone());

        manager.remove_frame_processor(&a);
        assert!(mock.stats().frame_callback_installed);
        manager.remove_frame_processor(&b);
        assert!(!mock.stats().frame_callback_installed);
    }

    #[test]
    fn test_processors_registered_before_start_receive_frames() {
        let (mock, _clock, manager) = setup();
        let counter = Arc::new(CountingProcessor::default());
        manager.add_frame_processor(counter.clone());

        manager.start_capture().unwrap();
        assert!(mock.emit_synthetic_frame());
        assert!(mock.emit_synthetic_frame());

        assert_eq!(counter.frames.load(Ordering::SeqCst), 2);
        assert_eq!(
            *counter.last_size.lock(),
            Some((640, 480, PixelFormat::Nv21))
        );
    }

    #[test]
    fn test_frames_fan_out_to_all_processors() {
        let (mock, _clock, manager) = setup();
        let first = Arc::new(CountingProcessor::default());
        let second = Arc::new(CountingProcessor::default());
        manager.add_frame_processor(first.clone());
        manager.add_frame_processor(second.clone());
        manager.start_capture().unwrap();

        mock.emit_synthetic_frame();
        assert_eq!(first.frames.load(Ordering::SeqCst), 1);
        assert_eq!(second.frames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_flight_callback_after_stop_is_noop() {
        let (mock, _clock, manager) = setup();
        let counter = Arc::new(CountingProcessor::default());
        manager.add_frame_processor(counter.clone());
        manager.start_capture().unwrap();

        let callback = mock.frame_callback().unwrap();
        manager.stop_capture();

        callback(vec![0u8; 640 * 480 * 3 / 2].as_slice());
        assert_eq!(counter.frames.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_parameters_drop_frame() {
        let (mock, _clock, manager) = setup();
        let counter = Arc::new(CountingProcessor::default());
        manager.add_frame_processor(counter.clone());
        manager.start_capture().unwrap();

        mock.set_parameters_available(false);
        assert!(mock.emit_synthetic_frame());
        assert_eq!(counter.frames.load(Ordering::SeqCst), 0);
        assert!(manager.is_capturing());
    }

    #[test]
    fn test_open_failure_is_surfaced() {
        let (mock, _clock, manager) = setup();
        mock.set_fail_open(true);

        assert!(matches!(
            manager.start_capture(),
            Err(CameraError::OpenFailed(_))
        ));
        assert!(!manager.is_capturing());

        mock.set_fail_open(false);
        manager.start_capture().unwrap();
        assert_eq!(mock.stats().opens, 1);
    }

    #[test]
    fn test_bind_without_camera_only_records() {
        let (mock, _clock, manager) = setup();
        let surface: Arc<dyn DisplaySurface> = Arc::new(FixedSurface::new(
            Resolution::new(1280, 720),
            Rotation::Deg90,
            ConfigOrientation::Landscape,
        ));

        manager.bind_display_surface(Some(&surface)).unwrap();
        assert_eq!(mock.stats().display_binds, 0);

        manager.start_capture().unwrap();
        assert_eq!(mock.stats().display_binds, 1);
        assert_eq!(mock.current_parameters().preview_size, Resolution::new(1280, 720));
    }

    #[test]
    fn test_rebind_renegotiates_when_open() {
        let (mock, _clock, manager) = setup();
        manager.start_capture().unwrap();

        let landscape: Arc<dyn DisplaySurface> = Arc::new(FixedSurface::new(
            Resolution::new(1280, 720),
            Rotation::Deg90,
            ConfigOrientation::Landscape,
        ));
        manager.bind_display_surface(Some(&landscape)).unwrap();
        manager.bind_display_surface(Some(&landscape)).unwrap();
        assert_eq!(mock.stats().display_binds, 1, "same surface is not rebound");

        let portrait: Arc<dyn DisplaySurface> = Arc::new(FixedSurface::new(
            Resolution::new(720, 1280),
            Rotation::Deg0,
            ConfigOrientation::Portrait,
        ));
        manager.bind_display_surface(Some(&portrait)).unwrap();

        let stats = mock.stats();
        assert_eq!(stats.display_binds, 2);
        assert_eq!(stats.display_orientation, Some(90));
        // 640x480 is the best fit for 720x1280; natural rotation swaps it
        assert_eq!(mock.current_parameters().preview_size, Resolution::new(480, 640));
    }

    #[test]
    fn test_display_bind_failure_releases_camera() {
        let (mock, _clock, manager) = setup();
        let surface: Arc<dyn DisplaySurface> = Arc::new(FixedSurface::new(
            Resolution::new(640, 480),
            Rotation::Deg90,
            ConfigOrientation::Landscape,
        ));
        manager.bind_display_surface(Some(&surface)).unwrap();
        mock.set_fail_display(true);

        assert!(matches!(
            manager.start_capture(),
            Err(CameraError::DisplayBindFailed(_))
        ));
        let stats = mock.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.releases, 1);
        assert!(!manager.is_capturing());
    }

    #[test]
    fn test_surface_resize_renegotiates() {
        let (mock, _clock, manager) = setup();
        let fixed = Arc::new(FixedSurface::new(
            Resolution::new(640, 480),
            Rotation::Deg90,
            ConfigOrientation::Landscape,
        ));
        let surface: Arc<dyn DisplaySurface> = fixed.clone();
        manager.bind_display_surface(Some(&surface)).unwrap();
        manager.start_capture().unwrap();
        let stops = mock.stats().preview_stops;

        manager
            .on_surface_event(fixed.resize(Resolution::new(1920, 1080)))
            .unwrap();
        assert_eq!(mock.stats().preview_stops, stops + 1);
        assert_eq!(mock.current_parameters().preview_size, Resolution::new(1280, 720));

        manager.stop_capture();
        manager
            .on_surface_event(fixed.resize(Resolution::new(320, 240)))
            .unwrap();
        assert_eq!(mock.stats().preview_stops, stops + 2, "only the stop itself");
    }

    #[test]
    fn test_drop_releases_camera() {
        let (mock, clock, manager) = setup();
        manager.start_capture().unwrap();
        drop(manager);

        assert_eq!(mock.stats().live_handles, 0);
        clock.advance(Duration::from_secs(5));
        assert_eq!(mock.stats().focus_requests, 1);
    }
}
