//! Preview QR Scanner CLI
//!
//! Command-line demonstration of the scanning pipeline. A mock camera is
//! fed blank preview frames followed by the luminance of an image file,
//! and every decoded code is printed as it arrives.

use chrono::Local;
use clap::Parser;
use preview_qr::{
    capture::{CaptureManager, ConfigError, FileConfig, MockCamera, Resolution},
    focus::TokioScheduler,
    geometry::{ConfigOrientation, DisplaySurface, FixedSurface, Rotation, FALLBACK_RESOLUTION},
    metrics::ScanMetrics,
    QrScanner,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "preview-qr")]
#[command(about = "Scan a simulated camera preview for QR codes")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image shown to the camera after the blank frames
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Frames to feed before exiting
    #[arg(long)]
    frames: Option<u32>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Leading frames without a code in view
    #[arg(long)]
    blank_frames: Option<u32>,

    /// Keep feeding frames until Ctrl-C
    #[arg(long)]
    continuous: bool,

    /// Serve Prometheus metrics on this port (needs the `metrics` feature)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Preview QR Scanner v{}", preview_qr::VERSION);
    info!("This is a demonstration using mock camera input");

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(frames) = args.frames {
        config.demo.frames = frames;
    }
    if let Some(fps) = args.fps {
        config.demo.fps = fps;
    }
    if let Some(blank_frames) = args.blank_frames {
        config.demo.blank_frames = blank_frames;
    }
    if let Some(port) = args.metrics_port {
        config.demo.metrics_port = port;
    }
    if config.demo.fps == 0 || config.demo.fps > 120 {
        return Err(ConfigError::InvalidFrameRate.into());
    }

    let code_frame = match &args.image {
        Some(path) => Some(load_nv21(path)?),
        None => None,
    };
    let size = code_frame
        .as_ref()
        .map_or(FALLBACK_RESOLUTION, |(size, _)| *size);
    info!(%size, image = ?args.image, "Preview configured");

    let metrics = ScanMetrics::new()?;
    serve_metrics(config.demo.metrics_port, &metrics);

    let camera = MockCamera::with_supported_sizes(vec![size]);
    let scheduler = TokioScheduler::current().ok_or("no tokio runtime")?;
    let capture = CaptureManager::with_metrics(
        Arc::new(camera.clone()),
        Arc::new(scheduler),
        config.capture.clone(),
        Some(metrics.clone()),
    );

    let surface: Arc<dyn DisplaySurface> = Arc::new(FixedSurface::new(
        size,
        Rotation::Deg90,
        ConfigOrientation::Landscape,
    ));
    capture.bind_display_surface(Some(&surface))?;

    let scanner = QrScanner::new(capture).with_metrics(metrics.clone());
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    scanner.set_on_code_received(Some(Arc::new(move |code: &str| {
        counter.fetch_add(1, Ordering::Relaxed);
        println!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), code);
    })));

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    scanner.set_scanning(true)?;
    info!(
        fps = config.demo.fps,
        continuous = args.continuous,
        "Feeding frames..."
    );

    let blank = blank_nv21(size);
    let mut ticker = tokio::time::interval(Duration::from_secs(1) / config.demo.fps);
    let mut fed = 0u32;
    while running.load(Ordering::SeqCst) && (args.continuous || fed < config.demo.frames) {
        ticker.tick().await;
        let data = match &code_frame {
            Some((_, data)) if fed >= config.demo.blank_frames => data,
            _ => &blank,
        };
        if !camera.emit_frame(data) {
            warn!(frame = fed, "Frame not delivered");
        }
        // The mock lens focuses instantly
        camera.complete_focus(true);
        fed = fed.saturating_add(1);
    }

    scanner.set_scanning(false)?;

    info!(
        "Processed {} frames: {} decoded, {} not found, {} codes reported",
        fed,
        metrics.outcome_count("decoded"),
        metrics.outcome_count("not_found"),
        received.load(Ordering::Relaxed)
    );
    Ok(())
}

/// Loads an image as an NV21 frame with neutral chroma.
fn load_nv21(path: &Path) -> Result<(Resolution, Vec<u8>), image::ImageError> {
    let luma = image::open(path)?.to_luma8();
    let (width, height) = luma.dimensions();
    let mut data = luma.into_raw();
    let pixels = data.len();
    data.resize(pixels + pixels / 2, 128);
    Ok((Resolution::new(width, height), data))
}

fn blank_nv21(size: Resolution) -> Vec<u8> {
    let pixels = size.pixel_count();
    let mut data = vec![235u8; pixels];
    data.resize(pixels + pixels / 2, 128);
    data
}

#[cfg(feature = "metrics")]
fn serve_metrics(port: u16, metrics: &ScanMetrics) {
    use preview_qr::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), metrics.clone());
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!(error = %e, "Metrics server stopped");
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(port: u16, _metrics: &ScanMetrics) {
    if port != 0 {
        warn!(port, "Built without the `metrics` feature, not serving metrics");
    }
}
