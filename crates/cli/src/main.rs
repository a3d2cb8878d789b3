use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;

use facelens_core::analysis::detection_options::DetectionOptions;
use facelens_core::detection::domain::face_analyzer::FaceAnalyzer;
use facelens_core::detection::infrastructure::model_resolver;
use facelens_core::detection::infrastructure::onnx_face_analyzer::{ModelPaths, OnnxFaceAnalyzer};
use facelens_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use facelens_core::pipeline::live_analysis_use_case::{LiveAnalysisConfig, LiveAnalysisUseCase};
use facelens_core::pipeline::pass_sink::{PassOutput, PassSink};
use facelens_core::rendering::domain::result_renderer::ResultRenderer;
use facelens_core::rendering::infrastructure::overlay_painter::OverlayPainter;
use facelens_core::rendering::infrastructure::text_table_renderer::TextTableRenderer;
use facelens_core::shared::constants::{
    AGE_GENDER_MODEL_NAME, DEFAULT_POLL_INTERVAL_MS, DETECTOR_MODEL_NAME, EXPRESSION_MODEL_NAME,
    IMAGE_EXTENSIONS, LANDMARK_MODEL_NAME, MODEL_BASE_URL, MODEL_MIRROR_URL,
};
use facelens_core::video::domain::frame_source::FrameSource;
use facelens_core::video::domain::image_writer::ImageWriter;
use facelens_core::video::infrastructure::ffmpeg_camera_source::{
    CaptureConstraints, FfmpegCameraSource,
};
use facelens_core::video::infrastructure::image_file_source::ImageFileSource;
use facelens_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Face detection with optional landmarks, expressions, and age/gender.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Input image file (omit when using --camera).
    input: Option<PathBuf>,

    /// Capture device for live analysis (e.g. /dev/video0).
    #[arg(long, conflicts_with = "input")]
    camera: Option<String>,

    /// Skip bounding boxes and the confidence column.
    #[arg(long)]
    no_boxes: bool,

    /// Skip the 68-point landmark overlay (on by default).
    #[arg(long)]
    no_landmarks: bool,

    /// Classify each face's dominant expression.
    #[arg(long)]
    expressions: bool,

    /// Estimate each face's age and gender.
    #[arg(long)]
    age_gender: bool,

    /// Detector score threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    min_confidence: f32,

    /// Milliseconds between live detection passes.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,

    /// Stop a live session after this many seconds (default: until Enter).
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Write an annotated copy of the analyzed frame here.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Local directory checked for model files before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let options = build_options(&cli)?;
    log::info!("minimum confidence: {:.2}", options.min_confidence());
    let analyzer = build_analyzer(&cli, &options)?;
    let mut sink = CliSink::new(cli.overlay.clone());

    if let Some(device) = &cli.camera {
        run_live(device, analyzer, &options, &cli, &mut sink)
    } else {
        run_image(cli.input.as_ref().unwrap(), analyzer, &options, &mut sink)
    }
}

fn run_image(
    input: &Path,
    analyzer: Box<dyn FaceAnalyzer>,
    options: &DetectionOptions,
    sink: &mut CliSink,
) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = Box::new(ImageFileSource::new(input));
    let mut use_case = AnalyzeImageUseCase::new(source, analyzer);
    let output = use_case.execute(options)?;
    sink.apply(&output, options)?;
    Ok(())
}

fn run_live(
    device: &str,
    analyzer: Box<dyn FaceAnalyzer>,
    options: &DetectionOptions,
    cli: &Cli,
    sink: &mut CliSink,
) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = Box::new(FfmpegCameraSource::new(
        device,
        CaptureConstraints::default(),
    ));

    let mut config = LiveAnalysisConfig::new();
    config.interval = Duration::from_millis(cli.interval_ms);
    config.duration = cli.duration_secs.map(Duration::from_secs);

    if cli.duration_secs.is_none() {
        eprintln!("Press Enter to stop.");
    }
    let cancelled = config.cancelled.clone();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        cancelled.store(true, Ordering::Relaxed);
    });

    let use_case = LiveAnalysisUseCase::new(source, analyzer);
    use_case.execute(options, &config, sink)
}

/// Terminal table plus an optional annotated image, refreshed per pass.
struct CliSink {
    renderer: TextTableRenderer<std::io::Stdout>,
    painter: OverlayPainter,
    writer: ImageFileWriter,
    overlay_path: Option<PathBuf>,
}

impl CliSink {
    fn new(overlay_path: Option<PathBuf>) -> Self {
        Self {
            renderer: TextTableRenderer::new(std::io::stdout()),
            painter: OverlayPainter::new(),
            writer: ImageFileWriter::new(),
            overlay_path,
        }
    }
}

impl PassSink for CliSink {
    fn apply(
        &mut self,
        output: &PassOutput,
        options: &DetectionOptions,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.renderer.render(&output.rows, options)?;

        if let Some(path) = &self.overlay_path {
            let mut annotated = output.frame.clone();
            self.painter.paint(&mut annotated, &output.records, options);
            self.writer.write(path, &annotated)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.renderer.clear();
    }
}

fn build_options(cli: &Cli) -> Result<DetectionOptions, Box<dyn std::error::Error>> {
    Ok(DetectionOptions::new()
        .with_face(!cli.no_boxes)
        .with_landmarks(!cli.no_landmarks)
        .with_expressions(cli.expressions)
        .with_age_gender(cli.age_gender)
        .with_min_confidence(cli.min_confidence)?)
}

fn build_analyzer(
    cli: &Cli,
    options: &DetectionOptions,
) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
    let models_dir = cli.models_dir.as_deref();

    // Only the models for requested facets are resolved, so a presence-only
    // run needs nothing beyond the detector.
    let paths = ModelPaths {
        detector: resolve_model(DETECTOR_MODEL_NAME, models_dir)?,
        landmarks: options
            .detect_landmarks()
            .then(|| resolve_model(LANDMARK_MODEL_NAME, models_dir))
            .transpose()?,
        expressions: options
            .detect_expressions()
            .then(|| resolve_model(EXPRESSION_MODEL_NAME, models_dir))
            .transpose()?,
        age_gender: options
            .detect_age_gender()
            .then(|| resolve_model(AGE_GENDER_MODEL_NAME, models_dir))
            .transpose()?,
    };

    Ok(Box::new(OnnxFaceAnalyzer::new(&paths)?))
}

fn resolve_model(
    name: &str,
    models_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let primary = format!("{MODEL_BASE_URL}/{name}");
    let mirror = format!("{MODEL_MIRROR_URL}/{name}");
    let path = model_resolver::resolve(
        name,
        &[primary.as_str(), mirror.as_str()],
        models_dir,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match (&cli.input, &cli.camera) {
        (None, None) => {
            return Err("Provide an input image or --camera <device>".into());
        }
        (Some(input), None) => {
            if !input.exists() {
                return Err(format!("Input file not found: {}", input.display()).into());
            }
            if !is_image(input) {
                return Err(format!(
                    "Unsupported input format: {} (expected one of {})",
                    input.display(),
                    IMAGE_EXTENSIONS.join(", ")
                )
                .into());
            }
        }
        _ => {}
    }
    if !(0.0..=1.0).contains(&cli.min_confidence) {
        return Err(format!(
            "Minimum confidence must be between 0.0 and 1.0, got {}",
            cli.min_confidence
        )
        .into());
    }
    if cli.interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
