use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use dangerzone_core::alert::domain::alarm::Alarm;
use dangerzone_core::alert::domain::alert_debouncer::{AlertDebouncer, CooldownPolicy};
use dangerzone_core::alert::infrastructure::bell_alarm::BellAlarm;
use dangerzone_core::alert::infrastructure::command_alarm::CommandAlarm;
use dangerzone_core::capture::alert_log::AlertLog;
use dangerzone_core::detection::domain::object_detector::ObjectDetector;
use dangerzone_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_MIN_CONFIDENCE,
};
use dangerzone_core::display::domain::frame_display::{FrameDisplay, NullDisplay};
use dangerzone_core::display::infrastructure::snapshot_display::SnapshotDisplay;
use dangerzone_core::notify::domain::notifier::Notifier;
use dangerzone_core::notify::domain::upload_notifier::{NotifierConfig, UploadNotifier};
use dangerzone_core::notify::infrastructure::queued_notifier::QueuedNotifier;
use dangerzone_core::notify::infrastructure::s3_object_store::{S3ObjectStore, S3Settings};
use dangerzone_core::notify::infrastructure::slack_webhook::SlackWebhook;
use dangerzone_core::pipeline::capture_alert_use_case::{CaptureAlertUseCase, CaptureSettings};
use dangerzone_core::pipeline::infrastructure::quit_listener::QuitListener;
use dangerzone_core::pipeline::monitor_logger::StdoutMonitorLogger;
use dangerzone_core::pipeline::monitor_use_case::{MonitorSettings, MonitorUseCase};
use dangerzone_core::shared::clock::{Clock, SystemClock};
use dangerzone_core::shared::constants::{
    CAPTURE_HEIGHT, CAPTURE_WIDTH, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_JPEG_QUALITY, DEFAULT_LOG_FILE, DEFAULT_NOTIFY_QUEUE_CAPACITY, DEFAULT_S3_REGION,
    DEFAULT_SAVE_DIR, DEFAULT_SHOOT_DELAY, DEFAULT_WARNING_INTERVAL, YOLO_MODEL_NAME,
};
use dangerzone_core::shared::model_resolver;
use dangerzone_core::video::domain::frame_source::FrameSource;
use dangerzone_core::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use dangerzone_core::video::infrastructure::image_dir_source::ImageDirSource;
use dangerzone_core::video::infrastructure::jpeg_image_writer::JpegImageWriter;

/// Watches a camera and raises an alert when a person enters the danger zone.
#[derive(Parser)]
#[command(name = "dangerzone")]
struct Cli {
    /// Camera device, video file, stream URL, or a directory of images.
    #[arg(long, default_value = "/dev/video0")]
    source: String,

    /// FFmpeg input device format for cameras (e.g. v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Path to a YOLOv8 ONNX model (skips model resolution).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to download the model from when it is not cached.
    #[arg(long, env = "DANGERZONE_MODEL_URL")]
    model_url: Option<String>,

    /// Minimum person confidence (0.0-1.0, exclusive).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence: f64,

    /// Minimum seconds between two alerts.
    #[arg(long, default_value_t = DEFAULT_WARNING_INTERVAL.as_secs_f64())]
    warning_interval: f64,

    /// Seconds to wait after the alarm before taking the picture.
    #[arg(long, default_value_t = DEFAULT_SHOOT_DELAY.as_secs_f64())]
    shoot_delay: f64,

    /// Dangerous frames during the cooldown: drop or defer.
    #[arg(long, default_value = "drop")]
    cooldown_policy: String,

    /// Directory for alert images.
    #[arg(long, default_value = DEFAULT_SAVE_DIR)]
    save_dir: PathBuf,

    /// CSV alert log.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// JPEG quality for alert images (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,

    /// Width of saved alert images.
    #[arg(long, default_value_t = CAPTURE_WIDTH)]
    capture_width: u32,

    /// Height of saved alert images.
    #[arg(long, default_value_t = CAPTURE_HEIGHT)]
    capture_height: u32,

    /// Command to play the alarm sound (e.g. "aplay alert.wav"). Default: terminal bell.
    #[arg(long)]
    alarm_command: Option<String>,

    /// Disable the alarm sound.
    #[arg(long)]
    no_alarm: bool,

    /// Write an annotated preview image to this path.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Refresh the preview every Nth frame.
    #[arg(long, default_value = "15")]
    preview_every: usize,

    /// Send notifications from a background thread.
    #[arg(long)]
    async_notify: bool,

    /// Pending notifications kept by --async-notify before dropping new ones.
    #[arg(long, default_value_t = DEFAULT_NOTIFY_QUEUE_CAPACITY)]
    notify_queue: usize,

    /// Timeout in seconds for each S3 and webhook request.
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs_f64())]
    http_timeout: f64,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// Bucket receiving alert images.
    #[arg(long, env = "AWS_S3_BUCKET")]
    bucket: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_S3_REGION)]
    aws_region: String,

    /// S3-compatible endpoint (MinIO, R2, ...).
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    aws_endpoint_url: Option<String>,

    /// Incoming webhook for alert messages.
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    slack_webhook_url: Option<String>,

    /// Environment file to load before reading settings. Default: ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn main() {
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // The quit listener puts the terminal in raw mode, which stops `\n`
    // from returning the cursor to column 0.
    if std::io::stderr().is_terminal() {
        logger.format(|buf, record| {
            write!(
                buf,
                "[{} {:5} {}] {}\r\n",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }
    logger.init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // The first parse only locates --env-file; the second sees its variables.
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;
    let cli = Cli::parse();
    validate(&cli)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = cancelled.clone();
    ctrlc::set_handler(move || ctrlc_flag.store(true, Ordering::Relaxed))?;

    let detector = build_detector(&cli)?;
    let mut source = open_source(&cli)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let capture = CaptureAlertUseCase::new(
        Box::new(JpegImageWriter::new(cli.jpeg_quality)),
        AlertLog::open(&cli.log_file)?,
        clock.clone(),
        CaptureSettings {
            settle_delay: Duration::from_secs_f64(cli.shoot_delay),
            output_size: (cli.capture_width, cli.capture_height),
            save_dir: cli.save_dir.clone(),
        },
    );

    let mut use_case = MonitorUseCase::new(
        detector,
        AlertDebouncer::new(
            Duration::from_secs_f64(cli.warning_interval),
            parse_cooldown_policy(&cli.cooldown_policy),
        ),
        build_alarm(&cli),
        build_display(&cli),
        capture,
        build_notifier(&cli)?,
        clock,
        Box::new(StdoutMonitorLogger::default()),
        MonitorSettings {
            confidence_threshold: cli.confidence,
            cancelled: cancelled.clone(),
        },
    );

    let quit = QuitListener::for_stdin(cancelled);
    if quit.is_single_key() {
        log::info!("Watching {} (press q or Ctrl-C to quit)", cli.source);
    } else {
        log::info!("Watching {} (type q + Enter or press Ctrl-C to quit)", cli.source);
    }

    let result = use_case.execute(source.as_mut());
    drop(quit);
    let summary = result?;
    log::info!(
        "Stopped after {} frames: {} alerts, {} images saved, {} notifications failed",
        summary.frames,
        summary.alerts,
        summary.captures,
        summary.notify_failures
    );
    Ok(())
}

fn load_env_file(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| format!("Failed to load {}: {e}", path.display()))?;
        }
        None => match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(format!("Failed to load .env: {e}").into()),
        },
    }
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                cli.model_url.as_deref(),
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let min_confidence = cli.confidence.min(DEFAULT_MIN_CONFIDENCE);
    Ok(Box::new(OnnxYoloDetector::new(&model_path, min_confidence)?))
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let path = Path::new(&cli.source);
    if path.is_dir() {
        return Ok(Box::new(ImageDirSource::open(path)?));
    }
    Ok(Box::new(FfmpegFrameSource::open(
        &cli.source,
        cli.input_format.as_deref(),
    )?))
}

fn build_alarm(cli: &Cli) -> Option<Box<dyn Alarm>> {
    if cli.no_alarm {
        return None;
    }
    match cli.alarm_command.as_deref().and_then(CommandAlarm::parse) {
        Some(alarm) => Some(Box::new(alarm)),
        None => Some(Box::new(BellAlarm::new())),
    }
}

fn build_display(cli: &Cli) -> Box<dyn FrameDisplay> {
    match &cli.preview {
        Some(path) => Box::new(SnapshotDisplay::new(
            Box::new(JpegImageWriter::new(cli.jpeg_quality)),
            path.clone(),
            cli.preview_every,
        )),
        None => Box::new(NullDisplay),
    }
}

fn build_notifier(cli: &Cli) -> Result<Box<dyn Notifier>, Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs_f64(cli.http_timeout);
    let config = NotifierConfig {
        bucket: cli.bucket.clone(),
        webhook_url: cli.slack_webhook_url.clone(),
        ..NotifierConfig::default()
    };
    if config.bucket.is_none() {
        log::warn!("AWS_S3_BUCKET is not set; alert images will not be uploaded");
    }
    if config.webhook_url.is_none() {
        log::warn!("SLACK_WEBHOOK_URL is not set; alerts will not be posted");
    }

    let store = S3ObjectStore::new(S3Settings {
        region: cli.aws_region.clone(),
        endpoint_url: cli.aws_endpoint_url.clone(),
        access_key_id: cli.aws_access_key_id.clone(),
        secret_access_key: cli.aws_secret_access_key.clone(),
        timeout,
    })?;
    let webhook = SlackWebhook::new(timeout)?;
    let notifier = UploadNotifier::new(Arc::new(store), Arc::new(webhook), config);

    if cli.async_notify {
        Ok(Box::new(QueuedNotifier::new(Box::new(notifier), cli.notify_queue)))
    } else {
        Ok(Box::new(notifier))
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    for (name, secs) in [
        ("Warning interval", cli.warning_interval),
        ("Shoot delay", cli.shoot_delay),
    ] {
        if !secs.is_finite() || secs < 0.0 {
            return Err(
                format!("{name} must be a non-negative number of seconds, got {secs}").into(),
            );
        }
    }
    if !cli.http_timeout.is_finite() || cli.http_timeout <= 0.0 {
        return Err(format!("HTTP timeout must be positive, got {}", cli.http_timeout).into());
    }
    if !(1..=100).contains(&cli.jpeg_quality) {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            cli.jpeg_quality
        )
        .into());
    }
    if cli.capture_width == 0 || cli.capture_height == 0 {
        return Err(format!(
            "Capture size must be non-zero, got {}x{}",
            cli.capture_width, cli.capture_height
        )
        .into());
    }
    if cli.cooldown_policy != "drop" && cli.cooldown_policy != "defer" {
        return Err(format!(
            "Cooldown policy must be 'drop' or 'defer', got '{}'",
            cli.cooldown_policy
        )
        .into());
    }
    if cli.async_notify && cli.notify_queue == 0 {
        return Err("Notify queue must hold at least one entry".into());
    }
    if cli.preview_every == 0 {
        return Err("Preview interval must be at least 1 frame".into());
    }
    // Alert log rows name the saved image, so the path must survive as text.
    for (name, path) in [("Save directory", &cli.save_dir), ("Log file", &cli.log_file)] {
        if path.to_str().is_none() {
            return Err(format!("{name} must be valid UTF-8, got {}", path.display()).into());
        }
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn parse_cooldown_policy(policy: &str) -> CooldownPolicy {
    if policy == "defer" {
        CooldownPolicy::Defer
    } else {
        CooldownPolicy::Drop
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading person detection model... {pct}%");
    } else {
        eprint!("\rDownloading person detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dangerzone"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cli = parse(&[]);
        assert_eq!(cli.source, "/dev/video0");
        assert!((cli.warning_interval - 1.43).abs() < f64::EPSILON);
        assert!((cli.shoot_delay - 0.71).abs() < f64::EPSILON);
        assert!((cli.confidence - 0.5).abs() < f64::EPSILON);
        assert!((cli.http_timeout - 10.0).abs() < f64::EPSILON);
        assert_eq!(cli.jpeg_quality, 60);
        assert_eq!((cli.capture_width, cli.capture_height), (640, 480));
        assert_eq!(cli.save_dir, PathBuf::from("danger_shots"));
        assert_eq!(cli.log_file, PathBuf::from("danger_log.csv"));
        assert_eq!(cli.notify_queue, 4);
        assert!(validate(&cli).is_ok());
    }

    #[cfg(unix)]
    #[rstest]
    #[case::save_dir("--save-dir")]
    #[case::log_file("--log-file")]
    fn test_non_utf8_paths_rejected(#[case] flag: &str) {
        use std::ffi::{OsStr, OsString};
        use std::os::unix::ffi::OsStrExt;

        let argv: Vec<OsString> = vec![
            "dangerzone".into(),
            flag.into(),
            OsStr::from_bytes(b"shots_\xff").to_os_string(),
        ];
        let cli = Cli::try_parse_from(argv).unwrap();

        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[rstest]
    #[case::confidence(&["--confidence", "1.5"])]
    #[case::negative_interval(&["--warning-interval=-1"])]
    #[case::negative_delay(&["--shoot-delay=-0.1"])]
    #[case::quality(&["--jpeg-quality", "0"])]
    #[case::zero_width(&["--capture-width", "0"])]
    #[case::policy(&["--cooldown-policy", "queue"])]
    #[case::queue(&["--async-notify", "--notify-queue", "0"])]
    #[case::timeout(&["--http-timeout", "0"])]
    #[case::missing_model(&["--model", "/nonexistent/yolov8n.onnx"])]
    fn test_invalid_settings_rejected(#[case] args: &[&str]) {
        assert!(validate(&parse(args)).is_err());
    }

    #[rstest]
    #[case("drop", CooldownPolicy::Drop)]
    #[case("defer", CooldownPolicy::Defer)]
    fn test_parse_cooldown_policy(#[case] input: &str, #[case] expected: CooldownPolicy) {
        assert_eq!(parse_cooldown_policy(input), expected);
    }
}
