use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::alert::domain::alarm::Alarm;
use crate::alert::domain::alert_debouncer::AlertDebouncer;
use crate::capture::alert_event::AlertEvent;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::person_filter::{filter_persons, is_dangerous};
use crate::display::domain::frame_display::{FrameDisplay, Overlay};
use crate::notify::domain::notifier::{Notifier, NotifyReceipt};
use crate::pipeline::capture_alert_use_case::CaptureAlertUseCase;
use crate::pipeline::monitor_logger::MonitorLogger;
use crate::shared::clock::Clock;
use crate::shared::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;
use crate::zone::danger_zone::compute_zone;

const WARNING_TEXT: &str = "DANGER ZONE";

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    /// Persons at or below this confidence are ignored.
    pub confidence_threshold: f64,
    /// Checked before every frame; set it to stop the loop.
    pub cancelled: Arc<AtomicBool>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub frames: usize,
    pub alerts: usize,
    pub captures: usize,
    pub notify_failures: usize,
}

/// The live monitor: detect → zone check → debounce → alarm, capture, notify.
///
/// Runs on the caller's thread until the source ends, a frame read fails,
/// or `settings.cancelled` is set. Only detector failures abort the run;
/// alarm, display, capture and notification failures are logged and the
/// loop keeps watching.
pub struct MonitorUseCase {
    detector: Box<dyn ObjectDetector>,
    debouncer: AlertDebouncer,
    alarm: Option<Box<dyn Alarm>>,
    display: Box<dyn FrameDisplay>,
    capture: CaptureAlertUseCase,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    logger: Box<dyn MonitorLogger>,
    settings: MonitorSettings,
}

impl MonitorUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        debouncer: AlertDebouncer,
        alarm: Option<Box<dyn Alarm>>,
        display: Box<dyn FrameDisplay>,
        capture: CaptureAlertUseCase,
        notifier: Box<dyn Notifier>,
        clock: Arc<dyn Clock>,
        logger: Box<dyn MonitorLogger>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            detector,
            debouncer,
            alarm,
            display,
            capture,
            notifier,
            clock,
            logger,
            settings,
        }
    }

    pub fn execute(
        &mut self,
        source: &mut dyn FrameSource,
    ) -> Result<MonitorSummary, Box<dyn std::error::Error>> {
        let mut summary = MonitorSummary::default();
        self.logger.info("Monitoring started");

        loop {
            if self.settings.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Quit requested, stopping");
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.logger.info("Video source ended");
                    break;
                }
                Err(e) => {
                    log::warn!("Failed to read frame, stopping: {e}");
                    break;
                }
            };
            summary.frames += 1;
            self.logger.frame(summary.frames);

            let t0 = Instant::now();
            let detections = self.detector.detect(&frame)?;
            self.logger.timing("detect", elapsed_ms(t0));

            let zone = compute_zone(frame.width(), frame.height());
            let persons = filter_persons(&detections, self.settings.confidence_threshold);
            for p in &persons {
                log::debug!(
                    "Person {:.2} at ({}, {})-({}, {})",
                    p.confidence,
                    p.bbox.x1,
                    p.bbox.y1,
                    p.bbox.x2,
                    p.bbox.y2
                );
            }
            self.logger.metric("persons", persons.len() as f64);

            let mut overlays = vec![Overlay::Zone(zone)];
            overlays.extend(persons.iter().map(|p| Overlay::Person(p.bbox)));

            let danger = is_dangerous(&persons, &zone);
            if self.debouncer.observe(danger, self.clock.now()) {
                self.raise_alert(&frame, &overlays, source, &mut summary);
            }

            self.render(&frame, &overlays);
        }

        self.logger.summary();
        Ok(summary)
    }

    fn raise_alert(
        &mut self,
        frame: &Frame,
        overlays: &[Overlay],
        source: &mut dyn FrameSource,
        summary: &mut MonitorSummary,
    ) {
        summary.alerts += 1;
        log::warn!("Person in danger zone (frame {})", frame.index());

        if let Some(alarm) = self.alarm.as_mut() {
            if let Err(e) = alarm.play() {
                log::warn!("Alarm failed: {e}");
            }
        }
        // The warning frame keeps the zone and person boxes under the banner.
        let mut warning = overlays.to_vec();
        warning.push(Overlay::Warning(WARNING_TEXT.to_string()));
        self.render(frame, &warning);

        let t0 = Instant::now();
        let captured = self.capture.execute(source);
        self.logger.timing("capture", elapsed_ms(t0));
        match captured {
            Ok(Some(event)) => {
                summary.captures += 1;
                self.notify(&event, summary);
            }
            Ok(None) => {}
            Err(e) => log::error!("Alert capture failed: {e}"),
        }
    }

    fn notify(&mut self, event: &AlertEvent, summary: &mut MonitorSummary) {
        let t0 = Instant::now();
        match self.notifier.notify(Some(event.image_path.as_path())) {
            Ok(NotifyReceipt::Delivered { url, .. }) => log::info!("Alert sent: {url}"),
            Ok(NotifyReceipt::Queued) => log::debug!("Alert notification queued"),
            Err(e) => {
                summary.notify_failures += 1;
                log::error!("Notification failed: {e}");
            }
        }
        self.logger.timing("notify", elapsed_ms(t0));
    }

    fn render(&mut self, frame: &Frame, overlays: &[Overlay]) {
        if let Err(e) = self.display.render(frame, overlays) {
            log::warn!("Display failed: {e}");
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::domain::alert_debouncer::CooldownPolicy;
    use crate::capture::alert_log::AlertLog;
    use crate::detection::domain::detection::Detection;
    use crate::notify::domain::chat_webhook::{ChatWebhook, WebhookMessage};
    use crate::notify::domain::notify_error::NotifyError;
    use crate::notify::domain::object_store::ObjectStore;
    use crate::notify::domain::upload_notifier::{NotifierConfig, UploadNotifier};
    use crate::pipeline::capture_alert_use_case::CaptureSettings;
    use crate::pipeline::monitor_logger::NullMonitorLogger;
    use crate::shared::clock::ManualClock;
    use crate::shared::constants::DEFAULT_WARNING_INTERVAL;
    use crate::shared::geometry::BoundingBox;
    use crate::video::domain::image_writer::ImageWriter;
    use crate::video::infrastructure::jpeg_image_writer::JpegImageWriter;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    const FRAME_PERIOD: Duration = Duration::from_millis(33);

    // --- Stubs ---

    /// Camera stand-in: frames are 1-based and each pull costs one frame
    /// period of clock time.
    struct StubSource {
        frames: VecDeque<Result<Frame, String>>,
        clock: Arc<ManualClock>,
    }

    impl StubSource {
        fn camera(count: usize, clock: Arc<ManualClock>) -> Self {
            let frames = (1..=count)
                .map(|i| Ok(Frame::filled(640, 480, [40, 40, 40], i)))
                .collect();
            Self { frames, clock }
        }
    }

    impl FrameSource for StubSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            self.clock.advance(FRAME_PERIOD);
            match self.frames.pop_front() {
                Some(Ok(frame)) => Ok(Some(frame)),
                Some(Err(e)) => Err(e.into()),
                None => Ok(None),
            }
        }
    }

    /// Reports one person inside the 640x480 zone from frame `from` on.
    struct StubDetector {
        from: usize,
        fail_at: Option<usize>,
    }

    impl ObjectDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            if self.fail_at == Some(frame.index()) {
                return Err("inference failed".into());
            }
            if frame.index() < self.from {
                return Ok(vec![]);
            }
            Ok(vec![
                Detection::new("person", 0.9, BoundingBox::new(300, 200, 360, 300)),
                Detection::new("chair", 0.95, BoundingBox::new(0, 0, 50, 50)),
            ])
        }
    }

    struct CountingAlarm {
        plays: Arc<Mutex<usize>>,
        fail: bool,
    }

    impl Alarm for CountingAlarm {
        fn play(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            *self.plays.lock().unwrap() += 1;
            if self.fail {
                return Err("no audio device".into());
            }
            Ok(())
        }
    }

    struct RecordingDisplay {
        renders: Arc<Mutex<Vec<Vec<Overlay>>>>,
        fail: bool,
    }

    impl FrameDisplay for RecordingDisplay {
        fn render(
            &mut self,
            _frame: &Frame,
            overlays: &[Overlay],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.renders.lock().unwrap().push(overlays.to_vec());
            if self.fail {
                return Err("window closed".into());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<String>>,
    }

    impl ObjectStore for RecordingStore {
        fn upload(&self, _bucket: &str, key: &str, _local_path: &Path) -> Result<(), String> {
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn presign_get(
            &self,
            bucket: &str,
            key: &str,
            _expires_in: Duration,
        ) -> Result<String, String> {
            Ok(format!("https://{bucket}.example/{key}"))
        }
    }

    #[derive(Default)]
    struct RecordingWebhook {
        posts: Mutex<Vec<WebhookMessage>>,
    }

    impl ChatWebhook for RecordingWebhook {
        fn post(&self, _url: &str, message: &WebhookMessage) -> Result<(), NotifyError> {
            self.posts.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingImageWriter;

    impl ImageWriter for FailingImageWriter {
        fn write(
            &self,
            _path: &Path,
            _frame: &Frame,
            _size: Option<(u32, u32)>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Err("read-only filesystem".into())
        }
    }

    // --- Harness ---

    struct Harness {
        _dir: tempfile::TempDir,
        shots: PathBuf,
        log_path: PathBuf,
        clock: Arc<ManualClock>,
        store: Arc<RecordingStore>,
        webhook: Arc<RecordingWebhook>,
        plays: Arc<Mutex<usize>>,
        renders: Arc<Mutex<Vec<Vec<Overlay>>>>,
        cancelled: Arc<AtomicBool>,
    }

    struct Options {
        detector: StubDetector,
        image_writer: Box<dyn ImageWriter>,
        notifier_config: NotifierConfig,
        alarm_fails: bool,
        display_fails: bool,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                detector: StubDetector {
                    from: 6,
                    fail_at: None,
                },
                image_writer: Box::new(JpegImageWriter::new(60)),
                notifier_config: NotifierConfig {
                    bucket: Some("alerts".to_string()),
                    webhook_url: Some("https://hooks.example/T1".to_string()),
                    ..NotifierConfig::default()
                },
                alarm_fails: false,
                display_fails: false,
            }
        }
    }

    fn build(options: Options) -> (MonitorUseCase, Harness) {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("danger_shots");
        let log_path = dir.path().join("danger_log.csv");
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(RecordingStore::default());
        let webhook = Arc::new(RecordingWebhook::default());
        let plays = Arc::new(Mutex::new(0));
        let renders = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let capture = CaptureAlertUseCase::new(
            options.image_writer,
            AlertLog::open(&log_path).unwrap(),
            clock.clone(),
            CaptureSettings {
                save_dir: shots.clone(),
                ..CaptureSettings::default()
            },
        );
        let use_case = MonitorUseCase::new(
            Box::new(options.detector),
            AlertDebouncer::new(DEFAULT_WARNING_INTERVAL, CooldownPolicy::Drop),
            Some(Box::new(CountingAlarm {
                plays: plays.clone(),
                fail: options.alarm_fails,
            })),
            Box::new(RecordingDisplay {
                renders: renders.clone(),
                fail: options.display_fails,
            }),
            capture,
            Box::new(UploadNotifier::new(
                store.clone(),
                webhook.clone(),
                options.notifier_config,
            )),
            clock.clone(),
            Box::new(NullMonitorLogger),
            MonitorSettings {
                cancelled: cancelled.clone(),
                ..MonitorSettings::default()
            },
        );

        let harness = Harness {
            _dir: dir,
            shots,
            log_path,
            clock,
            store,
            webhook,
            plays,
            renders,
            cancelled,
        };
        (use_case, harness)
    }

    fn saved_images(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn log_rows(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count() - 1
    }

    #[test]
    fn test_twenty_frames_with_person_from_frame_six_alert_once() {
        let (mut use_case, h) = build(Options::default());
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        // Frame 7 is consumed by the capture, the other 19 by the loop.
        assert_eq!(
            summary,
            MonitorSummary {
                frames: 19,
                alerts: 1,
                captures: 1,
                notify_failures: 0,
            }
        );
        assert_eq!(*h.plays.lock().unwrap(), 1);
        assert_eq!(saved_images(&h.shots), 1);
        assert_eq!(log_rows(&h.log_path), 1);

        let uploads = h.store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with("danger_shots/danger_"));
        let posts = h.webhook.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0]
            .text
            .starts_with("[WARNING] Person detected in danger zone: https://alerts.example/"));
    }

    #[test]
    fn test_long_run_alerts_again_after_interval() {
        let (mut use_case, h) = build(Options::default());
        // ~3.3s of frames plus one settle delay per alert.
        let mut source = StubSource::camera(100, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert!(summary.alerts >= 2);
        assert_eq!(summary.alerts, summary.captures);
        assert_eq!(h.webhook.posts.lock().unwrap().len(), summary.alerts);
    }

    #[test]
    fn test_no_person_no_alert() {
        let (mut use_case, h) = build(Options {
            detector: StubDetector {
                from: usize::MAX,
                fail_at: None,
            },
            ..Options::default()
        });
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(summary.frames, 20);
        assert_eq!(summary.alerts, 0);
        assert_eq!(saved_images(&h.shots), 0);
        assert_eq!(log_rows(&h.log_path), 0);
        assert!(h.store.uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_every_frame_renders_zone_and_persons() {
        let (mut use_case, h) = build(Options::default());
        let mut source = StubSource::camera(6, h.clock.clone());

        use_case.execute(&mut source).unwrap();

        let renders = h.renders.lock().unwrap();
        // 6 frames plus the warning for the alert on frame 6.
        assert_eq!(renders.len(), 7);
        assert!(matches!(renders[0].as_slice(), [Overlay::Zone(_)]));
        assert!(matches!(
            renders[5].as_slice(),
            [Overlay::Zone(_), Overlay::Person(_), Overlay::Warning(_)]
        ));
        assert!(matches!(
            renders[6].as_slice(),
            [Overlay::Zone(_), Overlay::Person(_)]
        ));
        // The warning frame carries the same boxes as the regular render.
        assert_eq!(renders[5][..2], renders[6][..]);
    }

    #[test]
    fn test_cancelled_before_start_reads_nothing() {
        let (mut use_case, h) = build(Options::default());
        h.cancelled.store(true, Ordering::Relaxed);
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(source.frames.len(), 20);
    }

    #[test]
    fn test_frame_read_error_ends_loop_cleanly() {
        let (mut use_case, h) = build(Options::default());
        let mut source = StubSource::camera(3, h.clock.clone());
        source.frames.push_back(Err("device unplugged".to_string()));
        source
            .frames
            .push_back(Ok(Frame::filled(640, 480, [0, 0, 0], 99)));

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(source.frames.len(), 1);
    }

    #[test]
    fn test_detector_error_is_fatal() {
        let (mut use_case, h) = build(Options {
            detector: StubDetector {
                from: 6,
                fail_at: Some(2),
            },
            ..Options::default()
        });
        let mut source = StubSource::camera(20, h.clock.clone());

        let err = use_case.execute(&mut source).unwrap_err();
        assert!(err.to_string().contains("inference failed"));
    }

    #[test]
    fn test_failed_capture_skips_notification_and_continues() {
        let (mut use_case, h) = build(Options {
            image_writer: Box::new(FailingImageWriter),
            ..Options::default()
        });
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(summary.alerts, 1);
        assert_eq!(summary.captures, 0);
        assert_eq!(summary.frames, 19);
        assert_eq!(log_rows(&h.log_path), 0);
        assert!(h.store.uploads.lock().unwrap().is_empty());
        assert!(h.webhook.posts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unconfigured_notifier_keeps_capture_and_counts_failure() {
        let (mut use_case, h) = build(Options {
            notifier_config: NotifierConfig::default(),
            ..Options::default()
        });
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(summary.captures, 1);
        assert_eq!(summary.notify_failures, 1);
        assert_eq!(saved_images(&h.shots), 1);
        assert_eq!(log_rows(&h.log_path), 1);
    }

    #[test]
    fn test_alarm_and_display_failures_do_not_stop_alerting() {
        let (mut use_case, h) = build(Options {
            alarm_fails: true,
            display_fails: true,
            ..Options::default()
        });
        let mut source = StubSource::camera(20, h.clock.clone());

        let summary = use_case.execute(&mut source).unwrap();

        assert_eq!(*h.plays.lock().unwrap(), 1);
        assert_eq!(summary.frames, 19);
        assert_eq!(summary.captures, 1);
        assert_eq!(h.webhook.posts.lock().unwrap().len(), 1);
    }
}
