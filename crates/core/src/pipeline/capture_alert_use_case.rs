use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::capture::alert_event::AlertEvent;
use crate::capture::alert_log::AlertLog;
use crate::shared::clock::Clock;
use crate::shared::constants::{
    CAPTURE_HEIGHT, CAPTURE_WIDTH, DEFAULT_SAVE_DIR, DEFAULT_SHOOT_DELAY, TIMESTAMP_FORMAT,
};
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::image_writer::ImageWriter;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to write alert image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("failed to append to alert log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct CaptureSettings {
    pub settle_delay: Duration,
    pub output_size: (u32, u32),
    pub save_dir: PathBuf,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SHOOT_DELAY,
            output_size: (CAPTURE_WIDTH, CAPTURE_HEIGHT),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
        }
    }
}

/// Evidence capture: settle → grab one fresh frame → save JPEG → log it.
///
/// The settle delay blocks the caller; frames arriving meanwhile are not
/// inspected. The image is fully written before its log row is appended.
pub struct CaptureAlertUseCase {
    image_writer: Box<dyn ImageWriter>,
    alert_log: AlertLog,
    clock: Arc<dyn Clock>,
    settings: CaptureSettings,
}

impl CaptureAlertUseCase {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        alert_log: AlertLog,
        clock: Arc<dyn Clock>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            image_writer,
            alert_log,
            clock,
            settings,
        }
    }

    /// Returns `Ok(None)` when no frame could be pulled; nothing is written
    /// in that case.
    pub fn execute(
        &mut self,
        source: &mut dyn FrameSource,
    ) -> Result<Option<AlertEvent>, CaptureError> {
        self.clock.sleep(self.settings.settle_delay);

        let shot = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::warn!("Alert capture aborted: video source ended");
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Alert capture aborted: {e}");
                return Ok(None);
            }
        };

        let timestamp = self.clock.wall_time().format(TIMESTAMP_FORMAT).to_string();
        let image_path = self.settings.save_dir.join(format!("danger_{timestamp}.jpg"));

        self.image_writer
            .write(&image_path, &shot, Some(self.settings.output_size))
            .map_err(|source| CaptureError::Image {
                path: image_path.clone(),
                source,
            })?;

        let event = AlertEvent {
            timestamp,
            image_path,
        };
        self.alert_log
            .append(&event)
            .map_err(|source| CaptureError::Log {
                path: self.alert_log.path().to_path_buf(),
                source,
            })?;

        log::info!("Saved alert image {}", event.image_path.display());
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::clock::ManualClock;
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::jpeg_image_writer::JpegImageWriter;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubSource {
        frames: VecDeque<Result<Frame, String>>,
    }

    impl StubSource {
        fn new(frames: Vec<Result<Frame, String>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl FrameSource for StubSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            match self.frames.pop_front() {
                Some(Ok(frame)) => Ok(Some(frame)),
                Some(Err(e)) => Err(e.into()),
                None => Ok(None),
            }
        }
    }

    struct StubImageWriter {
        written: Arc<Mutex<Vec<(PathBuf, Option<(u32, u32)>)>>>,
        fail: bool,
    }

    impl ImageWriter for StubImageWriter {
        fn write(
            &self,
            path: &Path,
            _frame: &Frame,
            size: Option<(u32, u32)>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("disk full".into());
            }
            self.written.lock().unwrap().push((path.to_path_buf(), size));
            Ok(())
        }
    }

    fn settings(dir: &Path) -> CaptureSettings {
        CaptureSettings {
            save_dir: dir.join("danger_shots"),
            ..CaptureSettings::default()
        }
    }

    fn log_rows(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_capture_writes_one_image_and_one_matching_row() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("danger_log.csv");
        let clock = Arc::new(ManualClock::new());
        let mut use_case = CaptureAlertUseCase::new(
            Box::new(JpegImageWriter::new(60)),
            AlertLog::open(&log_path).unwrap(),
            clock.clone(),
            settings(dir.path()),
        );
        let mut source = StubSource::new(vec![Ok(Frame::filled(1280, 720, [9, 9, 9], 0))]);

        let event = use_case.execute(&mut source).unwrap().unwrap();

        assert!(event.image_path.exists());
        let name = event.image_path.file_name().unwrap().to_string_lossy();
        assert_eq!(name, format!("danger_{}.jpg", event.timestamp));
        let img = image::open(&event.image_path).unwrap();
        assert_eq!((img.width(), img.height()), (640, 480));

        let rows = log_rows(&log_path);
        assert_eq!(rows.len(), 1);
        let (ts, file) = rows[0].split_once(',').unwrap();
        assert_eq!(ts, event.timestamp);
        assert!(Path::new(file).exists());
    }

    #[test]
    fn test_capture_waits_settle_delay_before_pulling() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut use_case = CaptureAlertUseCase::new(
            Box::new(StubImageWriter {
                written: written.clone(),
                fail: false,
            }),
            AlertLog::open(dir.path().join("log.csv")).unwrap(),
            clock.clone(),
            settings(dir.path()),
        );
        let mut source = StubSource::new(vec![Ok(Frame::filled(4, 4, [0, 0, 0], 0))]);

        use_case.execute(&mut source).unwrap();

        assert_eq!(clock.elapsed(), Duration::from_millis(710));
        assert_eq!(written.lock().unwrap()[0].1, Some((640, 480)));
    }

    #[test]
    fn test_timestamp_format_is_filesystem_safe() {
        let dir = tempfile::tempdir().unwrap();
        let mut use_case = CaptureAlertUseCase::new(
            Box::new(JpegImageWriter::new(60)),
            AlertLog::open(dir.path().join("log.csv")).unwrap(),
            Arc::new(ManualClock::new()),
            settings(dir.path()),
        );
        let mut source = StubSource::new(vec![Ok(Frame::filled(8, 8, [0, 0, 0], 0))]);

        let event = use_case.execute(&mut source).unwrap().unwrap();

        // YYYYMMDD_HHMMSS_mmm
        let ts = &event.timestamp;
        assert_eq!(ts.len(), 19);
        assert!(ts
            .chars()
            .enumerate()
            .all(|(i, c)| if i == 8 || i == 15 { c == '_' } else { c.is_ascii_digit() }));
    }

    #[rstest::rstest]
    #[case::stream_ended(vec![])]
    #[case::pull_failed(vec![Err("camera unplugged".to_string())])]
    fn test_failed_pull_aborts_without_side_effects(#[case] frames: Vec<Result<Frame, String>>) {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("log.csv");
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut use_case = CaptureAlertUseCase::new(
            Box::new(StubImageWriter {
                written: written.clone(),
                fail: false,
            }),
            AlertLog::open(&log_path).unwrap(),
            Arc::new(ManualClock::new()),
            settings(dir.path()),
        );

        let result = use_case.execute(&mut StubSource::new(frames)).unwrap();

        assert!(result.is_none());
        assert!(written.lock().unwrap().is_empty());
        assert!(log_rows(&log_path).is_empty());
    }

    #[test]
    fn test_image_failure_skips_log_row() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("log.csv");
        let mut use_case = CaptureAlertUseCase::new(
            Box::new(StubImageWriter {
                written: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }),
            AlertLog::open(&log_path).unwrap(),
            Arc::new(ManualClock::new()),
            settings(dir.path()),
        );
        let mut source = StubSource::new(vec![Ok(Frame::filled(4, 4, [0, 0, 0], 0))]);

        let err = use_case.execute(&mut source).unwrap_err();

        assert!(matches!(err, CaptureError::Image { .. }));
        assert!(log_rows(&log_path).is_empty());
    }
}
