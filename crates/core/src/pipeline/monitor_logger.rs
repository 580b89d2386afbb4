use std::collections::HashMap;
use std::time::Instant;

/// Observer for monitor-loop events: progress, stage timings, metrics.
///
/// Keeps the loop free of reporting concerns; the CLI logs through `log`,
/// tests plug in `NullMonitorLogger`.
pub trait MonitorLogger: Send {
    /// Called once per processed frame with the running frame count.
    fn frame(&mut self, count: usize);

    /// How long a named stage (`detect`, `capture`, `notify`) took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as the number of persons in a frame.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullMonitorLogger;

impl MonitorLogger for NullMonitorLogger {
    fn frame(&mut self, _count: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects timings and metrics and logs a heartbeat every
/// `heartbeat_frames` frames, since a live feed has no known total.
pub struct StdoutMonitorLogger {
    heartbeat_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
}

impl StdoutMonitorLogger {
    pub fn new(heartbeat_frames: usize) -> Self {
        Self {
            heartbeat_frames: heartbeat_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` before any frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Monitor summary ({} frames, {elapsed_s:.1}s):",
            self.frames
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len() as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:7.1}ms  max {max_ms:7.1}ms  ({} runs)",
                durations.len()
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            lines.push(format!("  {name}: avg {avg:.2}"));
        }

        if elapsed_s > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", self.frames as f64 / elapsed_s));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutMonitorLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl MonitorLogger for StdoutMonitorLogger {
    fn frame(&mut self, count: usize) {
        self.frames = count;
        if count % self.heartbeat_frames == 0 {
            log::info!("Monitoring: {count} frames processed");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
