use std::collections::HashMap;
use std::time::Instant;

/// Observer for capture-loop events: progress, per-stage timing, counters.
///
/// Keeps the use case free of any particular output mechanism.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// How long a named stage (`detect`, `track`, ...) took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame sample of a named quantity, e.g. live track count.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and embedding callers.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs throttled progress through `log` and keeps stage timings and
/// metrics for a closing summary.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
    report_progress: bool,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            report_progress: true,
        }
    }

    /// Records timings and metrics but leaves progress reporting to the
    /// caller's own progress callback.
    pub fn without_progress() -> Self {
        Self {
            report_progress: false,
            ..Self::default()
        }
    }

    fn should_report(&self, current: usize, total: usize) -> bool {
        self.report_progress && (current % self.throttle_frames == 0 || current == total)
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Capture summary ({} frames, {:.1}s):",
            self.frames_seen,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in sorted(&self.timings) {
            let total_ms: f64 = durations.iter().sum();
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  total {total_ms:7.0}ms",
                mean(durations)
            ));
        }

        for (name, values) in sorted(&self.metrics) {
            let peak = values.iter().copied().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}, peak {peak:.0}", mean(values)));
        }

        if self.frames_seen > 0 && elapsed_ms > 0.0 {
            let fps = self.frames_seen as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
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

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if !self.should_report(current, total) {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processed {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
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

fn sorted(map: &HashMap<String, Vec<f64>>) -> Vec<(&String, &Vec<f64>)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_is_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("tracks", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("track", 5.0);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("track").unwrap(), &[5.0]);
        assert!(logger.timings_for("export").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("open_identities", 3.0);
        logger.metric("open_identities", 4.0);
        assert_relative_eq!(mean(logger.metrics_for("open_identities").unwrap()), 3.5);
    }

    #[test]
    fn test_progress_is_throttled() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(!logger.should_report(3, 25));
        assert!(logger.should_report(10, 25));
        assert!(logger.should_report(25, 25));
    }

    #[test]
    fn test_without_progress_never_reports_but_still_counts_frames() {
        let mut logger = StdoutPipelineLogger::without_progress();
        assert!(!logger.should_report(100, 100));
        assert!(!logger.should_report(1, 1));

        logger.progress(42, 100);
        logger.timing("detect", 1.0);
        assert!(logger.summary_string().unwrap().starts_with("Capture summary (42 frames"));
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(10, 10);
        logger.timing("track", 2.0);
        logger.timing("detect", 20.0);
        logger.metric("tracks", 2.0);
        logger.metric("tracks", 6.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Capture summary (10 frames"));
        assert!(summary.find("detect").unwrap() < summary.find("track ").unwrap());
        assert!(summary.contains("tracks: avg 4.0, peak 6"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames_seen() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 25);
    }

    #[test]
    fn test_throttle_never_zero() {
        assert_eq!(StdoutPipelineLogger::new(0).throttle_frames, 1);
    }
}
