use std::collections::HashMap;
use std::time::Instant;

/// Stage names reported through [`PipelineLogger::timing`].
pub mod stage {
    pub const NORMALIZE: &str = "normalize";
    pub const DETECT: &str = "detect";
    pub const ENCODE: &str = "encode";
    pub const MATCH: &str = "match";
    pub const STORE: &str = "store";
}

/// Cross-cutting logger for classification events.
///
/// Gallery items run in parallel; the classifier serialises calls and
/// reports each item's timings and progress as it finishes, so events arrive
/// in completion order.
pub trait PipelineLogger: Send {
    /// Report image-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per image).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that aggregates per-stage timing and metrics and
/// reports them through `log` when the run completes.
///
/// Progress lines are throttled to every `throttle_images` images.
pub struct StdoutPipelineLogger {
    throttle_images: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_images: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_images: usize) -> Self {
        Self {
            throttle_images: throttle_images.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_images: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let images = self.total_images;
        let mut lines = vec![format!(
            "Classification summary ({images} images, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} calls)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", mean(&self.metrics[name])));
        }

        if images > 0 && elapsed_ms > 0.0 {
            let rate = images as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} images/s"));
        }

        Some(lines.join("\n"))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_images = total;
        if total > 0 && (current % self.throttle_images == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Classified {current}/{total} images ({pct:.0}%)");
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing(stage::DETECT, 5.0);
        logger.metric("faces", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(stage::DETECT, 20.0);
        logger.timing(stage::DETECT, 30.0);
        logger.timing(stage::STORE, 5.0);

        assert_eq!(logger.timings[stage::DETECT], vec![20.0, 30.0]);
        assert_eq!(logger.timings[stage::STORE], vec![5.0]);
        assert!(!logger.timings.contains_key(stage::ENCODE));
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(4, 4);
        logger.timing(stage::NORMALIZE, 2.0);
        logger.timing(stage::MATCH, 0.5);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Classification summary (4 images"));
        assert!(summary.contains("normalize"));
        assert!(summary.contains("match"));
        assert!(summary.contains("faces: avg 1.5"));
        assert!(summary.contains("images/s"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut logger = StdoutPipelineLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 7);
        }
        assert_eq!(logger.total_images, 7);
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StdoutPipelineLogger::default().throttle_images, 10);
    }

    #[test]
    fn test_mean() {
        assert_relative_eq!(mean(&[10.0, 20.0, 30.0]), 20.0);
        assert_relative_eq!(mean(&[]), 0.0);
    }
}
