use std::sync::Mutex;

/// Counters describing how the live feed has behaved since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedMetrics {
    pub events_applied: usize,
    pub events_ignored: usize,
    pub snapshots_applied: usize,
    pub fetch_errors: usize,
    pub frames_dropped: usize,
}

#[derive(Debug)]
pub struct MetricsRecorder {
    inner: Mutex<FeedMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FeedMetrics::default()),
        }
    }

    pub fn record_applied(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_applied += 1;
        }
    }

    pub fn record_ignored(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_ignored += 1;
        }
    }

    pub fn record_snapshot(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.snapshots_applied += 1;
        }
    }

    pub fn record_fetch_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.fetch_errors += 1;
        }
    }

    pub fn record_dropped_frame(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.frames_dropped += 1;
        }
    }

    pub fn snapshot(&self) -> FeedMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            FeedMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_each_kind_separately() {
        let recorder = MetricsRecorder::new();
        recorder.record_applied();
        recorder.record_applied();
        recorder.record_ignored();
        recorder.record_snapshot();
        recorder.record_fetch_error();
        recorder.record_dropped_frame();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.events_applied, 2);
        assert_eq!(snapshot.events_ignored, 1);
        assert_eq!(snapshot.snapshots_applied, 1);
        assert_eq!(snapshot.fetch_errors, 1);
        assert_eq!(snapshot.frames_dropped, 1);
    }
}
