use std::time::Duration;

/// Per-stage timing of the pacing loop, accumulated between summaries.
#[derive(Debug, Default)]
pub struct PacingStats {
    pub capture_us: u64,
    pub compose_us: u64,
    pub publish_us: u64,
    pub iterations: u64,
    pub overruns: u64,
}

impl PacingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, capture: Duration, compose: Duration, publish: Duration, overrun: bool) {
        self.capture_us += capture.as_micros() as u64;
        self.compose_us += compose.as_micros() as u64;
        self.publish_us += publish.as_micros() as u64;
        self.iterations += 1;
        if overrun {
            self.overruns += 1;
        }
    }

    /// Mean milliseconds per iteration for capture, compose and publish.
    pub fn averages_ms(&self) -> (f64, f64, f64) {
        let n = self.iterations.max(1) as f64;
        (
            self.capture_us as f64 / n / 1000.0,
            self.compose_us as f64 / n / 1000.0,
            self.publish_us as f64 / n / 1000.0,
        )
    }

    pub fn log_summary(&mut self) {
        let (capture, compose, publish) = self.averages_ms();
        log::info!(
            "Pacing: capture={:.1}ms compose={:.1}ms publish={:.1}ms | iterations={} overruns={}",
            capture,
            compose,
            publish,
            self.iterations,
            self.overruns,
        );

        // Reset counters for next interval
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_and_reset() {
        let mut stats = PacingStats::new();
        stats.record(Duration::from_millis(10), Duration::from_millis(4), Duration::from_millis(2), false);
        stats.record(Duration::from_millis(30), Duration::from_millis(6), Duration::from_millis(0), true);

        assert_eq!(stats.averages_ms(), (20.0, 5.0, 1.0));
        assert_eq!(stats.overruns, 1);

        stats.log_summary();
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.averages_ms(), (0.0, 0.0, 0.0));
    }
}
