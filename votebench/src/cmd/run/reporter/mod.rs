use std::time::Duration;

use votebench_lib::vote::FailureKind;

use super::executor::{ExecutorSummary, IterationEvent};

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

pub trait Reporter: Send + Sync + 'static {
    fn on_iteration(&mut self, ev: &IterationEvent);
    fn on_dropped(&mut self, elapsed: Duration);
    fn on_tick(&mut self, now: Duration);
    fn finish(&mut self, summary: &ExecutorSummary);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    total: u64,
    passed: u64,
    http_fail: u64,
    transport_fail: u64,
    dropped: u64,
}

impl Counters {
    fn apply(&mut self, ev: &IterationEvent) {
        self.total += 1;
        if ev.outcome.passed {
            self.passed += 1;
            return;
        }
        match ev.outcome.failure {
            Some(FailureKind::Transport) => self.transport_fail += 1,
            _ => self.http_fail += 1,
        }
    }

    fn failed(&self) -> u64 {
        self.total - self.passed
    }

    /// Percentage of passed checks, 0 when nothing finished yet.
    fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.
        } else {
            self.passed as f64 * 100. / self.total as f64
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "total": self.total,
            "passed": self.passed,
            "http_fail": self.http_fail,
            "transport_fail": self.transport_fail,
            "dropped": self.dropped,
        })
    }
}

/// Iteration latencies, kept in full so percentiles are exact.
#[derive(Debug, Default)]
pub struct LatencyStats {
    samples: Vec<Duration>,
}

impl LatencyStats {
    fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    fn avg(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or_default()
    }

    /// Nearest-rank percentile, `p` in `(0, 100]`.
    fn percentile(&self, p: f64) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let rank = ((p.clamp(0., 100.) / 100.) * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "avg_ms": self.avg().as_secs_f64() * 1000.,
            "p95_ms": self.percentile(95.).as_secs_f64() * 1000.,
            "max_ms": self.max().as_secs_f64() * 1000.,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votebench_lib::vote::{CheckOutcome, VuId};

    use rama::http::StatusCode;

    fn event(outcome: CheckOutcome, latency_ms: u64) -> IterationEvent {
        IterationEvent {
            elapsed: Duration::from_secs(1),
            vu: VuId::new(1),
            latency: Duration::from_millis(latency_ms),
            outcome,
        }
    }

    #[test]
    fn test_counters_apply() {
        let mut c = Counters::default();
        for outcome in [
            CheckOutcome::from_status(StatusCode::ACCEPTED),
            CheckOutcome::from_status(StatusCode::OK),
            CheckOutcome::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            CheckOutcome::from_status(StatusCode::CREATED),
            CheckOutcome::transport_failure(),
        ] {
            c.apply(&event(outcome, 1));
        }

        assert_eq!(
            c,
            Counters {
                total: 5,
                passed: 2,
                http_fail: 2,
                transport_fail: 1,
                dropped: 0,
            }
        );
        assert_eq!(c.failed(), 3);
        assert_eq!(c.pass_rate(), 40.);
        assert_eq!(Counters::default().pass_rate(), 0.);
    }

    #[test]
    fn test_latency_stats() {
        let mut stats = LatencyStats::default();
        assert_eq!(stats.avg(), Duration::ZERO);
        assert_eq!(stats.percentile(95.), Duration::ZERO);
        assert_eq!(stats.max(), Duration::ZERO);

        for ms in (1..=100).rev() {
            stats.record(Duration::from_millis(ms));
        }

        assert_eq!(stats.avg(), Duration::from_micros(50_500));
        assert_eq!(stats.max(), Duration::from_millis(100));
        for (p, expected_ms) in [(50., 50), (95., 95), (99., 99), (100., 100), (0., 1)] {
            assert_eq!(
                stats.percentile(p),
                Duration::from_millis(expected_ms),
                "p{p}"
            );
        }
    }
}
