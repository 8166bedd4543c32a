use std::time::Duration;

use votebench_lib::vote::VOTE_CHECK_NAME;

use super::{Counters, ExecutorSummary, IterationEvent, LatencyStats, Reporter};

pub struct HumanReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    total_counts: Counters,
    latency: LatencyStats,
}

impl HumanReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            total_counts: Counters::default(),
            latency: LatencyStats::default(),
        }
    }

    fn tick_line(&self, now: Duration) -> String {
        let rate = self.interval_counts.total as f64 / self.interval.as_secs_f64();
        format!(
            "t={:.1}s rate={:.1}/s passed={} http_fail={} transport_fail={} dropped={} total_passed={} total_failed={}",
            now.as_secs_f64(),
            rate,
            self.interval_counts.passed,
            self.interval_counts.http_fail,
            self.interval_counts.transport_fail,
            self.interval_counts.dropped,
            self.total_counts.passed,
            self.total_counts.failed(),
        )
    }

    fn summary_lines(&self, summary: &ExecutorSummary) -> [String; 5] {
        let c = &self.total_counts;
        [
            format!(
                "checks {VOTE_CHECK_NAME}: {:.2}% passed={} failed={}",
                c.pass_rate(),
                c.passed,
                c.failed(),
            ),
            format!(
                "failures http_status={} transport={}",
                c.http_fail, c.transport_fail,
            ),
            format!(
                "iterations started={} completed={} interrupted={} dropped={}",
                summary.started,
                summary.completed(),
                summary.interrupted,
                summary.dropped,
            ),
            format!(
                "latency avg={:?} p95={:?} max={:?}",
                self.latency.avg(),
                self.latency.percentile(95.),
                self.latency.max(),
            ),
            format!(
                "done vus={} elapsed={:.1}s",
                summary.allocated_vus,
                summary.elapsed.as_secs_f64(),
            ),
        ]
    }
}

impl Reporter for HumanReporter {
    fn on_iteration(&mut self, ev: &IterationEvent) {
        self.interval_counts.apply(ev);
        self.total_counts.apply(ev);
        self.latency.record(ev.latency);
    }

    fn on_dropped(&mut self, _elapsed: Duration) {
        self.interval_counts.dropped += 1;
        self.total_counts.dropped += 1;
    }

    fn on_tick(&mut self, now: Duration) {
        if now.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        self.last_tick = now;

        println!("{}", self.tick_line(now));

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self, summary: &ExecutorSummary) {
        for line in self.summary_lines(summary) {
            println!("{line}");
        }
    }
}
