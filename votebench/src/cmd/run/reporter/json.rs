use std::time::Duration;

use votebench_lib::vote::{FailureKind, VOTE_CHECK_NAME};

use super::{Counters, ExecutorSummary, IterationEvent, LatencyStats, Reporter};

pub struct JsonlReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    total_counts: Counters,
    latency: LatencyStats,
    emit_events: bool,
}

impl JsonlReporter {
    pub fn new(interval: Duration, emit_events: bool) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            total_counts: Counters::default(),
            latency: LatencyStats::default(),
            emit_events,
        }
    }

    fn event_line(ev: &IterationEvent) -> serde_json::Value {
        serde_json::json!({
            "type": "event",
            "t_ms": ev.elapsed.as_millis(),
            "vu": ev.vu.get(),
            "latency_ms": ev.latency.as_millis(),
            "passed": ev.outcome.passed,
            "status": ev.outcome.status,
            "failure": match ev.outcome.failure {
                Some(FailureKind::HttpStatus) => Some("http_status"),
                Some(FailureKind::Transport) => Some("transport"),
                None => None,
            },
        })
    }

    fn summary_line(&self, now: Duration) -> serde_json::Value {
        let interval_secs = self.interval.as_secs_f64();
        let rate = if interval_secs == 0. {
            0.
        } else {
            self.interval_counts.total as f64 / interval_secs
        };

        serde_json::json!({
            "type": "summary",
            "t_ms": now.as_millis(),
            "interval_ms": self.interval.as_millis(),
            "rate": rate,
            "interval": self.interval_counts.to_json(),
            "total": self.total_counts.to_json(),
        })
    }

    fn final_line(&self, summary: &ExecutorSummary) -> serde_json::Value {
        serde_json::json!({
            "type": "final",
            "check": VOTE_CHECK_NAME,
            "pass_rate": self.total_counts.pass_rate(),
            "total": self.total_counts.to_json(),
            "iterations": {
                "started": summary.started,
                "completed": summary.completed(),
                "interrupted": summary.interrupted,
                "dropped": summary.dropped,
            },
            "vus": summary.allocated_vus,
            "elapsed_ms": summary.elapsed.as_millis(),
            "latency": self.latency.to_json(),
        })
    }
}

impl Reporter for JsonlReporter {
    fn on_iteration(&mut self, ev: &IterationEvent) {
        self.interval_counts.apply(ev);
        self.total_counts.apply(ev);
        self.latency.record(ev.latency);

        if self.emit_events {
            println!("{}", Self::event_line(ev));
        }
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

        println!("{}", self.summary_line(now));

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self, summary: &ExecutorSummary) {
        println!("{}", self.final_line(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rama::http::StatusCode;
    use serde_json::json;
    use votebench_lib::vote::{CheckOutcome, VuId};

    #[test]
    fn test_event_line() {
        for (outcome, expected_status, expected_failure) in [
            (
                CheckOutcome::from_status(StatusCode::ACCEPTED),
                json!(202),
                json!(null),
            ),
            (
                CheckOutcome::from_status(StatusCode::SERVICE_UNAVAILABLE),
                json!(503),
                json!("http_status"),
            ),
            (CheckOutcome::transport_failure(), json!(null), json!("transport")),
        ] {
            let line = JsonlReporter::event_line(&IterationEvent {
                elapsed: Duration::from_millis(1_250),
                vu: VuId::new(7),
                latency: Duration::from_millis(12),
                outcome,
            });
            assert_eq!(
                line,
                json!({
                    "type": "event",
                    "t_ms": 1_250,
                    "vu": 7,
                    "latency_ms": 12,
                    "passed": outcome.passed,
                    "status": expected_status,
                    "failure": expected_failure,
                })
            );
        }
    }

    #[test]
    fn test_final_line() {
        let mut r = JsonlReporter::new(Duration::from_secs(1), false);
        r.on_iteration(&IterationEvent {
            elapsed: Duration::from_millis(100),
            vu: VuId::new(1),
            latency: Duration::from_millis(8),
            outcome: CheckOutcome::from_status(StatusCode::OK),
        });
        r.on_dropped(Duration::from_millis(200));

        let line = r.final_line(&ExecutorSummary {
            started: 1,
            dropped: 1,
            interrupted: 0,
            allocated_vus: 1,
            elapsed: Duration::from_secs(1),
        });

        assert_eq!(line["type"], "final");
        assert_eq!(line["check"], "status 202 or 200");
        assert_eq!(line["pass_rate"], 100.);
        assert_eq!(
            line["total"],
            json!({"total": 1, "passed": 1, "http_fail": 0, "transport_fail": 0, "dropped": 1})
        );
        assert_eq!(
            line["iterations"],
            json!({"started": 1, "completed": 1, "interrupted": 0, "dropped": 1})
        );
        assert_eq!(line["latency"]["max_ms"], 8.);
    }
}
