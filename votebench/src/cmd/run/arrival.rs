use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Constant arrival rate schedule.
///
/// Arrival `n` is due at `start + n * time_unit / rate`, computed on
/// integer nanoseconds from the absolute start so that rounding never
/// accumulates over a long run. A caller that falls behind gets the
/// overdue arrivals right away, the timeline itself never shifts.
pub(super) struct ArrivalSchedule {
    start: Instant,
    time_unit_nanos: u128,
    rate: u128,
    next: u64,
}

impl ArrivalSchedule {
    pub(super) fn new(start: Instant, time_unit: Duration, rate: u32) -> Self {
        Self {
            start,
            time_unit_nanos: time_unit.as_nanos(),
            rate: u128::from(rate.max(1)),
            next: 0,
        }
    }

    /// Index of the next arrival.
    pub(super) fn next_index(&self) -> u64 {
        self.next
    }

    /// Instant at which the next arrival is due.
    pub(super) fn next_due(&self) -> Instant {
        let offset = self.time_unit_nanos * u128::from(self.next) / self.rate;
        self.start + Duration::from_nanos(u64::try_from(offset).unwrap_or(u64::MAX))
    }

    /// Wait until the next arrival is due and consume it.
    ///
    /// Cancel safe: an arrival is only consumed once it is due.
    pub(super) async fn wait_next(&mut self) -> u64 {
        let due = self.next_due();
        if due > Instant::now() {
            sleep_until(due).await;
        }
        let index = self.next;
        self.next += 1;
        index
    }
}
