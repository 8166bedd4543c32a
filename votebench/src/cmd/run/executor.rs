use std::{sync::Arc, time::Duration};

use rama::telemetry::tracing;
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::{Instant, sleep},
};
use votebench_lib::{
    config::ScenarioConfig,
    vote::{CheckOutcome, Iteration, VuId},
};

use super::arrival::ArrivalSchedule;

/// Result of a single finished iteration.
#[derive(Debug)]
pub struct IterationEvent {
    /// Time since the executor started, at completion.
    pub elapsed: Duration,
    pub vu: VuId,
    pub latency: Duration,
    pub outcome: CheckOutcome,
}

#[derive(Debug)]
pub enum ExecutorEvent {
    Iteration(IterationEvent),
    /// An arrival was due while all `max_vus` were busy.
    Dropped { elapsed: Duration },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorSummary {
    pub started: u64,
    pub dropped: u64,
    pub interrupted: u64,
    pub allocated_vus: u32,
    pub elapsed: Duration,
}

impl ExecutorSummary {
    /// Started iterations which ran to completion.
    pub fn completed(&self) -> u64 {
        self.started - self.interrupted
    }
}

/// Starts iterations at a fixed rate, regardless of how long they take,
/// growing the vu pool within its bounds as needed.
pub struct ConstantArrivalRate {
    scenario: ScenarioConfig,
}

enum Stop {
    Cancelled,
    GracefulStopElapsed,
    Drained,
}

impl ConstantArrivalRate {
    pub fn new(scenario: ScenarioConfig) -> Self {
        Self { scenario }
    }

    /// Run the scenario to completion (or cancellation).
    ///
    /// Events are sent for every finished iteration and every
    /// dropped arrival. All senders are dropped once this returns.
    pub async fn run<I, C>(
        self,
        cancelled: C,
        iteration: Arc<I>,
        event_tx: mpsc::Sender<ExecutorEvent>,
    ) -> ExecutorSummary
    where
        I: Iteration,
        C: Future,
    {
        let start = Instant::now();
        let deadline = start + self.scenario.duration();
        let max_vus = self.scenario.max_vus();

        let mut schedule =
            ArrivalSchedule::new(start, self.scenario.time_unit(), self.scenario.rate());

        let (idle_tx, mut idle_rx) = mpsc::unbounded_channel();
        let mut allocated_vus = self.scenario.pre_allocated_vus();
        for id in 1..=allocated_vus {
            let _ = idle_tx.send(VuId::new(id));
        }

        let mut summary = ExecutorSummary::default();
        let mut tasks = JoinSet::new();
        let mut cancelled = std::pin::pin!(cancelled);

        tracing::info!(
            rate = self.scenario.rate(),
            interval = ?self.scenario.arrival_interval(),
            duration = ?self.scenario.duration(),
            pre_allocated_vus = allocated_vus,
            max_vus,
            expected_iterations = self.scenario.expected_iterations(),
            "constant arrival rate executor started",
        );

        loop {
            if schedule.next_due() >= deadline {
                tracing::debug!("scenario duration elapsed: stop scheduling new iterations");
                break;
            }

            tokio::select! {
                _ = cancelled.as_mut() => {
                    tracing::warn!("exit executor early: guard shutdown");
                    summary.interrupted = interrupt(&mut tasks).await;
                    summary.allocated_vus = allocated_vus;
                    summary.elapsed = start.elapsed();
                    return summary;
                }
                _ = schedule.wait_next() => (),
            }

            // reap finished tasks
            while tasks.try_join_next().is_some() {}

            let vu = match idle_rx.try_recv() {
                Ok(vu) => vu,
                Err(_) if allocated_vus < max_vus => {
                    allocated_vus += 1;
                    tracing::debug!("all vus busy: allocate vu #{allocated_vus}");
                    VuId::new(allocated_vus)
                }
                Err(_) => {
                    summary.dropped += 1;
                    let elapsed = start.elapsed();
                    tracing::trace!("all {max_vus} vus busy: drop iteration at {elapsed:?}");
                    if let Err(err) = event_tx.try_send(ExecutorEvent::Dropped { elapsed }) {
                        tracing::debug!("failed to send dropped iteration msg: {err}");
                    }
                    continue;
                }
            };

            summary.started += 1;

            let iteration = iteration.clone();
            let idle_tx = idle_tx.clone();
            let event_tx = event_tx.clone();

            tasks.spawn(async move {
                let iteration_start = Instant::now();
                let outcome = iteration.iterate(vu).await;
                let ev = IterationEvent {
                    elapsed: start.elapsed(),
                    vu,
                    latency: iteration_start.elapsed(),
                    outcome,
                };
                // vu is available again before reporting,
                // a slow reporter must not cause dropped arrivals
                let _ = idle_tx.send(vu);
                if let Err(err) = event_tx.send(ExecutorEvent::Iteration(ev)).await {
                    tracing::debug!("failed to send iteration result msg: {err}");
                }
            });
        }

        let graceful_stop = self.scenario.graceful_stop();
        tracing::debug!(
            "wait up to {graceful_stop:?} for {} in-flight iteration(s)",
            tasks.len()
        );

        let stop = tokio::select! {
            _ = cancelled.as_mut() => Stop::Cancelled,
            _ = sleep(graceful_stop) => Stop::GracefulStopElapsed,
            _ = drain(&mut tasks) => Stop::Drained,
        };

        match stop {
            Stop::Drained => tracing::debug!("all in-flight iterations finished"),
            Stop::Cancelled => {
                tracing::warn!("graceful stop cut short: guard shutdown");
                summary.interrupted = interrupt(&mut tasks).await;
            }
            Stop::GracefulStopElapsed => {
                summary.interrupted = interrupt(&mut tasks).await;
                tracing::warn!(
                    "graceful stop of {graceful_stop:?} elapsed: interrupted {} iteration(s)",
                    summary.interrupted
                );
            }
        }

        summary.allocated_vus = allocated_vus;
        summary.elapsed = start.elapsed();
        summary
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while tasks.join_next().await.is_some() {}
}

/// Abort all in-flight iterations, returning how many there were.
async fn interrupt(tasks: &mut JoinSet<()>) -> u64 {
    while tasks.try_join_next().is_some() {}
    let count = tasks.len() as u64;
    tasks.abort_all();
    drain(tasks).await;
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    use rama::http::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use votebench_lib::{
        client::mock::{MockBehavior, MockVoteApi},
        config::RunParameters,
        vote::{FailureKind, VoteGenerator},
    };

    /// Iteration which takes a fixed amount of time,
    /// tracking how many run at the same time.
    #[derive(Debug, Default)]
    struct SleepIteration {
        duration: Duration,
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
    }

    impl SleepIteration {
        fn new(duration: Duration) -> Arc<Self> {
            Arc::new(Self {
                duration,
                ..Default::default()
            })
        }
    }

    impl Iteration for SleepIteration {
        async fn iterate(&self, _vu: VuId) -> CheckOutcome {
            let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(n, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            CheckOutcome::from_status(StatusCode::ACCEPTED)
        }
    }

    fn scenario(rate: u32, duration_ms: u64, pre: u32, max: u32) -> ScenarioConfig {
        ScenarioConfig::try_new(rate, Duration::from_millis(duration_ms), pre, max)
            .unwrap()
            .with_graceful_stop(Duration::from_secs(5))
    }

    async fn run_collect<I: Iteration>(
        scenario: ScenarioConfig,
        iteration: Arc<I>,
    ) -> (ExecutorSummary, Vec<ExecutorEvent>) {
        let (event_tx, mut event_rx) = mpsc::channel(1024);
        let collector = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(ev) = event_rx.recv().await {
                events.push(ev);
            }
            events
        });
        let summary = ConstantArrivalRate::new(scenario)
            .run(std::future::pending::<()>(), iteration, event_tx)
            .await;
        (summary, collector.await.unwrap())
    }

    fn iteration_outcomes(events: &[ExecutorEvent]) -> Vec<CheckOutcome> {
        events
            .iter()
            .filter_map(|ev| match ev {
                ExecutorEvent::Iteration(ev) => Some(ev.outcome),
                ExecutorEvent::Dropped { .. } => None,
            })
            .collect()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn starts_rate_times_duration_iterations() {
        let iteration = SleepIteration::new(Duration::from_millis(5));
        let (summary, events) = run_collect(scenario(10, 1_000, 2, 4), iteration.clone()).await;

        assert_eq!(summary.started, 10);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(summary.completed(), 10);
        assert_eq!(summary.allocated_vus, 2);
        assert_eq!(iteration_outcomes(&events).len(), 10);
        assert_eq!(iteration.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn rate_is_independent_of_iteration_latency() {
        // every iteration takes 5 arrival intervals
        let iteration = SleepIteration::new(Duration::from_millis(500));
        let (summary, events) = run_collect(scenario(10, 2_000, 1, 10), iteration.clone()).await;

        assert_eq!(summary.started, 20);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(iteration_outcomes(&events).len(), 20);
        // the pool grew from its single pre-allocated vu
        assert!(summary.allocated_vus > 1);
        assert!(summary.allocated_vus <= 10);
        assert!(iteration.max_in_flight.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn arrivals_are_dropped_when_all_vus_are_busy() {
        let iteration = SleepIteration::new(Duration::from_secs(10));
        let (summary, events) = run_collect(scenario(10, 1_000, 1, 2), iteration.clone()).await;

        assert_eq!(summary.started, 2);
        assert_eq!(summary.dropped, 8);
        assert_eq!(summary.allocated_vus, 2);
        assert_eq!(iteration.max_in_flight.load(Ordering::SeqCst), 2);

        let dropped = events
            .iter()
            .filter(|ev| matches!(ev, ExecutorEvent::Dropped { .. }))
            .count();
        assert_eq!(dropped, 8);

        // graceful stop (5s) is shorter than the iteration (10s)
        assert_eq!(summary.interrupted, 2);
        assert!(iteration_outcomes(&events).is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn in_flight_iterations_finish_within_graceful_stop() {
        let iteration = SleepIteration::new(Duration::from_secs(2));
        let (summary, events) = run_collect(scenario(2, 1_000, 2, 2), iteration).await;

        assert_eq!(summary.started, 2);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(iteration_outcomes(&events).len(), 2);
        assert!(summary.elapsed >= Duration::from_millis(2_500));
        assert!(summary.elapsed < Duration::from_secs(5));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn cancellation_stops_scheduling() {
        let iteration = SleepIteration::new(Duration::from_millis(1));
        let (event_tx, mut event_rx) = mpsc::channel(1024);
        let collector = tokio::spawn(async move {
            let mut count = 0;
            while event_rx.recv().await.is_some() {
                count += 1;
            }
            count
        });

        let summary = ConstantArrivalRate::new(scenario(10, 60_000, 1, 1))
            .run(sleep(Duration::from_millis(450)), iteration, event_tx)
            .await;

        // arrivals at 0, 100, 200, 300 and 400ms
        assert_eq!(summary.started, 5);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(collector.await.unwrap(), 5);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stalled_reporter_does_not_cause_dropped_arrivals() {
        let iteration = SleepIteration::new(Duration::from_millis(5));

        // capacity of 1 and never received from while running
        let (event_tx, event_rx) = mpsc::channel(1);
        let summary = ConstantArrivalRate::new(scenario(100, 1_000, 1, 2))
            .run(std::future::pending::<()>(), iteration.clone(), event_tx)
            .await;
        drop(event_rx);

        assert_eq!(summary.started, 100);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.allocated_vus, 1);
        assert_eq!(iteration.max_in_flight.load(Ordering::SeqCst), 1);
    }

    fn run_parameters() -> Arc<RunParameters> {
        Arc::new(
            RunParameters::try_new("http://localhost:8080", Some("abc123"), Some("p1,p2")).unwrap(),
        )
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn accepting_api_passes_all_checks() {
        let api = MockVoteApi::new(MockBehavior::Status(StatusCode::ACCEPTED));
        let generator = Arc::new(VoteGenerator::new(api.client(), run_parameters()));

        let (summary, events) = run_collect(scenario(20, 1_000, 5, 10), generator).await;
        let outcomes = iteration_outcomes(&events);

        assert_eq!(summary.started, 20);
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|outcome| outcome.passed));
        assert_eq!(api.call_count(), 20);
        for vote in api.received() {
            assert_eq!(vote.payload.paredao_id, "abc123");
            assert!(["p1", "p2"].contains(&vote.payload.participante_id.as_str()));
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failing_api_fails_all_checks_without_aborting() {
        let api = MockVoteApi::new(MockBehavior::Status(StatusCode::INTERNAL_SERVER_ERROR));
        let generator = Arc::new(VoteGenerator::new(api.client(), run_parameters()));

        let (summary, events) = run_collect(scenario(20, 1_000, 5, 10), generator).await;
        let outcomes = iteration_outcomes(&events);

        assert_eq!(summary.started, 20);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|outcome| !outcome.passed
            && outcome.status == Some(500)
            && outcome.failure == Some(FailureKind::HttpStatus)));
        // one attempt per arrival, no retries
        assert_eq!(api.call_count(), 20);
    }
}
