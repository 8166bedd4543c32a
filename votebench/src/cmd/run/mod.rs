use std::{sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    rt::Executor,
    telemetry::tracing,
};

use clap::Args;
use tokio::sync::mpsc::{self, Receiver};
use votebench_lib::{
    client::{WebClientConfig, new_web_client},
    config::{ConfigError, RunParameters, ScenarioConfig, parse_duration},
    vote::VoteGenerator,
};

mod arrival;
pub mod executor;
pub mod reporter;

use self::{
    executor::{ConstantArrivalRate, ExecutorEvent},
    reporter::*,
};

#[derive(Debug, Clone, Args)]
/// generate votes at a constant arrival rate
pub struct RunCommand {
    /// iterations (votes) started per second
    #[arg(long, env = "RATE", value_name = "N", default_value_t = ScenarioConfig::DEFAULT_RATE)]
    rate: u32,

    /// how long new iterations are started (e.g. 30s, 5m)
    #[arg(
        long,
        env = "DURATION",
        value_name = "DURATION",
        default_value = "30s",
        value_parser = parse_duration
    )]
    duration: Duration,

    /// virtual users allocated before the run starts
    #[arg(
        long = "pre-vus",
        env = "PRE_VUS",
        value_name = "N",
        default_value_t = ScenarioConfig::DEFAULT_PRE_ALLOCATED_VUS
    )]
    pre_vus: u32,

    /// upper bound of virtual users, arrivals beyond it are dropped
    #[arg(
        long = "max-vus",
        env = "MAX_VUS",
        value_name = "N",
        default_value_t = ScenarioConfig::DEFAULT_MAX_VUS
    )]
    max_vus: u32,

    /// base url of the voting api, votes are posted to {API_BASE}/votos
    #[arg(
        long,
        env = "API_BASE",
        value_name = "URL",
        default_value = RunParameters::DEFAULT_API_BASE
    )]
    api_base: String,

    /// paredao voted on (required)
    #[arg(long, env = "PAREDAO_ID", value_name = "ID")]
    paredao_id: Option<String>,

    /// comma separated participante ids, at least 2 (required)
    #[arg(long, env = "PARTICIPANTE_IDS", value_name = "ID,ID,...")]
    participante_ids: Option<String>,

    /// pause after each vote before its virtual user is available again (0 = none)
    #[arg(
        long,
        env = "THINK_TIME",
        value_name = "DURATION",
        default_value = "1ms",
        value_parser = parse_duration
    )]
    think_time: Duration,

    /// how long in-flight votes may finish once the duration elapsed
    #[arg(
        long,
        env = "GRACEFUL_STOP",
        value_name = "DURATION",
        default_value = "30s",
        value_parser = parse_duration
    )]
    graceful_stop: Duration,

    /// timeout of a single vote request
    #[arg(
        long,
        env = "REQUEST_TIMEOUT",
        value_name = "DURATION",
        default_value = "60s",
        value_parser = parse_duration
    )]
    request_timeout: Duration,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    /// also report every single vote (only used with --json)
    #[arg(long, default_value_t = false)]
    events: bool,
}

/// Validated [`RunCommand`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    scenario: ScenarioConfig,
    params: RunParameters,
    think_time: Duration,
    request_timeout: Duration,
    json: bool,
    events: bool,
}

impl RunCommand {
    pub fn try_into_config(self) -> Result<RunConfig, ConfigError> {
        let params = RunParameters::try_new(
            &self.api_base,
            self.paredao_id.as_deref(),
            self.participante_ids.as_deref(),
        )?;

        let scenario =
            ScenarioConfig::try_new(self.rate, self.duration, self.pre_vus, self.max_vus)?
                .with_graceful_stop(self.graceful_stop);

        Ok(RunConfig {
            scenario,
            params,
            think_time: self.think_time,
            request_timeout: self.request_timeout,
            json: self.json,
            events: self.events,
        })
    }
}

pub async fn exec(guard: ShutdownGuard, cfg: RunConfig) -> Result<(), BoxError> {
    let RunConfig {
        scenario,
        params,
        think_time,
        request_timeout,
        json,
        events,
    } = cfg;

    tracing::info!(
        vote_uri = %params.vote_uri(),
        paredao_id = params.paredao_id(),
        participantes = params.participante_ids().len(),
        ?think_time,
        ?request_timeout,
        graceful_stop = ?scenario.graceful_stop(),
        "run parameters ready",
    );

    let client = new_web_client(
        Executor::graceful(guard.clone()),
        WebClientConfig { request_timeout },
    )
    .context("create vote web client")?;

    let generator =
        Arc::new(VoteGenerator::new(client, Arc::new(params)).with_think_time(think_time));

    const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    let reporter: Box<dyn Reporter> = if json {
        Box::new(JsonlReporter::new(REPORT_INTERVAL, events))
    } else {
        Box::new(HumanReporter::new(REPORT_INTERVAL))
    };

    let (event_tx, event_rx) = mpsc::channel(scenario.max_vus() as usize * 8);
    let executor = ConstantArrivalRate::new(scenario);

    let (summary, mut reporter) = tokio::join!(
        executor.run(guard.downgrade().into_cancelled(), generator, event_tx),
        report_worker(reporter, event_rx),
    );

    reporter.finish(&summary);

    tracing::info!(
        started = summary.started,
        dropped = summary.dropped,
        interrupted = summary.interrupted,
        allocated_vus = summary.allocated_vus,
        "run finished",
    );

    Ok(())
}

/// Feeds executor events into the reporter until all senders are gone,
/// handing the reporter back for the final summary.
async fn report_worker(
    mut reporter: Box<dyn Reporter>,
    mut event_rx: Receiver<ExecutorEvent>,
) -> Box<dyn Reporter> {
    while let Some(ev) = event_rx.recv().await {
        let now = match ev {
            ExecutorEvent::Iteration(ev) => {
                reporter.on_iteration(&ev);
                ev.elapsed
            }
            ExecutorEvent::Dropped { elapsed } => {
                reporter.on_dropped(elapsed);
                elapsed
            }
        };
        reporter.on_tick(now);
    }

    tracing::debug!("exit report worker: event senders closed");
    reporter
}
