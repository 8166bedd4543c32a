use std::{collections::BTreeMap, convert::Infallible, path::PathBuf, sync::Arc, time::Duration};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue, Request, Response, StatusCode,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
        service::web::{
            Router,
            extract::{Json, State},
            response::IntoResponse,
        },
    },
    layer::TimeoutLayer,
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use clap::Args;
use parking_lot::Mutex;
use serde_json::json;
use votebench_lib::{utils, vote::VotePayload};

use crate::config::{Scenario, ServerConfig};

#[derive(Debug, Clone, Args)]
/// run a mock voting api
pub struct MockCommand {
    #[clap(flatten)]
    config: Option<ServerConfig>,

    #[arg(long)]
    /// Scenario to run,
    /// manually defined parameters overwrite scenario parameters.
    scenario: Option<Scenario>,

    /// network interface to bind to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:8080"
    )]
    pub bind: Interface,
}

pub async fn exec(data: PathBuf, guard: ShutdownGuard, args: MockCommand) -> Result<(), BoxError> {
    tokio::fs::create_dir_all(&data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || data.clone())?;

    let merged_cfg = merge_server_cfg(args.scenario, args.config);
    let server = MockVoteServer::try_new(merged_cfg).context("create mock voting api")?;

    let exec = Executor::graceful(guard);
    let tcp_listener = TcpListener::bind(args.bind, exec.clone())
        .await
        .context("bind mock voting api http server")?;

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::server_identifier())),
    )
        .into_layer(mock_vote_svc(Arc::new(server)));

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));
    let tcp_svc = TimeoutLayer::new(Duration::from_secs(60)).into_layer(http_server);

    let server_addr = tcp_listener
        .local_addr()
        .context("get bound address for mock voting api http server")?;

    tracing::info!("mock voting api bound to: {server_addr}");
    write_server_socket_address_as_file(&data, "votebench.mock", server_addr.into()).await?;

    tcp_listener.serve(tcp_svc).await;

    Ok(())
}

async fn write_server_socket_address_as_file(
    dir: &std::path::Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}

fn mock_vote_svc(
    server: Arc<MockVoteServer>,
) -> impl Service<Request, Output = Response, Error = Infallible> + Clone {
    Arc::new(
        Router::new_with_state(server)
            .with_get("/healthz", "ok")
            .with_post("/votos", register_vote)
            .with_get("/votos/counter", vote_counter),
    )
}

async fn register_vote(
    State(server): State<Arc<MockVoteServer>>,
    Json(vote): Json<VotePayload>,
) -> Response {
    server.register_vote(vote).await
}

async fn vote_counter(State(server): State<Arc<MockVoteServer>>) -> impl IntoResponse {
    Json(server.counter())
}

/// Accepted votes per paredao, per participante.
type VoteCounter = BTreeMap<String, BTreeMap<String, u64>>;

#[derive(Debug)]
struct MockVoteServer {
    base_latency: f64,
    jitter: f64,
    error_rate: f32,
    reject_rate: f32,
    accept_status: StatusCode,
    votes: Mutex<VoteCounter>,
}

impl MockVoteServer {
    /// Upper bound for both the base latency and the jitter.
    const MAX_LATENCY_SECS: f64 = 3600.;

    fn try_new(cfg: ServerConfig) -> Result<Self, BoxError> {
        let base_latency = cfg.base_latency.unwrap_or_default();
        let jitter = cfg.jitter.unwrap_or_default();
        let error_rate = cfg.error_rate.unwrap_or_default();
        let reject_rate = cfg.reject_rate.unwrap_or_default();

        for (name, value) in [("base_latency", base_latency), ("jitter", jitter)] {
            if !value.is_finite() || value > Self::MAX_LATENCY_SECS {
                return Err(BoxError::from(format!(
                    "{name} must be a finite number of seconds <= {}, got {value}",
                    Self::MAX_LATENCY_SECS
                )));
            }
        }

        let sum = error_rate + reject_rate;
        if sum > 1. {
            return Err(BoxError::from("error_rate + reject_rate must be <= 1.0"));
        }

        let accept_status = StatusCode::from_u16(cfg.accept_status.unwrap_or(202))
            .context("parse accept status")?;

        Ok(Self {
            base_latency,
            jitter,
            error_rate,
            reject_rate,
            accept_status,
            votes: Default::default(),
        })
    }

    #[inline(always)]
    fn clamp_rate(v: f32) -> f32 {
        v.clamp(0., 1.0)
    }

    fn pick_outcome(&self) -> MockOutcome {
        let error_rate = Self::clamp_rate(self.error_rate);
        let reject_rate = Self::clamp_rate(self.reject_rate);

        let r: f32 = rand::random();

        let t_error = error_rate;
        let t_reject = t_error + reject_rate;

        if r < t_error {
            MockOutcome::Error
        } else if r < t_reject {
            MockOutcome::Reject
        } else {
            MockOutcome::Accept
        }
    }

    fn compute_delay(&self) -> Duration {
        let base = self.base_latency.max(0.0);
        let jitter = self.jitter.max(0.0);

        if jitter == 0.0 {
            return Duration::from_secs_f64(base);
        }

        let span = jitter * 2.0;
        let u: f64 = rand::random();
        let delta = (u * span) - jitter;

        let secs = (base + delta).max(0.0);
        Duration::from_secs_f64(secs)
    }

    async fn register_vote(&self, vote: VotePayload) -> Response {
        let delay = self.compute_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if vote.paredao_id.is_empty() || vote.participante_id.is_empty() {
            tracing::debug!("reject vote with empty paredao or participante id");
            return error_response(StatusCode::BAD_REQUEST, "paredao invalido");
        }

        match self.pick_outcome() {
            MockOutcome::Error => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "erro interno simulado")
            }
            MockOutcome::Reject => {
                error_response(StatusCode::TOO_MANY_REQUESTS, "limite de votos excedido")
            }
            MockOutcome::Accept => {
                *self
                    .votes
                    .lock()
                    .entry(vote.paredao_id)
                    .or_default()
                    .entry(vote.participante_id)
                    .or_default() += 1;
                (self.accept_status, Json(json!({"status": "recebido"}))).into_response()
            }
        }
    }

    fn counter(&self) -> VoteCounter {
        self.votes.lock().clone()
    }
}

fn error_response(status: StatusCode, msg: &'static str) -> Response {
    (status, Json(json!({"erro": msg}))).into_response()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockOutcome {
    Error,
    Reject,
    Accept,
}

fn merge_server_cfg(scenario: Option<Scenario>, config: Option<ServerConfig>) -> ServerConfig {
    let scenario_cfg = scenario
        .map(|s| {
            tracing::info!("use scenario to define base config: {s:?}");
            s.server_config()
        })
        .unwrap_or_else(|| {
            tracing::info!("no scenario defined, use default as base config");
            Default::default()
        });

    let overwrite_cfg = config.unwrap_or_default();

    macro_rules! merge_config {
        ($scenario:ident, $overwrite:ident, {$($property:ident),+ $(,)?}) => {
            ServerConfig {
                $(
                    $property: if let Some(value) = $overwrite.$property {
                        tracing::info!("property '{}': use overwrite: {value}", stringify!($property));
                        Some(value)
                    } else if let Some(value) = $scenario.$property {
                        tracing::info!("property '{}': use scenario: {value}", stringify!($property));
                        Some(value)
                    } else {
                        tracing::info!("property '{}': undefined", stringify!($property));
                        None
                    },
                )+
            }
        };
    }

    merge_config!(
        scenario_cfg, overwrite_cfg,
        {
            base_latency,
            jitter,
            error_rate,
            reject_rate,
            accept_status,
        }
    )
}
