#![cfg_attr(
    not(test),
    warn(clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful,
    telemetry::tracing,
};

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use votebench_lib::utils;

pub mod cmd;
pub mod config;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring votebench behavior.
#[derive(Debug, Clone, Parser)]
#[command(name = "votebench")]
#[command(bin_name = "votebench")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    cmds: CliCommands,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false, global = true)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// directory in which data will be stored on the filesystem
    #[arg(long, default_value = ".votebench", global = true)]
    pub data: PathBuf,

    #[arg(long, value_name = "SECONDS", default_value_t = 0., global = true)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[cfg(target_family = "unix")]
    /// Set the limit of max open file descriptors for this process and its children.
    #[arg(long, value_name = "N", default_value_t = 262_144, global = true)]
    pub ulimit: utils::os::rlim_t,
}

#[derive(Debug, Clone, Subcommand)]
#[allow(clippy::large_enum_variant)]
enum CliCommands {
    Run(self::cmd::run::RunCommand),
    Mock(self::cmd::mock::MockCommand),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    #[cfg(target_family = "unix")]
    utils::os::raise_nofile(args.ulimit).context("set file descriptor limit")?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// run a votebench cmd with the given args
///
/// Configuration is validated before any task is spawned,
/// so that invalid input never results in generated load.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let cmd = match args.cmds {
        CliCommands::Run(run_args) => PreparedCommand::Run(
            run_args
                .try_into_config()
                .context("validate run configuration")?,
        ),
        CliCommands::Mock(mock_args) => PreparedCommand::Mock(mock_args),
    };

    let fatal_error: Arc<Mutex<Option<BoxError>>> = Default::default();

    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_error.clone(),
        base_shutdown_signal,
    ));

    let data = args.data;
    graceful.spawn_task_fn(async move |guard| {
        let result = match cmd {
            PreparedCommand::Run(run_cfg) => self::cmd::run::exec(guard, run_cfg).await,
            PreparedCommand::Mock(mock_args) => {
                self::cmd::mock::exec(data, guard, mock_args).await
            }
        };
        if let Err(err) = result {
            let _ = error_tx.send(err);
        }
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    match fatal_error.lock().take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

enum PreparedCommand {
    Run(self::cmd::run::RunConfig),
    Mock(self::cmd::mock::MockCommand),
}

fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<BoxError>,
    fatal_error: Arc<Mutex<Option<BoxError>>>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                        *fatal_error.lock() = Some(err);
                    },
                    Err(_) => {
                        tracing::debug!("command is finished without error, return control");
                    },
                }
            }
        }
    }
}
