// src/main.rs

mod cli;
mod commands;

use alpaca::{Config, Context, Dispatcher, OperationRequest};
use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version print to stdout and succeed
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let filter = init_logging(cli::log_level(cli.verbose, cli.debug));

    match run(cli, filter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Install the stderr log subscriber
///
/// Returns a handle for raising the level once the configuration file is
/// read, or `None` when `RUST_LOG` pins the filter.
fn init_logging(level: &str) -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    (!pinned).then_some(handle)
}

fn run(cli: Cli, filter: Option<FilterHandle>) -> Result<()> {
    let request = OperationRequest::from_args(cli.args.as_slice())?;

    let mut config = if request.mode.reads_config() {
        commands::load_config(cli.config.as_deref())?
    } else {
        Config::default()
    };
    cli.apply_to(&mut config);

    if let Some(handle) = filter {
        let level = cli::log_level(config.general.verbose, config.general.debug);
        if let Err(e) = handle.modify(|f| *f = EnvFilter::new(level)) {
            debug!("Could not update log filter: {}", e);
        }
    }

    let dispatcher = Dispatcher::new(Context::from_config(&config));
    debug!("Sources roots: {:?}", dispatcher.context().sources_roots);

    commands::cmd_operation(&dispatcher, request)
}

/// Exit code for the first alpaca error in the chain
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<alpaca::Error>())
        .map(alpaca::Error::exit_code)
        .unwrap_or(1)
}
