//! tweetrelay CLI
//!
//! Runs a single pass (`--once`, the default) or keeps polling (`--daemon`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tweetrelay::{
    error::Result,
    models::Config,
    pipeline::{self, SyncEngine},
    services::{Channel, Dispatcher, MirrorSelector, Translator},
    storage::LocalStorage,
    utils::http,
};

/// tweetrelay - relay new posts from Nitter mirrors to WeCom or ServerChan
#[derive(Parser, Debug)]
#[command(name = "tweetrelay", version, about = "Relay new posts to WeChat")]
struct Cli {
    /// Path to the configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run one pass and exit (default)
    #[arg(long)]
    once: bool,

    /// Keep running, one pass every interval
    #[arg(long)]
    daemon: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load and validate configuration.
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Wire the engine from configuration.
fn build_engine(config: &Config) -> Result<SyncEngine> {
    let client = http::create_client(&config.http)?;
    let channel = Channel::from_config(&config.push)?;
    let translator = Translator::from_config(&config.translation)?;

    let fetcher = MirrorSelector::new(client.clone(), config.mirrors.clone());
    let notifier = Dispatcher::new(client, channel, translator, &config.push.link_template);
    let store = LocalStorage::new(&config.state_file);

    Ok(
        SyncEngine::new(Arc::new(fetcher), Arc::new(notifier), Arc::new(store))
            .with_first_run(config.first_run)
            .with_max_concurrent(config.max_concurrent),
    )
}

/// Run the command and map the outcome to a process exit code.
async fn run(cli: Cli) -> ExitCode {
    if cli.once && cli.daemon {
        log::error!("Use either --once or --daemon, not both.");
        return ExitCode::from(2);
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!(
                "Config not found or invalid at {}: {}",
                cli.config.display(),
                e
            );
            return ExitCode::from(1);
        }
    };

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Cannot start: {}", e);
            return ExitCode::from(1);
        }
    };

    let accounts = config.unique_accounts();
    log::info!(
        "Tracking {} accounts across {} mirrors",
        accounts.len(),
        config.mirrors.len()
    );

    let mut state = engine.load_state().await;

    if cli.daemon {
        let shutdown = pipeline::shutdown_signal();
        let interval = pipeline::pass_interval(config.interval_secs);
        pipeline::run_daemon(&engine, &accounts, &mut state, interval, shutdown).await;
    } else {
        engine.run_pass(&accounts, &mut state).await;
    }

    ExitCode::SUCCESS
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}
