//! camrelay - webcam snapshots and METAR reports to Telegram
//!
//! Usage:
//!   camrelay                     # cycle forever, once per hour
//!   camrelay --once              # run both pipelines once and exit
//!   camrelay -c my.yaml          # use a custom camera/station list
//!   camrelay --dump-config       # print the effective configuration

use anyhow::Context;
use argh::FromArgs;
use camrelay::config::default_config_path;
use camrelay::{Mode, ReqwestClient, RunStatus, Settings, TokioSleeper};

/// Relay public webcam snapshots and METAR reports to a Telegram chat
#[derive(FromArgs)]
struct Args {
    /// path to the YAML configuration file (default: ~/.camrelay/config.yaml,
    /// built-in cameras and stations when absent)
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// run both pipelines once and exit
    #[argh(switch)]
    once: bool,

    /// print the effective configuration as YAML and exit
    #[argh(switch)]
    dump_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load config from '{}'", path))?,
        None => Settings::load_or_default(default_config_path())
            .context("failed to load default config")?,
    };
    settings.validate().context("invalid configuration")?;

    if args.dump_config {
        print!("{}", settings.to_yaml()?);
        return Ok(());
    }

    let mode = if args.once { Mode::Once } else { Mode::Forever };
    log::info!("Starting camrelay v{} ({:?})", env!("CARGO_PKG_VERSION"), mode);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    // Set up Ctrl+C handler. A single run keeps the default SIGINT
    // behaviour; the loop stops at the next cycle boundary.
    if mode == Mode::Forever {
        ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, stopping after the current cycle...");
            let _ = shutdown_tx.send(());
        })
        .context("failed to set Ctrl+C handler")?;
    }

    let http = ReqwestClient::new()?;
    let status = camrelay::run(
        &settings,
        |name| std::env::var(name).ok(),
        &http,
        &TokioSleeper,
        mode,
        shutdown_rx,
    )
    .await;

    match status {
        RunStatus::MissingCredentials => log::warn!("Exiting without sending anything"),
        RunStatus::Completed { cycles } => log::info!("camrelay stopped after {} cycle(s)", cycles),
    }
    Ok(())
}
