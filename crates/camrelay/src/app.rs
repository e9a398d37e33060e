//! Startup precondition and hand-off to the scheduler.

use crate::config::{Credentials, Settings};
use crate::http::HttpClient;
use crate::scheduler::{run_cycle, run_forever, Mode, Sleeper};
use crate::telegram::TelegramNotifier;
use tokio::sync::watch;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Credentials were missing; no network call was made.
    MissingCredentials,
    /// Completed this many cycles.
    Completed { cycles: u64 },
}

/// Check credentials once, then run the pipelines.
///
/// `lookup` resolves environment variables. Missing credentials are logged
/// and short-circuit the run before `http` is ever touched.
pub async fn run<F, H, S>(
    settings: &Settings,
    lookup: F,
    http: &H,
    sleeper: &S,
    mode: Mode,
    shutdown: watch::Receiver<()>,
) -> RunStatus
where
    F: Fn(&str) -> Option<String>,
    H: HttpClient,
    S: Sleeper,
{
    let credentials = match Credentials::from_lookup(lookup) {
        Ok(c) => c,
        Err(e) => {
            log::error!(
                "{}; set TELEGRAM_TOKEN and TELEGRAM_CHAT_ID. Nothing will be sent.",
                e
            );
            return RunStatus::MissingCredentials;
        }
    };

    log::info!(
        "Relaying {} cameras and {} METAR stations to chat {}",
        settings.cameras.len(),
        settings.stations.len(),
        credentials.chat_id
    );

    let notifier = TelegramNotifier::new(http, settings, credentials);
    let cycles = match mode {
        Mode::Once => {
            run_cycle(settings, http, &notifier, sleeper).await;
            1
        }
        Mode::Forever => run_forever(settings, http, &notifier, sleeper, shutdown).await,
    };
    RunStatus::Completed { cycles }
}
