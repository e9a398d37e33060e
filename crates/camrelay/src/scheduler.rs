//! Cycle driver.
//!
//! A cycle runs the camera pipeline and then the weather pipeline. In
//! `Forever` mode cycles repeat with a fixed pause in between: no drift
//! correction, no jitter. All waiting goes through `Sleeper` so tests can
//! run cycles without real time passing.

use crate::camera::{run_cameras, CameraResult};
use crate::config::Settings;
use crate::http::HttpClient;
use crate::telegram::Notifier;
use crate::weather::{run_weather, WeatherOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Something that can wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Run both pipelines once or keep cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Once,
    Forever,
}

/// What happened during one cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub cameras: Vec<CameraResult>,
    pub weather: WeatherOutcome,
}

impl CycleReport {
    pub fn photos_sent(&self) -> usize {
        self.cameras.iter().filter(|c| c.outcome.is_sent()).count()
    }
}

/// Run the camera pipeline, then the weather pipeline.
///
/// The two are independent: a failing camera pipeline never prevents the
/// weather run and vice versa.
pub async fn run_cycle<H, N, S>(
    settings: &Settings,
    http: &H,
    notifier: &N,
    sleeper: &S,
) -> CycleReport
where
    H: HttpClient,
    N: Notifier,
    S: Sleeper,
{
    let started = chrono::Utc::now();
    log::info!("[Scheduler] cycle started at {}", started.to_rfc3339());

    let cameras = run_cameras(settings, http, notifier, sleeper).await;
    let weather = run_weather(settings, http, notifier).await;

    let report = CycleReport { cameras, weather };
    log::info!(
        "[Scheduler] cycle finished: {}/{} photos sent",
        report.photos_sent(),
        report.cameras.len()
    );
    report
}

/// Cycle until the shutdown signal fires.
///
/// Returns the number of completed cycles.
pub async fn run_forever<H, N, S>(
    settings: &Settings,
    http: &H,
    notifier: &N,
    sleeper: &S,
    mut shutdown: watch::Receiver<()>,
) -> u64
where
    H: HttpClient,
    N: Notifier,
    S: Sleeper,
{
    let interval = settings.cycle_interval();
    let mut cycles = 0;

    loop {
        // A closed channel means nobody can signal us any more; treat it
        // like a shutdown.
        if shutdown.has_changed().unwrap_or(true) {
            log::info!("[Scheduler] shutdown signal received, exiting");
            break;
        }

        run_cycle(settings, http, notifier, sleeper).await;
        cycles += 1;

        log::info!(
            "[Scheduler] cycle {} complete, next in {}s",
            cycles,
            interval.as_secs()
        );
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                log::info!("[Scheduler] shutdown signal received, exiting");
                break;
            }
            _ = sleeper.sleep(interval) => {}
        }
    }
    cycles
}
