//! Relays public webcam snapshots and METAR reports to a Telegram chat.
//!
//! Two independent pipelines share one sink:
//! - [`camera`]: scrape each webcam page for its `<img>`, fetch the image,
//!   send it as a photo
//! - [`weather`]: fetch METARs for every station, send them as one message
//!
//! [`scheduler`] runs them once or on a fixed interval; [`app`] checks the
//! Telegram credentials before anything touches the network.

pub mod app;
pub mod camera;
pub mod config;
pub mod http;
pub mod scheduler;
pub mod telegram;
pub mod weather;

pub use app::{run, RunStatus};
pub use config::{ConfigError, Credentials, Settings};
pub use http::{HttpClient, ReqwestClient};
pub use scheduler::{Mode, Sleeper, TokioSleeper};
pub use telegram::{Notifier, TelegramNotifier};
