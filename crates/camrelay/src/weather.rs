//! METAR pipeline: one API call, one formatted message.

use crate::config::{Settings, StationDescriptor};
use crate::http::{HttpClient, HttpError};
use crate::telegram::{Notifier, SinkError};
use serde::Deserialize;

/// A single METAR as returned by the aviation-weather API.
///
/// Only the fields the message needs are kept; the rest of the object is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherReport {
    #[serde(rename = "icaoId")]
    pub icao_id: String,
    #[serde(rename = "rawOb")]
    pub raw_ob: String,
}

/// Errors that abort a weather run.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("METAR request failed: {0}")]
    Fetch(#[from] HttpError),

    #[error("unexpected METAR payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("delivery failed: {0}")]
    Delivery(#[from] SinkError),
}

/// Result of one weather run.
#[derive(Debug)]
pub enum WeatherOutcome {
    /// Message delivered; lists the station codes it covered.
    Sent { stations: Vec<String> },
    /// The API returned no reports, nothing was sent.
    NoReports,
    Failed(WeatherError),
}

/// Join station codes into the `ids` query value.
pub fn station_query(stations: &[StationDescriptor]) -> String {
    stations
        .iter()
        .map(|s| s.code.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode the API response. The API answers an empty body when no station
/// has a current report.
pub fn parse_reports(body: &[u8]) -> Result<Vec<WeatherReport>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(body)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// One station block: bold header, monospace body.
pub fn format_report(report: &WeatherReport, settings: &Settings) -> String {
    format!(
        "<b>{} ({})</b>\n<pre>{}</pre>",
        escape_html(settings.station_name(&report.icao_id)),
        escape_html(&report.icao_id),
        escape_html(report.raw_ob.trim())
    )
}

/// Build the single message covering every report.
pub fn build_message(
    reports: &[WeatherReport],
    settings: &Settings,
    issued: chrono::DateTime<chrono::Utc>,
) -> String {
    let mut message = format!("<b>METAR {}</b>", issued.format("%Y-%m-%d %H:%M UTC"));
    for report in reports {
        message.push_str("\n\n");
        message.push_str(&format_report(report, settings));
    }
    message
}

/// Fetch all configured stations and send one text message.
///
/// An empty station list disables the pipeline: no request is made.
///
/// Never propagates an error: failures come back as
/// `WeatherOutcome::Failed` after being logged.
pub async fn run_weather<H, N>(settings: &Settings, http: &H, notifier: &N) -> WeatherOutcome
where
    H: HttpClient,
    N: Notifier,
{
    let outcome = match fetch_and_send(settings, http, notifier).await {
        Ok(Some(stations)) => WeatherOutcome::Sent { stations },
        Ok(None) => WeatherOutcome::NoReports,
        Err(e) => WeatherOutcome::Failed(e),
    };

    match &outcome {
        WeatherOutcome::Sent { stations } => {
            log::info!("[Weather] report sent for {}", stations.join(", "))
        }
        WeatherOutcome::NoReports if settings.stations.is_empty() => {
            log::info!("[Weather] no stations configured, skipping")
        }
        WeatherOutcome::NoReports => log::warn!("[Weather] no METAR reports returned"),
        WeatherOutcome::Failed(e) => log::error!("[Weather] {}", e),
    }
    outcome
}

async fn fetch_and_send<H, N>(
    settings: &Settings,
    http: &H,
    notifier: &N,
) -> Result<Option<Vec<String>>, WeatherError>
where
    H: HttpClient,
    N: Notifier,
{
    if settings.stations.is_empty() {
        return Ok(None);
    }

    let ids = station_query(&settings.stations);
    log::info!("[Weather] fetching METAR for {}", ids);

    let url = settings.weather.api_url.as_str();
    let body = http
        .get(url, &[("ids", ids.as_str()), ("format", "json")], settings.weather_timeout())
        .await?
        .into_success(url)?;

    let reports = parse_reports(&body)?;
    if reports.is_empty() {
        return Ok(None);
    }

    let message = build_message(&reports, settings, chrono::Utc::now());
    notifier.send_text(&message).await?;
    Ok(Some(reports.into_iter().map(|r| r.icao_id).collect()))
}
