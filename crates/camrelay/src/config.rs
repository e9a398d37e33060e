//! Relay configuration.
//!
//! `Settings` is loaded once at startup (YAML file or built-in defaults) and
//! passed by reference into every pipeline. Secrets never live in the file:
//! the Telegram bot token and chat id come from the environment.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Telegram bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";

/// Environment variable holding the destination chat id.
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

const OVSICORI: &str = "https://www.ovsicori.una.ac.cr";
const OVSICORI_CAMERAS: &str =
    "https://www.ovsicori.una.ac.cr/index.php/vulcanologia/camara-volcanes-2";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// One webcam page to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Display name, also used as the photo caption.
    pub name: String,
    /// Page holding the `<img>` tag.
    pub page_url: String,
    /// Base for relative image sources. Defaults to `page_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// `id` attribute of the `<img>` element.
    pub image_id: String,
}

impl CameraDescriptor {
    pub fn new(name: &str, page_url: &str, base_url: Option<&str>, image_id: &str) -> Self {
        Self {
            name: name.to_string(),
            page_url: page_url.to_string(),
            base_url: base_url.map(str::to_string),
            image_id: image_id.to_string(),
        }
    }

    /// URL relative image sources are resolved against.
    pub fn resolve_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.page_url)
    }
}

/// A METAR reporting station and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDescriptor {
    /// 4-character ICAO code, e.g. `MROC`.
    pub code: String,
    pub name: String,
}

impl StationDescriptor {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Timeout for both the page and the image request.
    pub page_timeout_secs: u64,
    /// Pause after each delivered camera.
    pub throttle_secs: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            page_timeout_secs: 15,
            throttle_secs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_url: "https://aviationweather.gov/api/data/metar".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot API root, without the `/bot<token>` suffix.
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Pause between two full cycles.
    pub interval_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

/// Root configuration. Every section is optional in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cameras: Vec<CameraDescriptor>,
    pub stations: Vec<StationDescriptor>,
    pub camera: CameraSettings,
    pub weather: WeatherSettings,
    pub telegram: TelegramSettings,
    pub schedule: ScheduleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cameras: default_cameras(),
            stations: default_stations(),
            camera: CameraSettings::default(),
            weather: WeatherSettings::default(),
            telegram: TelegramSettings::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}

impl Settings {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from `path`, or fall back to the built-in defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("Config file not found, using defaults: {}", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Serialize the effective configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check descriptor fields, timeouts and the cycle interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for cam in &self.cameras {
            validate_camera(cam).map_err(ConfigError::Invalid)?;
        }

        let mut seen = HashSet::new();
        for station in &self.stations {
            validate_station_code(&station.code).map_err(ConfigError::Invalid)?;
            if station.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "station '{}' has an empty name",
                    station.code
                )));
            }
            if !seen.insert(station.code.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate station code '{}'",
                    station.code
                )));
            }
        }

        validate_url("weather.api_url", &self.weather.api_url).map_err(ConfigError::Invalid)?;
        validate_url("telegram.api_base", &self.telegram.api_base)
            .map_err(ConfigError::Invalid)?;

        let timeouts = [
            ("camera.page_timeout_secs", self.camera.page_timeout_secs),
            ("weather.timeout_secs", self.weather.timeout_secs),
            ("telegram.timeout_secs", self.telegram.timeout_secs),
            ("schedule.interval_secs", self.schedule.interval_secs),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", field)));
            }
        }
        Ok(())
    }

    /// Display name for a station code, falling back to the code itself.
    pub fn station_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.stations
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
            .map(|s| s.name.as_str())
            .unwrap_or(code)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.camera.page_timeout_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.camera.throttle_secs)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_secs)
    }

    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.timeout_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }
}

fn validate_camera(cam: &CameraDescriptor) -> Result<(), String> {
    if cam.name.trim().is_empty() {
        return Err(format!("camera with page '{}' has an empty name", cam.page_url));
    }
    if cam.image_id.trim().is_empty() {
        return Err(format!("camera '{}' has an empty image_id", cam.name));
    }
    validate_url(&format!("camera '{}' page_url", cam.name), &cam.page_url)?;
    if let Some(base) = &cam.base_url {
        validate_url(&format!("camera '{}' base_url", cam.name), base)?;
    }
    Ok(())
}

/// A station code is exactly 4 ASCII alphanumerics.
pub fn validate_station_code(code: &str) -> Result<(), String> {
    if code.len() != 4 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!(
            "station code must be 4 alphanumeric characters, got '{}'",
            code
        ));
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is empty", field));
    }
    Url::parse(value).map_err(|e| format!("{} '{}' is not a valid URL: {}", field, value, e))?;
    Ok(())
}

/// Default config location: `~/.camrelay/config.yaml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".camrelay")
        .join("config.yaml")
}

/// Telegram credentials, resolved once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Credentials {
    /// Read `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };
        Ok(Self {
            bot_token: read(TOKEN_ENV)?,
            chat_id: read(CHAT_ID_ENV)?,
        })
    }
}

fn ovsicori(name: &str, slug: &str) -> CameraDescriptor {
    CameraDescriptor::new(
        name,
        &format!("{}/{}", OVSICORI_CAMERAS, slug),
        Some(OVSICORI),
        "camara",
    )
}

/// Built-in webcam list.
pub fn default_cameras() -> Vec<CameraDescriptor> {
    vec![
        CameraDescriptor::new("Cartago", "https://cartagoenvivo.com/", None, "liveImage"),
        ovsicori("Volcan Turrialba", "camara-v-turrialba"),
        ovsicori("Volcan Irazu", "camara-2-v-turrialba"),
        ovsicori("Poas Crater", "camara-crater-v-poas"),
        ovsicori("Poas SO del Crater", "camara-v-poas-so-del-crater"),
        ovsicori("Poas Chahuites", "camara-v-poas-chahuites"),
        ovsicori("Rincon de la Vieja Sensoria", "rincon-de-la-vieja-sensoria2"),
        ovsicori(
            "Rincon de la Vieja Curubande",
            "camara-v-rincon-de-la-vieja-curubande",
        ),
        ovsicori("Rincon de la Vieja Gavilan", "rincon-de-la-vieja-gavilan"),
        CameraDescriptor::new(
            "Reserva Karen Mogensen",
            "https://www.forestepersempre.org/fps/progetti/CostaRica/webcam/Karen-webcam.html",
            Some("https://www.forestepersempre.org"),
            "webcam",
        ),
    ]
}

/// Built-in METAR stations.
pub fn default_stations() -> Vec<StationDescriptor> {
    vec![
        StationDescriptor::new("MROC", "Juan Santamaría"),
        StationDescriptor::new("MRLB", "Daniel Oduber"),
        StationDescriptor::new("MRPV", "Tobías Bolaños"),
        StationDescriptor::new("MRLM", "Limón"),
    ]
}
