pub mod cli;
pub mod map;
pub mod positions;

use crate::cli::ConfigOverrides;
use crate::error::{ConfigError, InitializationError};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const ENV_VAR_PREFIX: &str = "VEHICLE_MAP__";
pub const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub refresher: RefresherConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub map: MapConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub csv_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("positions_log.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RefresherConfig {
    pub interval_seconds: u64,
    pub output_path: PathBuf,
    pub health_listen_addr: String,
}

impl RefresherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 20,
            output_path: PathBuf::from("vehicle_map.html"),
            health_listen_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MapConfig {
    pub zoom_start: u8,
    pub base_layers: Vec<TileLayerConfig>,
    pub marker: MarkerStyle,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: 12,
            base_layers: vec![
                TileLayerConfig {
                    name: "OpenStreetMap".to_string(),
                    url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                    attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
                    max_zoom: 19,
                },
                TileLayerConfig::google("Google Satellite", 's'),
                TileLayerConfig::google("Google Streets", 'm'),
                TileLayerConfig::google("Google Terrain", 'p'),
            ],
            marker: MarkerStyle::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TileLayerConfig {
    pub name: String,
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl TileLayerConfig {
    fn google(name: &str, layer: char) -> Self {
        Self {
            name: name.to_string(),
            url: format!("https://mt1.google.com/vt/lyrs={layer}&x={{x}}&y={{y}}&z={{z}}"),
            attribution: name.to_string(),
            max_zoom: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Font Awesome icon name, without the `fa-` prefix
    pub icon: String,
    pub color: String,
    pub icon_color: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            icon: "car".to_string(),
            color: "red".to_string(),
            icon_color: "white".to_string(),
        }
    }
}

impl Config {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.refresher.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "refresher.interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.map.base_layers.is_empty() {
            return Err(ConfigError::Invalid(
                "map.base_layers must contain at least one layer".to_string(),
            ));
        }
        if self.map.zoom_start > 20 {
            return Err(ConfigError::Invalid(format!(
                "map.zoom_start must be between 0 and 20, found {}",
                self.map.zoom_start
            )));
        }
        Ok(self)
    }
}

pub fn load_config(overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(SETTINGS_FILE))
        .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"));

    overrides.apply(figment).extract::<Config>()?.validate()
}

pub mod error {
    use thiserror::Error;
    use tracing::dispatcher::SetGlobalDefaultError;

    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("failed to load configuration: {0}")]
        Figment(#[from] figment::Error),
        #[error("invalid configuration: {0}")]
        Invalid(String),
    }

    #[derive(Debug, Error)]
    pub enum InitializationError {
        #[error(transparent)]
        Tracing(#[from] SetGlobalDefaultError),
        #[error(transparent)]
        Config(#[from] ConfigError),
    }
}

pub fn init_tracing() -> Result<(), InitializationError> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub async fn shutdown_listener(token: Option<CancellationToken>) {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(name: "signal.ctrlc.received", "received Ctrl+C signal, shutting down"),
        _ = terminate => info!(name: "signal.sigterm.received", "received SIGTERM signal, shutting down"),
    }

    if let Some(token) = token {
        token.cancel();
    }
}
