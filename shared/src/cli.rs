use clap::Args;
use figment::Figment;
use figment::providers::Serialized;
use std::path::PathBuf;

/// Values that take precedence over `Settings.toml` and the environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub csv_path: Option<PathBuf>,
    pub interval_seconds: Option<u64>,
    pub output_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    pub(crate) fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(path) = &self.csv_path {
            figment = figment.merge(Serialized::default("source.csv_path", path));
        }
        if let Some(seconds) = self.interval_seconds {
            figment = figment.merge(Serialized::default("refresher.interval_seconds", seconds));
        }
        if let Some(path) = &self.output_path {
            figment = figment.merge(Serialized::default("refresher.output_path", path));
        }
        if let Some(host) = &self.host {
            figment = figment.merge(Serialized::default("server.host", host));
        }
        if let Some(port) = self.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }
        figment
    }
}

/// Command-line flags of the map refresher.
#[derive(Debug, Default, Clone, Args)]
pub struct RefresherArgs {
    /// CSV file containing the vehicle position log
    #[arg(long = "csv", value_name = "PATH")]
    pub csv_path: Option<PathBuf>,

    /// Seconds between map refreshes
    #[arg(long = "interval", value_name = "SECONDS")]
    pub interval_seconds: Option<u64>,

    /// Where the refreshed map document is written
    #[arg(long = "output", value_name = "PATH")]
    pub output_path: Option<PathBuf>,
}

impl From<&RefresherArgs> for ConfigOverrides {
    fn from(args: &RefresherArgs) -> Self {
        Self {
            csv_path: args.csv_path.clone(),
            interval_seconds: args.interval_seconds,
            output_path: args.output_path.clone(),
            ..Self::default()
        }
    }
}

/// Command-line flags of the web server.
#[derive(Debug, Default, Clone, Args)]
pub struct ServerArgs {
    /// CSV file containing the vehicle position log
    #[arg(long = "csv", value_name = "PATH")]
    pub csv_path: Option<PathBuf>,

    /// Address the web server binds to
    #[arg(long)]
    pub host: Option<String>,

    /// Port the web server listens on
    #[arg(long)]
    pub port: Option<u16>,
}

impl From<&ServerArgs> for ConfigOverrides {
    fn from(args: &ServerArgs) -> Self {
        Self {
            csv_path: args.csv_path.clone(),
            host: args.host.clone(),
            port: args.port,
            ..Self::default()
        }
    }
}
