pub mod chat;
pub mod config;

use clap::{Parser, Subcommand};

use wf_domain::config::Config;

#[derive(Parser)]
#[command(name = "wayfinder", about = "Conversational commute assistant gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server (the default when no subcommand is given).
    Serve,
    /// Interactive chat against a running gateway.
    Chat {
        /// Gateway base URL; defaults to the configured host/port.
        #[arg(long)]
        url: Option<String>,
        /// User identity to converse as.
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Configuration helpers.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version.
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file and report issues.
    Validate,
    /// Print the effective configuration.
    Show,
}

/// Load the TOML config.
///
/// The path comes from `WAYFINDER_CONFIG` or defaults to `config.toml` in
/// the working directory.  A missing file yields the built-in defaults.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let path =
        std::env::var("WAYFINDER_CONFIG").unwrap_or_else(|_| "config.toml".to_owned());

    let config = match std::fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path, "no config file found, using defaults");
            Config::default()
        }
        Err(e) => return Err(anyhow::anyhow!("reading {path}: {e}")),
    };

    Ok((config, path))
}
