use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Context};
use config::{Config, Environment, File, Map};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub control_db_url: String,
    pub port: u16,
    pub bind_host: String,
    pub query_timeout_ms: u64,
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let raw = format!("{}:{}", self.bind_host, self.port);
        raw.parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address '{raw}'"))
    }
}

/// Reads `server.toml` (optional) and the process environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    settings_from_sources(None)
}

/// Like [`load_settings`], with `env` standing in for the process environment
/// when provided.
pub fn settings_from_sources(env: Option<Map<String, String>>) -> anyhow::Result<Settings> {
    let raw = Config::builder()
        .set_default("port", 8080)?
        .set_default("bind_host", "0.0.0.0")?
        .set_default("query_timeout_ms", 5000)?
        .add_source(File::with_name("server").required(false))
        .add_source(
            Environment::default()
                .try_parsing(true)
                .ignore_empty(true)
                .source(env),
        )
        .build()
        .context("failed to read configuration")?;

    let settings: Settings = raw
        .try_deserialize()
        .context("failed to parse configuration")?;

    if settings.control_db_url.trim().is_empty() {
        bail!("CONTROL_DB_URL is required (connection string of the control database)");
    }
    if settings.query_timeout_ms == 0 {
        bail!("QUERY_TIMEOUT_MS must be greater than zero");
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
