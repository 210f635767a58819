use anyhow::{bail, Context, Result};
use perspicuity_core::DEFAULT_CONTEXT_RESULTS;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/psp.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_query_path")]
    pub query_path: String,
    /// Unset means the HTTP client's own default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_path: default_query_path(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_query_path() -> String {
    "/api/query".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QueryConfig {
    #[serde(default = "default_context_results")]
    pub context_results: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            context_results: default_context_results(),
        }
    }
}

fn default_context_results() -> u32 {
    DEFAULT_CONTEXT_RESULTS
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub context_results: Option<u32>,
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Full URL of the query endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.service.base_url.trim_end_matches('/'),
            self.service.query_path.trim_start_matches('/')
        )
    }

    pub fn apply_overrides(mut self, overrides: &Overrides) -> Result<Self> {
        if let Some(base_url) = &overrides.base_url {
            self.service.base_url = base_url.clone();
        }
        if let Some(context_results) = overrides.context_results {
            self.query.context_results = context_results;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.service.base_url)
            .with_context(|| format!("service.base_url is not a valid URL: {}", self.service.base_url))?;
        match url.scheme() {
            "http" | "https" => {}
            other => bail!("service.base_url must use http or https, got '{}'", other),
        }

        if !self.service.query_path.starts_with('/') {
            bail!(
                "service.query_path must start with '/', got '{}'",
                self.service.query_path
            );
        }

        if self.service.timeout_secs == Some(0) {
            bail!("service.timeout_secs must be > 0 when set");
        }

        if self.query.context_results < 1 {
            bail!("query.context_results must be >= 1");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load the explicit `--config` file, else the default file if present,
/// else [`Config::minimal`]. Overrides are applied last.
pub fn resolve_config(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(&default_path)?
            } else {
                Config::minimal()
            }
        }
    };
    config.apply_overrides(overrides)
}
