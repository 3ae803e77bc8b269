//! Exporter configuration file parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};

/// Default Microsoft Graph endpoint.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Tenant IDs to collect from. Empty means "resolve from environment".
    #[serde(default)]
    pub tenants: Vec<String>,
    /// Graph API base URL, for sovereign clouds.
    pub graph_endpoint: Option<String>,
    /// Per-request timeout for Graph calls.
    pub request_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub general: CollectorConfig,
    #[serde(default)]
    pub users: CollectorConfig,
    #[serde(default)]
    pub devices: CollectorConfig,
}

/// Per-collector settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Refresh interval. Missing, zero or negative disables the collector.
    pub scrape_time: Option<String>,
    /// OData `$filter` expression applied to list queries.
    pub filter: Option<String>,
}

impl CollectorConfig {
    /// Create an enabled collector config with the given interval string.
    pub fn every(scrape_time: &str) -> Self {
        Self {
            scrape_time: Some(scrape_time.to_string()),
            filter: None,
        }
    }

    /// The refresh interval, or `None` if the collector is disabled.
    ///
    /// Fails only on strings that are not durations at all.
    pub fn interval(&self, name: &str) -> ConfigResult<Option<Duration>> {
        let Some(raw) = self.scrape_time.as_deref() else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        let (negative, magnitude) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let parsed = parse_duration(magnitude).ok_or_else(|| ConfigError::InvalidDuration {
            field: format!("collectors.{name}.scrape_time"),
            value: raw.to_string(),
        })?;

        if negative || parsed.is_zero() {
            Ok(None)
        } else {
            Ok(Some(parsed))
        }
    }

    /// The configured filter, ignoring blank strings.
    pub fn filter(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

impl ExporterConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: ExporterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every duration field up front so bad values fail at startup.
    pub fn validate(&self) -> ConfigResult<()> {
        self.collectors.general.interval("general")?;
        self.collectors.users.interval("users")?;
        self.collectors.devices.interval("devices")?;
        self.request_timeout()?;
        Ok(())
    }

    pub fn graph_endpoint(&self) -> &str {
        self.azure
            .graph_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_GRAPH_ENDPOINT)
            .trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> ConfigResult<Duration> {
        match self.azure.request_timeout.as_deref() {
            None => Ok(DEFAULT_REQUEST_TIMEOUT),
            Some(raw) => parse_duration(raw)
                .filter(|d| !d.is_zero())
                .ok_or_else(|| ConfigError::InvalidDuration {
                    field: "azure.request_timeout".to_string(),
                    value: raw.to_string(),
                }),
        }
    }
}

/// Resolve the tenant list once at startup.
///
/// Configured tenants win; otherwise the ambient tenant (normally
/// `AZURE_TENANT_ID`); otherwise the empty sentinel, which lets the
/// identity provider pick its default tenant.
pub fn resolve_tenants(config: &ExporterConfig, ambient_tenant: Option<&str>) -> Vec<String> {
    let tenants: Vec<String> = config
        .azure
        .tenants
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if !tenants.is_empty() {
        debug!(?tenants, "using configured tenants");
        return tenants;
    }

    match ambient_tenant.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tenant) => {
            debug!(%tenant, "no tenants configured, using tenant from environment");
            vec![tenant.to_string()]
        }
        None => {
            warn!("no tenant IDs in config or environment, falling back to the default tenant");
            vec![String::new()]
        }
    }
}
