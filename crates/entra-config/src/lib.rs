//! entra-config — configuration for the Entra ID exporter.
//!
//! The exporter is configured from a single TOML file:
//!
//! ```text
//! [azure]
//! tenants = ["<tenant-id>", ...]
//!
//! [collectors.general]   scrape_time = "5m"
//! [collectors.users]     scrape_time = "15m", filter = "..."
//! [collectors.devices]   scrape_time = "0"   # disabled
//! ```
//!
//! A collector whose `scrape_time` is missing, zero, or negative is
//! disabled and never constructed.

pub mod config;
pub mod duration;
pub mod error;

pub use config::{AzureConfig, CollectorConfig, CollectorsConfig, ExporterConfig, resolve_tenants};
pub use duration::parse_duration;
pub use error::{ConfigError, ConfigResult};
