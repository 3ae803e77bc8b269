//! The three metric domains and their shared label helpers.

mod devices;
mod general;
mod users;

pub use devices::{DeviceInfoLabels, DevicesDomain};
pub use general::{GeneralDomain, StatLabels};
pub use users::{UserInfoLabels, UsersDomain};

use chrono::{DateTime, SecondsFormat, Utc};

/// Placeholder for absent strings and ids.
pub(crate) const UNKNOWN: &str = "unknown";

pub(crate) fn label(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Absent booleans render as "false".
pub(crate) fn bool_label(value: Option<bool>) -> String {
    value.unwrap_or(false).to_string()
}

/// RFC 3339 UTC with second precision.
pub(crate) fn time_label(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| UNKNOWN.to_string())
}
