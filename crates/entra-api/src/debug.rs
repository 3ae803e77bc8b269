//! Masked view of the authentication environment.

use std::fmt::Write;

use entra_graph::azure::{CLIENT_ID_ENV, CLIENT_SECRET_ENV};
use entra_graph::credential::{TOKEN_ENV, TOKEN_FILE_ENV};

/// Variables shown with [`mask_value`].
const MASKED_VARS: &[&str] = &["AZURE_TENANT_ID", CLIENT_ID_ENV, TOKEN_FILE_ENV];

/// Variables never shown, set or not.
const SECRET_VARS: &[&str] = &[CLIENT_SECRET_ENV, TOKEN_ENV];

/// GET /debug/env
pub async fn env() -> String {
    render_env(|name| std::env::var(name).ok())
}

/// Render the report using `lookup` to read variables.
pub fn render_env(lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::from("Azure Authentication Environment Variables:\n");
    for name in MASKED_VARS {
        let value = lookup(name).unwrap_or_default();
        let _ = writeln!(out, "{name}: {}", mask_value(&value));
    }
    for name in SECRET_VARS {
        let _ = writeln!(out, "{name}: [MASKED]");
    }
    out
}

/// Hide all but the edges of a value.
///
/// Empty values read `<not set>`. Up to 4 characters are fully hidden,
/// up to 8 keep the last 4, longer values keep the first and last 4.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let n = chars.len();
    let tail: String = chars[n.saturating_sub(4)..].iter().collect();
    match n {
        0 => "<not set>".to_string(),
        1..=4 => "****".to_string(),
        5..=8 => format!("****{tail}"),
        _ => {
            let head: String = chars[..4].iter().collect();
            format!("{head}****{tail}")
        }
    }
}
