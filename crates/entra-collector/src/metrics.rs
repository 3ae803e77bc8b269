//! Per-domain scrape bookkeeping metrics.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Labels for metrics keyed by tenant only.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TenantLabels {
    pub tenant_id: String,
}

impl TenantLabels {
    pub fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
        }
    }
}

/// Error count, duration and last-run time of one domain's collections.
#[derive(Debug, Clone)]
pub struct ScrapeMetrics {
    errors: Family<TenantLabels, Counter>,
    duration: Family<TenantLabels, Histogram>,
    last_scrape: Family<TenantLabels, Gauge>,
}

impl Default for ScrapeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeMetrics {
    pub fn new() -> Self {
        Self {
            errors: Family::default(),
            // 0.25s .. ~17min: a large tenant's user walk can take minutes.
            duration: Family::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.25, 2.0, 13))
            }),
            last_scrape: Family::default(),
        }
    }

    /// Register as `entraid_<domain>_*`.
    pub fn register(&self, registry: &mut Registry, domain: &str) {
        // The encoder appends `_total` to counters.
        registry.register(
            format!("entraid_{domain}_scrape_errors"),
            format!("Total number of Entra ID {domain} scrape errors"),
            self.errors.clone(),
        );
        registry.register(
            format!("entraid_{domain}_scrape_duration_seconds"),
            format!("Duration of Entra ID {domain} scrape in seconds"),
            self.duration.clone(),
        );
        registry.register(
            format!("entraid_{domain}_last_scrape_time"),
            format!("Last Entra ID {domain} scrape time in seconds since epoch"),
            self.last_scrape.clone(),
        );
    }

    pub fn record_error(&self, tenant_id: &str) {
        self.errors.get_or_create(&TenantLabels::new(tenant_id)).inc();
    }

    /// Record one finished tenant collection, successful or not.
    pub fn observe(&self, tenant_id: &str, elapsed: Duration) {
        let labels = TenantLabels::new(tenant_id);
        self.duration
            .get_or_create(&labels)
            .observe(elapsed.as_secs_f64());
        self.last_scrape
            .get_or_create(&labels)
            .set(epoch_secs() as i64);
    }

    /// Current error count for a tenant.
    #[cfg(test)]
    pub(crate) fn errors(&self, tenant_id: &str) -> u64 {
        self.errors.get_or_create(&TenantLabels::new(tenant_id)).get()
    }

    /// Unix time of the tenant's last finished collection, 0 if none.
    #[cfg(test)]
    pub(crate) fn last_scrape_time(&self, tenant_id: &str) -> i64 {
        self.last_scrape
            .get_or_create(&TenantLabels::new(tenant_id))
            .get()
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
