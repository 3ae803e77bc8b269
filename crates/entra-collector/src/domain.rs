//! The per-domain strategy driven by [`DomainPoller`](crate::DomainPoller).

use async_trait::async_trait;
use prometheus_client::registry::Registry;

use entra_graph::{DirectoryClient, GraphResult};

use crate::metrics::ScrapeMetrics;

/// One category of collected directory data.
///
/// A domain owns its snapshot cache and its metric families. The poller
/// owns scheduling, client lookup, locking and scrape bookkeeping.
#[async_trait]
pub trait Domain: Send + Sync + 'static {
    /// Short name used in metric names (`entraid_<name>_...`) and logs.
    fn name(&self) -> &'static str;

    /// Register the domain's metric families.
    fn register(&self, registry: &mut Registry);

    /// Fetch one tenant's data and swap it into the cache.
    ///
    /// Returning an error leaves the tenant's previous snapshot in place;
    /// the poller counts and logs it.
    async fn collect_tenant(&self, scope: &TenantScope<'_>) -> GraphResult<()>;

    /// Refresh the metric families from the cache. Must not do I/O.
    async fn render(&self);
}

/// Everything a domain needs to collect a single tenant.
pub struct TenantScope<'a> {
    tenant_id: &'a str,
    client: &'a dyn DirectoryClient,
    metrics: &'a ScrapeMetrics,
}

impl<'a> TenantScope<'a> {
    pub fn new(
        tenant_id: &'a str,
        client: &'a dyn DirectoryClient,
        metrics: &'a ScrapeMetrics,
    ) -> Self {
        Self {
            tenant_id,
            client,
            metrics,
        }
    }

    pub fn tenant_id(&self) -> &'a str {
        self.tenant_id
    }

    pub fn client(&self) -> &'a dyn DirectoryClient {
        self.client
    }

    /// Count a partial failure that does not fail the whole tenant.
    pub fn record_error(&self) {
        self.metrics.record_error(self.tenant_id);
    }
}
