//! Per-domain background refresh loop.
//!
//! The `DomainPoller` runs one perpetual task per enabled domain:
//! collect every tenant, sleep for the interval, repeat. The interval is
//! measured from the end of one cycle, so the effective period is
//! interval + collection time.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prometheus_client::registry::Registry;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use entra_graph::GraphResult;

use crate::domain::{Domain, TenantScope};
use crate::factory::ClientFactory;
use crate::metrics::ScrapeMetrics;

/// Drives one [`Domain`] on a fixed interval.
pub struct DomainPoller {
    domain: Arc<dyn Domain>,
    interval: Duration,
    tenants: Arc<[String]>,
    factory: Arc<ClientFactory>,
    metrics: ScrapeMetrics,
    /// Held for a whole cycle so cycles of one domain never overlap.
    collecting: Mutex<()>,
}

impl DomainPoller {
    /// Create a poller and register its metrics (scrape bookkeeping plus
    /// the domain's own families).
    pub fn new(
        domain: Arc<dyn Domain>,
        interval: Duration,
        tenants: Arc<[String]>,
        factory: Arc<ClientFactory>,
        registry: &mut Registry,
    ) -> Self {
        let metrics = ScrapeMetrics::new();
        metrics.register(registry, domain.name());
        domain.register(registry);

        Self {
            domain,
            interval,
            tenants,
            factory,
            metrics,
            collecting: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.domain.name()
    }

    #[cfg(test)]
    pub(crate) fn metrics(&self) -> &ScrapeMetrics {
        &self.metrics
    }

    /// Spawn the refresh loop. The first cycle starts immediately.
    ///
    /// The loop only checks `shutdown` between cycles; a running cycle is
    /// never interrupted.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let poller = Arc::clone(self);
        tokio::spawn(async move { poller.run(shutdown).await })
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let domain = self.name();
        info!(domain, interval_secs = self.interval.as_secs(), "collector loop started");

        loop {
            // Each cycle runs in its own task so a panic ends only that cycle.
            let cycle = tokio::spawn({
                let poller = Arc::clone(&self);
                async move { poller.run_cycle().await }
            });

            if let Err(e) = cycle.await {
                if e.is_panic() {
                    let message = panic_message(e.into_panic().as_ref());
                    error!(domain, panic = %message, "collection cycle panicked");
                } else {
                    error!(domain, "collection cycle cancelled");
                }
            }

            debug!(domain, wait_secs = self.interval.as_secs(), "waiting for next collection cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!(domain, "collector loop shutting down");
                    break;
                }
            }
        }
    }

    /// Collect every tenant once, in order.
    pub async fn run_cycle(&self) {
        let _collecting = self.collecting.lock().await;
        let domain = self.name();
        debug!(domain, tenants = self.tenants.len(), "starting collection cycle");

        for tenant_id in self.tenants.iter() {
            let start = Instant::now();
            match self.collect_tenant(tenant_id).await {
                Ok(()) => debug!(
                    domain,
                    %tenant_id,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "tenant collected"
                ),
                Err(e) => {
                    error!(domain, %tenant_id, error = %e, "tenant collection failed");
                    self.metrics.record_error(tenant_id);
                }
            }
            self.metrics.observe(tenant_id, start.elapsed());
        }

        debug!(domain, "completed collection cycle");
    }

    async fn collect_tenant(&self, tenant_id: &str) -> GraphResult<()> {
        let client = self.factory.get_client(tenant_id).await?;
        let scope = TenantScope::new(tenant_id, client.as_ref(), &self.metrics);
        self.domain.collect_tenant(&scope).await
    }

    /// Refresh this domain's metric families from its cache.
    ///
    /// Never waits on a running collection cycle.
    pub async fn render(&self) {
        self.domain.render().await;
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
