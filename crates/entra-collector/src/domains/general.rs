//! Tenant-wide object counts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::{debug, warn};

use entra_graph::{EntityKind, GraphResult};

use crate::cache::SnapshotCache;
use crate::domain::{Domain, TenantScope};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatLabels {
    pub tenant_id: String,
    pub metric: String,
}

/// Stat name (`user_count`, ...) → count.
pub type Stats = BTreeMap<&'static str, u64>;

/// Counts users, devices, applications, service principals and groups.
///
/// Each count is fetched independently. A failed count keeps its
/// previous value and bumps the tenant's error counter without failing
/// the tenant.
#[derive(Default)]
pub struct GeneralDomain {
    cache: SnapshotCache<Stats>,
    stats: Family<StatLabels, Gauge>,
}

impl GeneralDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &SnapshotCache<Stats> {
        &self.cache
    }
}

#[async_trait]
impl Domain for GeneralDomain {
    fn name(&self) -> &'static str {
        "general"
    }

    fn register(&self, registry: &mut Registry) {
        registry.register(
            "entraid_stats",
            "General statistics about the Entra ID tenant",
            self.stats.clone(),
        );
    }

    async fn collect_tenant(&self, scope: &TenantScope<'_>) -> GraphResult<()> {
        let tenant_id = scope.tenant_id();
        let mut stats = self.cache.get(tenant_id).await.unwrap_or_default();

        for kind in EntityKind::ALL {
            match scope.client().count(kind).await {
                Ok(count) => {
                    debug!(%tenant_id, stat = kind.stat_name(), count, "counted objects");
                    stats.insert(kind.stat_name(), count);
                }
                Err(e) => {
                    warn!(%tenant_id, stat = kind.stat_name(), error = %e, "failed to count objects");
                    scope.record_error();
                }
            }
        }

        self.cache.replace(tenant_id, stats).await;
        Ok(())
    }

    async fn render(&self) {
        let snapshots = self.cache.read().await;
        self.stats.clear();
        for (tenant_id, stats) in snapshots.iter() {
            for (metric, count) in stats {
                self.stats
                    .get_or_create(&StatLabels {
                        tenant_id: tenant_id.clone(),
                        metric: metric.to_string(),
                    })
                    .set(*count as i64);
            }
        }
    }
}
