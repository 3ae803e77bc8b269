//! Per-user info metrics.

use async_trait::async_trait;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::debug;

use entra_graph::{GraphResult, ListQuery, USER_FIELDS, UserRecord, fetch_all_pages};

use super::{bool_label, label};
use crate::cache::SnapshotCache;
use crate::domain::{Domain, TenantScope};
use crate::metrics::TenantLabels;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UserInfoLabels {
    pub tenant_id: String,
    pub user_id: String,
    pub user_principal_name: String,
    pub display_name: String,
    pub account_enabled: String,
    pub user_type: String,
    pub creation_type: String,
}

impl UserInfoLabels {
    fn new(tenant_id: &str, user: &UserRecord) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            user_id: label(&user.id),
            user_principal_name: label(&user.user_principal_name),
            display_name: label(&user.display_name),
            account_enabled: bool_label(user.account_enabled),
            user_type: label(&user.user_type),
            creation_type: label(&user.creation_type),
        }
    }
}

/// Lists every user of a tenant, optionally narrowed by a filter.
pub struct UsersDomain {
    query: ListQuery,
    cache: SnapshotCache<Vec<UserRecord>>,
    total: Family<TenantLabels, Gauge>,
    info: Family<UserInfoLabels, Gauge>,
}

impl UsersDomain {
    pub fn new(filter: Option<&str>) -> Self {
        Self {
            query: ListQuery::new(USER_FIELDS).with_filter(filter),
            cache: SnapshotCache::new(),
            total: Family::default(),
            info: Family::default(),
        }
    }

    pub fn cache(&self) -> &SnapshotCache<Vec<UserRecord>> {
        &self.cache
    }
}

#[async_trait]
impl Domain for UsersDomain {
    fn name(&self) -> &'static str {
        "users"
    }

    fn register(&self, registry: &mut Registry) {
        registry.register(
            "entraid_users_total",
            "Total number of users in the tenant",
            self.total.clone(),
        );
        registry.register(
            "entraid_users_info",
            "Information about Entra ID users",
            self.info.clone(),
        );
    }

    async fn collect_tenant(&self, scope: &TenantScope<'_>) -> GraphResult<()> {
        let client = scope.client();
        let query = &self.query;
        let users = fetch_all_pages(move |next| client.list_users(query, next)).await?;

        debug!(tenant_id = %scope.tenant_id(), count = users.len(), "fetched users");
        self.cache.replace(scope.tenant_id(), users).await;
        Ok(())
    }

    async fn render(&self) {
        let snapshots = self.cache.read().await;
        self.total.clear();
        self.info.clear();
        for (tenant_id, users) in snapshots.iter() {
            self.total
                .get_or_create(&TenantLabels::new(tenant_id))
                .set(users.len() as i64);
            for user in users {
                self.info
                    .get_or_create(&UserInfoLabels::new(tenant_id, user))
                    .set(1);
            }
        }
    }
}
