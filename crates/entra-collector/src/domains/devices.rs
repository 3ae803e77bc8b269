//! Per-device info metrics.

use async_trait::async_trait;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::debug;

use entra_graph::{DEVICE_FIELDS, DeviceRecord, GraphResult, ListQuery, fetch_all_pages};

use super::{bool_label, label, time_label};
use crate::cache::SnapshotCache;
use crate::domain::{Domain, TenantScope};
use crate::metrics::TenantLabels;

/// Ownership is not part of the selected device properties.
const OWNERSHIP: &str = "n/a";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeviceInfoLabels {
    pub tenant_id: String,
    pub device_id: String,
    pub display_name: String,
    pub device_category: String,
    pub operating_system: String,
    pub operating_system_version: String,
    pub trust_type: String,
    pub enrollment_type: String,
    pub account_enabled: String,
    pub management_type: String,
    pub ownership: String,
    pub registration_datetime: String,
}

impl DeviceInfoLabels {
    fn new(tenant_id: &str, device: &DeviceRecord) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            device_id: label(&device.id),
            display_name: label(&device.display_name),
            device_category: label(&device.device_category),
            operating_system: label(&device.operating_system),
            operating_system_version: label(&device.operating_system_version),
            trust_type: label(&device.trust_type),
            enrollment_type: label(&device.enrollment_type),
            account_enabled: bool_label(device.account_enabled),
            management_type: label(&device.management_type),
            ownership: OWNERSHIP.to_string(),
            registration_datetime: time_label(device.registration_date_time),
        }
    }
}

/// Lists every registered device of a tenant.
pub struct DevicesDomain {
    query: ListQuery,
    cache: SnapshotCache<Vec<DeviceRecord>>,
    total: Family<TenantLabels, Gauge>,
    info: Family<DeviceInfoLabels, Gauge>,
}

impl DevicesDomain {
    pub fn new(filter: Option<&str>) -> Self {
        Self {
            query: ListQuery::new(DEVICE_FIELDS).with_filter(filter),
            cache: SnapshotCache::new(),
            total: Family::default(),
            info: Family::default(),
        }
    }

    pub fn cache(&self) -> &SnapshotCache<Vec<DeviceRecord>> {
        &self.cache
    }
}

#[async_trait]
impl Domain for DevicesDomain {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn register(&self, registry: &mut Registry) {
        registry.register(
            "entraid_devices_total",
            "Total number of devices in the tenant",
            self.total.clone(),
        );
        registry.register(
            "entraid_devices_info",
            "Information about Entra ID devices",
            self.info.clone(),
        );
    }

    async fn collect_tenant(&self, scope: &TenantScope<'_>) -> GraphResult<()> {
        let client = scope.client();
        let query = &self.query;
        let devices = fetch_all_pages(move |next| client.list_devices(query, next)).await?;

        debug!(tenant_id = %scope.tenant_id(), count = devices.len(), "fetched devices");
        self.cache.replace(scope.tenant_id(), devices).await;
        Ok(())
    }

    async fn render(&self) {
        let snapshots = self.cache.read().await;
        self.total.clear();
        self.info.clear();
        for (tenant_id, devices) in snapshots.iter() {
            self.total
                .get_or_create(&TenantLabels::new(tenant_id))
                .set(devices.len() as i64);
            for device in devices {
                self.info
                    .get_or_create(&DeviceInfoLabels::new(tenant_id, device))
                    .set(1);
            }
        }
    }
}
