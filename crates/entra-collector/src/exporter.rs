//! Owns the registry and the pollers of all enabled domains.

use std::sync::Arc;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::info;

use entra_config::{CollectorsConfig, ConfigResult};

use crate::domain::Domain;
use crate::domains::{DevicesDomain, GeneralDomain, UsersDomain};
use crate::factory::ClientFactory;
use crate::poller::DomainPoller;

pub struct Exporter {
    registry: Registry,
    pollers: Vec<Arc<DomainPoller>>,
    /// Rendering clears and refills shared families; one scrape at a time.
    render_lock: Mutex<()>,
}

impl Exporter {
    /// Build pollers for every collector with a positive interval.
    pub fn new(
        collectors: &CollectorsConfig,
        tenants: Vec<String>,
        factory: Arc<ClientFactory>,
    ) -> ConfigResult<Self> {
        let mut domains: Vec<(Arc<dyn Domain>, Duration)> = Vec::new();

        match collectors.general.interval("general")? {
            Some(interval) => domains.push((Arc::new(GeneralDomain::new()), interval)),
            None => info!(domain = "general", "collector disabled"),
        }
        match collectors.users.interval("users")? {
            Some(interval) => domains.push((
                Arc::new(UsersDomain::new(collectors.users.filter())),
                interval,
            )),
            None => info!(domain = "users", "collector disabled"),
        }
        match collectors.devices.interval("devices")? {
            Some(interval) => domains.push((
                Arc::new(DevicesDomain::new(collectors.devices.filter())),
                interval,
            )),
            None => info!(domain = "devices", "collector disabled"),
        }

        Ok(Self::with_domains(domains, tenants, factory))
    }

    /// Build an exporter from explicit domains.
    pub fn with_domains(
        domains: Vec<(Arc<dyn Domain>, Duration)>,
        tenants: Vec<String>,
        factory: Arc<ClientFactory>,
    ) -> Self {
        let tenants: Arc<[String]> = tenants.into();
        let mut registry = Registry::default();

        let pollers = domains
            .into_iter()
            .map(|(domain, interval)| {
                info!(
                    domain = domain.name(),
                    interval_secs = interval.as_secs(),
                    tenants = tenants.len(),
                    "collector enabled"
                );
                Arc::new(DomainPoller::new(
                    domain,
                    interval,
                    Arc::clone(&tenants),
                    Arc::clone(&factory),
                    &mut registry,
                ))
            })
            .collect();

        Self {
            registry,
            pollers,
            render_lock: Mutex::new(()),
        }
    }

    pub fn pollers(&self) -> &[Arc<DomainPoller>] {
        &self.pollers
    }

    pub fn enabled_domains(&self) -> Vec<&'static str> {
        self.pollers.iter().map(|p| p.name()).collect()
    }

    /// Spawn one refresh loop per enabled domain.
    pub fn start(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.pollers
            .iter()
            .map(|poller| poller.start(shutdown.clone()))
            .collect()
    }

    /// Render every domain from its cache and encode the registry.
    pub async fn scrape(&self) -> Result<String, std::fmt::Error> {
        let _rendering = self.render_lock.lock().await;
        for poller in &self.pollers {
            poller.render().await;
        }

        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}
