//! entra-collector — background collection and metric rendering.
//!
//! Each enabled metric domain (general, users, devices) gets one
//! [`DomainPoller`] that refreshes a per-tenant [`SnapshotCache`] on its
//! own interval. Scrapes never fetch: they render whatever the caches
//! currently hold.
//!
//! # Architecture
//!
//! ```text
//! Exporter
//!   ├── Registry (prometheus-client)
//!   ├── DomainPoller × enabled domains
//!   │   ├── background loop: run_cycle() → sleep(interval) → ...
//!   │   ├── ClientFactory::get_client(tenant)  (shared, lazily cached)
//!   │   ├── Domain::collect_tenant() → SnapshotCache::replace()
//!   │   └── ScrapeMetrics (errors, duration, last scrape time)
//!   └── scrape() → Domain::render() × domains → text encoding
//! ```
//!
//! # Failure isolation
//!
//! A tenant failure bumps that tenant's error counter and the cycle moves
//! on. A panic inside a cycle is contained to that cycle; the loop sleeps
//! and tries again. The previous snapshot of a failed tenant is kept.

pub mod cache;
pub mod domain;
pub mod domains;
pub mod exporter;
pub mod factory;
pub mod metrics;
pub mod poller;

#[cfg(test)]
mod testing;

pub use cache::SnapshotCache;
pub use domain::{Domain, TenantScope};
pub use domains::{DevicesDomain, GeneralDomain, UsersDomain};
pub use exporter::Exporter;
pub use factory::ClientFactory;
pub use metrics::{ScrapeMetrics, TenantLabels};
pub use poller::{DomainPoller, panic_message};
