//! In-memory fakes for the directory traits.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use entra_graph::{
    AccessToken, ClientConnector, DeviceRecord, DirectoryClient, EntityKind, GraphError,
    GraphResult, IdentityProvider, ListQuery, Page, TokenCredential, UserRecord,
};

use crate::factory::ClientFactory;

/// Scripted directory: fixed counts and pages, switchable failures.
#[derive(Default)]
pub struct FakeDirectory {
    counts: Mutex<HashMap<EntityKind, u64>>,
    failing_counts: Mutex<HashSet<EntityKind>>,
    user_pages: Mutex<Vec<Vec<UserRecord>>>,
    device_pages: Mutex<Vec<Vec<DeviceRecord>>>,
    /// Page index that fails with an HTTP error.
    fail_page: Mutex<Option<usize>>,
    pub queries: Mutex<Vec<ListQuery>>,
}

impl FakeDirectory {
    pub fn with_count(self, kind: EntityKind, n: u64) -> Self {
        self.set_count(kind, n);
        self
    }

    pub fn with_user_pages(self, pages: Vec<Vec<UserRecord>>) -> Self {
        *self.user_pages.lock().unwrap() = pages;
        self
    }

    pub fn with_device_pages(self, pages: Vec<Vec<DeviceRecord>>) -> Self {
        *self.device_pages.lock().unwrap() = pages;
        self
    }

    pub fn set_count(&self, kind: EntityKind, n: u64) {
        self.counts.lock().unwrap().insert(kind, n);
    }

    pub fn fail_count(&self, kind: EntityKind, fail: bool) {
        let mut failing = self.failing_counts.lock().unwrap();
        if fail {
            failing.insert(kind);
        } else {
            failing.remove(&kind);
        }
    }

    pub fn fail_page(&self, index: Option<usize>) {
        *self.fail_page.lock().unwrap() = index;
    }

    fn page<T: Clone>(&self, pages: &[Vec<T>], next_link: Option<String>) -> GraphResult<Page<T>> {
        let index = next_link
            .as_deref()
            .and_then(|l| l.strip_prefix("page-"))
            .and_then(|i| i.parse::<usize>().ok())
            .unwrap_or(0);

        if *self.fail_page.lock().unwrap() == Some(index) {
            return Err(GraphError::Http(format!("page {index} unavailable")));
        }

        let value = pages.get(index).cloned().unwrap_or_default();
        if index + 1 < pages.len() {
            Ok(Page::with_next(value, format!("page-{}", index + 1)))
        } else {
            Ok(Page::last(value))
        }
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn count(&self, kind: EntityKind) -> GraphResult<u64> {
        if self.failing_counts.lock().unwrap().contains(&kind) {
            return Err(GraphError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(self.counts.lock().unwrap().get(&kind).copied().unwrap_or(0))
    }

    async fn list_users(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<UserRecord>> {
        self.queries.lock().unwrap().push(query.clone());
        let pages = self.user_pages.lock().unwrap().clone();
        self.page(&pages, next_link)
    }

    async fn list_devices(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<DeviceRecord>> {
        self.queries.lock().unwrap().push(query.clone());
        let pages = self.device_pages.lock().unwrap().clone();
        self.page(&pages, next_link)
    }
}

/// Identity provider with switchable failures and a validation delay.
#[derive(Default)]
pub struct FakeIdentity {
    pub fail_credential: AtomicBool,
    pub fail_token: Arc<AtomicBool>,
    pub validations: Arc<AtomicUsize>,
    failing_tenants: HashSet<String>,
    delay: Duration,
    tenants: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failing_tenant(mut self, tenant_id: &str) -> Self {
        self.failing_tenants.insert(tenant_id.to_string());
        self
    }

    /// Tenants a credential was requested for, in order.
    pub fn tenants(&self) -> Vec<String> {
        self.tenants.lock().unwrap().clone()
    }
}

impl IdentityProvider for FakeIdentity {
    fn credential(&self, tenant_id: &str) -> GraphResult<Arc<dyn TokenCredential>> {
        self.tenants.lock().unwrap().push(tenant_id.to_string());
        if self.fail_credential.load(Ordering::SeqCst) || self.failing_tenants.contains(tenant_id) {
            return Err(GraphError::Credential(format!("no credential for {tenant_id}")));
        }
        Ok(Arc::new(FakeCredential {
            fail: Arc::clone(&self.fail_token),
            validations: Arc::clone(&self.validations),
            delay: self.delay,
        }))
    }
}

struct FakeCredential {
    fail: Arc<AtomicBool>,
    validations: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl TokenCredential for FakeCredential {
    async fn get_token(&self, _scopes: &[&str]) -> GraphResult<AccessToken> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(GraphError::TokenValidation("invalid_client".into()));
        }
        Ok(AccessToken {
            token: "fake".into(),
        })
    }
}

/// Connector that always hands out the same fake directory.
pub struct FakeConnector {
    pub directory: Arc<FakeDirectory>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(directory: FakeDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
            connects: AtomicUsize::new(0),
        }
    }
}

impl ClientConnector for FakeConnector {
    fn connect(
        &self,
        _tenant_id: &str,
        _credential: Arc<dyn TokenCredential>,
    ) -> GraphResult<Arc<dyn DirectoryClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.directory.clone())
    }
}

/// A factory serving `directory` for every tenant.
pub fn fake_factory(directory: FakeDirectory) -> (Arc<ClientFactory>, Arc<FakeDirectory>) {
    let connector = Arc::new(FakeConnector::new(directory));
    let directory = Arc::clone(&connector.directory);
    let factory = ClientFactory::new(Arc::new(FakeIdentity::default()), connector);
    (Arc::new(factory), directory)
}

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: Some(id.to_string()),
        user_principal_name: Some(format!("{id}@contoso.com")),
        display_name: Some(id.to_uppercase()),
        account_enabled: Some(true),
        user_type: Some("Member".into()),
        creation_type: None,
    }
}

pub fn device(id: &str) -> DeviceRecord {
    DeviceRecord {
        id: Some(id.to_string()),
        display_name: Some(format!("{id}-laptop")),
        operating_system: Some("Windows".into()),
        operating_system_version: Some("10.0.22631".into()),
        account_enabled: Some(true),
        trust_type: Some("AzureAd".into()),
        ..DeviceRecord::default()
    }
}
