//! Lazily created, per-tenant directory clients.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use entra_graph::{
    ClientConnector, DirectoryClient, GRAPH_SCOPE, GraphError, GraphResult, IdentityProvider,
};

/// Upper bound for the token round-trip done when a client is created.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates one authenticated client per tenant and reuses it forever.
///
/// Credentials are validated with a token request before the client is
/// cached, so bad credentials fail at creation rather than on the first
/// real request. Failures are not cached; the next call tries again.
pub struct ClientFactory {
    identity: Arc<dyn IdentityProvider>,
    connector: Arc<dyn ClientConnector>,
    /// Tenant used when the requested tenant ID is empty.
    ambient_tenant: Option<String>,
    validation_timeout: Duration,
    /// Requested tenant ID → client.
    clients: RwLock<HashMap<String, Arc<dyn DirectoryClient>>>,
}

impl ClientFactory {
    pub fn new(identity: Arc<dyn IdentityProvider>, connector: Arc<dyn ClientConnector>) -> Self {
        Self {
            identity,
            connector,
            ambient_tenant: None,
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Set the tenant that the empty tenant ID resolves to.
    pub fn with_ambient_tenant(mut self, tenant: Option<String>) -> Self {
        self.ambient_tenant = tenant.filter(|t| !t.is_empty());
        self
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Get the cached client for a tenant, creating it on first use.
    pub async fn get_client(&self, tenant_id: &str) -> GraphResult<Arc<dyn DirectoryClient>> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(tenant_id) {
                return Ok(Arc::clone(client));
            }
        }

        let mut clients = self.clients.write().await;
        // Another caller may have created it while we waited for the lock.
        if let Some(client) = clients.get(tenant_id) {
            return Ok(Arc::clone(client));
        }

        let client = self.create_client(tenant_id).await?;
        clients.insert(tenant_id.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Tenant IDs with a cached client.
    #[cfg(test)]
    pub(crate) async fn cached_tenants(&self) -> Vec<String> {
        let clients = self.clients.read().await;
        clients.keys().cloned().collect()
    }

    async fn create_client(&self, tenant_id: &str) -> GraphResult<Arc<dyn DirectoryClient>> {
        let effective_tenant = if tenant_id.is_empty() {
            let ambient = self.ambient_tenant.clone().unwrap_or_default();
            debug!(tenant_id = %ambient, "using ambient tenant");
            ambient
        } else {
            tenant_id.to_string()
        };

        debug!(tenant_id = %effective_tenant, "creating directory client");

        let credential = self
            .identity
            .credential(&effective_tenant)
            .inspect_err(|e| error!(tenant_id = %effective_tenant, error = %e, "failed to create credential"))?;

        debug!(tenant_id = %effective_tenant, "validating credential by requesting a token");
        match tokio::time::timeout(self.validation_timeout, credential.get_token(&[GRAPH_SCOPE]))
            .await
        {
            Ok(Ok(_)) => debug!(tenant_id = %effective_tenant, "acquired token"),
            Ok(Err(e)) => {
                error!(tenant_id = %effective_tenant, error = %e, "failed to validate credential");
                return Err(match e {
                    GraphError::TokenValidation(_) => e,
                    other => GraphError::TokenValidation(other.to_string()),
                });
            }
            Err(_) => {
                error!(
                    tenant_id = %effective_tenant,
                    timeout_secs = self.validation_timeout.as_secs_f64(),
                    "credential validation timed out"
                );
                return Err(GraphError::ValidationTimeout(self.validation_timeout));
            }
        }

        let client = self.connector.connect(&effective_tenant, credential)?;
        info!(tenant_id = %effective_tenant, "directory client created");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::testing::{FakeConnector, FakeDirectory, FakeIdentity};

    fn factory(identity: Arc<FakeIdentity>, connector: Arc<FakeConnector>) -> Arc<ClientFactory> {
        Arc::new(ClientFactory::new(identity, connector))
    }

    #[tokio::test]
    async fn client_is_created_once_and_reused() {
        let identity = Arc::new(FakeIdentity::default());
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = factory(identity.clone(), connector.clone());

        let a = factory.get_client("t1").await.unwrap();
        let b = factory.get_client("t1").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(identity.validations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_requests_build_one_client() {
        let identity = Arc::new(FakeIdentity::default().with_delay(Duration::from_millis(50)));
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = factory(identity, connector.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let factory = Arc::clone(&factory);
                tokio::spawn(async move { factory.get_client("t1").await.unwrap() })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap());
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        for client in &clients[1..] {
            assert!(Arc::ptr_eq(&clients[0], client));
        }
    }

    #[tokio::test]
    async fn credential_failure_is_not_cached() {
        let identity = Arc::new(FakeIdentity::default());
        identity.fail_credential.store(true, Ordering::SeqCst);
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = factory(identity.clone(), connector.clone());

        let err = factory.get_client("t1").await.err().unwrap();
        assert!(matches!(err, GraphError::Credential(_)));
        assert!(factory.cached_tenants().await.is_empty());

        // Recovers on the next attempt.
        identity.fail_credential.store(false, Ordering::SeqCst);
        factory.get_client("t1").await.unwrap();
        assert_eq!(factory.cached_tenants().await, vec!["t1"]);
    }

    #[tokio::test]
    async fn token_failure_is_distinct_from_credential_failure() {
        let identity = Arc::new(FakeIdentity::default());
        identity.fail_token.store(true, Ordering::SeqCst);
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = factory(identity, connector.clone());

        let err = factory.get_client("t1").await.err().unwrap();
        assert!(matches!(err, GraphError::TokenValidation(_)));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_is_bounded_by_timeout() {
        let identity = Arc::new(FakeIdentity::default().with_delay(Duration::from_secs(5)));
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = Arc::new(
            ClientFactory::new(identity, connector)
                .with_validation_timeout(Duration::from_millis(20)),
        );

        let err = factory.get_client("t1").await.err().unwrap();
        assert!(matches!(err, GraphError::ValidationTimeout(_)));
        assert!(factory.cached_tenants().await.is_empty());
    }

    #[tokio::test]
    async fn empty_tenant_resolves_to_ambient_tenant() {
        let identity = Arc::new(FakeIdentity::default());
        let connector = Arc::new(FakeConnector::new(FakeDirectory::default()));
        let factory = ClientFactory::new(identity.clone(), connector)
            .with_ambient_tenant(Some("env-tenant".to_string()));

        factory.get_client("").await.unwrap();
        factory.get_client("").await.unwrap();

        assert_eq!(identity.tenants(), vec!["env-tenant"]);
        // Cached under the requested ID so the sentinel hits the cache.
        assert_eq!(factory.cached_tenants().await, vec![""]);
    }
}
