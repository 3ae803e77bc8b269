//! Identity provider backed by the Azure identity SDK.
//!
//! With `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` set, every tenant gets
//! its own client-secret credential. Otherwise the SDK's default chain is
//! used (environment, managed identity, Azure CLI) for the tenant it
//! resolves on its own.

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::auth::TokenCredential as AzureTokenCredential;
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use tracing::debug;

use crate::client::IdentityProvider;
use crate::credential::{AccessToken, TokenCredential};
use crate::error::{GraphError, GraphResult};

pub const CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// Which SDK credential a tenant gets.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AzureSource {
    ClientSecret { tenant_id: String },
    DefaultChain,
}

#[derive(Clone, Default)]
pub struct AzureIdentityProvider {
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl std::fmt::Debug for AzureIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureIdentityProvider")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[MASKED]"))
            .finish()
    }
}

impl AzureIdentityProvider {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.filter(|v| !v.is_empty()),
            client_secret: client_secret.filter(|v| !v.is_empty()),
        }
    }

    /// Whether tenants get explicit client-secret credentials.
    pub fn has_client_secret(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    fn source(&self, tenant_id: &str) -> AzureSource {
        if self.has_client_secret() && !tenant_id.is_empty() {
            AzureSource::ClientSecret {
                tenant_id: tenant_id.to_string(),
            }
        } else {
            AzureSource::DefaultChain
        }
    }
}

impl IdentityProvider for AzureIdentityProvider {
    fn credential(&self, tenant_id: &str) -> GraphResult<Arc<dyn TokenCredential>> {
        let source = self.source(tenant_id);
        let inner: Arc<dyn AzureTokenCredential> = match (source, &self.client_id, &self.client_secret) {
            (AzureSource::ClientSecret { tenant_id }, Some(client_id), Some(secret)) => {
                debug!(%tenant_id, "using client secret credential");
                let options = TokenCredentialOptions::default();
                let authority = options
                    .authority_host()
                    .map_err(|e| GraphError::Credential(e.to_string()))?;
                Arc::new(ClientSecretCredential::new(
                    options.http_client(),
                    authority,
                    tenant_id,
                    client_id.clone(),
                    secret.clone(),
                ))
            }
            _ => {
                debug!(%tenant_id, "using default azure credential chain");
                let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
                    .map_err(|e| GraphError::Credential(e.to_string()))?;
                Arc::new(credential)
            }
        };
        Ok(Arc::new(AzureCredential { inner }))
    }
}

/// Adapts an SDK credential to [`TokenCredential`].
struct AzureCredential {
    inner: Arc<dyn AzureTokenCredential>,
}

#[async_trait]
impl TokenCredential for AzureCredential {
    async fn get_token(&self, scopes: &[&str]) -> GraphResult<AccessToken> {
        let token = self
            .inner
            .get_token(scopes)
            .await
            .map_err(|e| GraphError::TokenValidation(e.to_string()))?;
        Ok(AccessToken {
            token: token.token.secret().to_string(),
        })
    }
}
