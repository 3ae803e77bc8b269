//! Token credentials.
//!
//! Token acquisition itself is delegated to an external agent (workload
//! identity sidecar, `az account get-access-token` cron, vault agent...).
//! [`EnvTokenProvider`] hands out credentials that read whatever bearer
//! token that agent last wrote, so rotation needs no restart.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::IdentityProvider;
use crate::error::{GraphError, GraphResult};

/// OAuth scope for Microsoft Graph application permissions.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Environment variable holding a bearer token.
pub const TOKEN_ENV: &str = "ENTRA_ACCESS_TOKEN";

/// Environment variable naming a file that holds a bearer token.
/// `{tenant}` in the path is replaced with the tenant ID.
pub const TOKEN_FILE_ENV: &str = "ENTRA_ACCESS_TOKEN_FILE";

/// A bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").field("token", &"[MASKED]").finish()
    }
}

/// Something that can issue bearer tokens for a set of scopes.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str]) -> GraphResult<AccessToken>;
}

/// Where an [`EnvTokenProvider`] reads tokens from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenSource {
    Static(String),
    File(String),
}

/// Identity provider backed by `ENTRA_ACCESS_TOKEN` / `ENTRA_ACCESS_TOKEN_FILE`.
#[derive(Debug, Clone, Default)]
pub struct EnvTokenProvider {
    source: Option<TokenSource>,
}

impl EnvTokenProvider {
    /// Read the token source from the process environment.
    ///
    /// The file variable wins when both are set.
    pub fn from_env() -> Self {
        let file = std::env::var(TOKEN_FILE_ENV).ok().filter(|v| !v.is_empty());
        let token = std::env::var(TOKEN_ENV).ok().filter(|v| !v.is_empty());
        Self::from_sources(token, file)
    }

    pub fn from_sources(token: Option<String>, file: Option<String>) -> Self {
        let source = match (file, token) {
            (Some(path), _) => Some(TokenSource::File(path)),
            (None, Some(token)) => Some(TokenSource::Static(token)),
            (None, None) => None,
        };
        Self { source }
    }

    /// Whether any token source is configured.
    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }
}

impl IdentityProvider for EnvTokenProvider {
    fn credential(&self, tenant_id: &str) -> GraphResult<Arc<dyn TokenCredential>> {
        match &self.source {
            Some(TokenSource::Static(token)) => Ok(Arc::new(StaticToken {
                token: token.clone(),
            })),
            Some(TokenSource::File(template)) => Ok(Arc::new(TokenFile {
                path: PathBuf::from(template.replace("{tenant}", tenant_id)),
            })),
            None => Err(GraphError::Credential(format!(
                "no token source configured: set {TOKEN_ENV} or {TOKEN_FILE_ENV}"
            ))),
        }
    }
}

struct StaticToken {
    token: String,
}

#[async_trait]
impl TokenCredential for StaticToken {
    async fn get_token(&self, _scopes: &[&str]) -> GraphResult<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
        })
    }
}

struct TokenFile {
    path: PathBuf,
}

#[async_trait]
impl TokenCredential for TokenFile {
    async fn get_token(&self, scopes: &[&str]) -> GraphResult<AccessToken> {
        debug!(path = %self.path.display(), ?scopes, "reading token file");
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GraphError::TokenValidation(format!("read {}: {e}", self.path.display()))
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(GraphError::TokenValidation(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }
        Ok(AccessToken {
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_provider_fails_to_build_credential() {
        let provider = EnvTokenProvider::from_sources(None, None);
        assert!(!provider.is_configured());
        let err = provider.credential("t1").err().unwrap();
        assert!(matches!(err, GraphError::Credential(_)));
    }

    #[tokio::test]
    async fn static_token_is_returned() {
        let provider = EnvTokenProvider::from_sources(Some("abc".into()), None);
        let cred = provider.credential("t1").unwrap();
        let token = cred.get_token(&[GRAPH_SCOPE]).await.unwrap();
        assert_eq!(token.token, "abc");
    }

    #[tokio::test]
    async fn token_file_is_per_tenant_and_reread() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("{tenant}.jwt").display().to_string();
        let path = dir.path().join("t1.jwt");
        std::fs::write(&path, "first\n").unwrap();

        let provider = EnvTokenProvider::from_sources(Some("ignored".into()), Some(template));
        let cred = provider.credential("t1").unwrap();
        assert_eq!(cred.get_token(&[GRAPH_SCOPE]).await.unwrap().token, "first");

        std::fs::write(&path, "second").unwrap();
        assert_eq!(cred.get_token(&[GRAPH_SCOPE]).await.unwrap().token, "second");
    }

    #[tokio::test]
    async fn missing_or_empty_token_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let provider =
            EnvTokenProvider::from_sources(None, Some(path.display().to_string()));
        let cred = provider.credential("t1").unwrap();

        let err = cred.get_token(&[GRAPH_SCOPE]).await.unwrap_err();
        assert!(matches!(err, GraphError::TokenValidation(_)));

        std::fs::write(&path, "  \n").unwrap();
        let err = cred.get_token(&[GRAPH_SCOPE]).await.unwrap_err();
        assert!(matches!(err, GraphError::TokenValidation(_)));
    }

    #[test]
    fn debug_masks_token() {
        let token = AccessToken {
            token: "secret".into(),
        };
        assert!(!format!("{token:?}").contains("secret"));
    }
}
