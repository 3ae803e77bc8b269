//! Microsoft Graph REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{ClientConnector, DirectoryClient};
use crate::credential::{GRAPH_SCOPE, TokenCredential};
use crate::error::{GraphError, GraphResult};
use crate::types::{DeviceRecord, EntityKind, ListQuery, Page, UserRecord};

const USER_AGENT: &str = concat!("entra-exporter/", env!("CARGO_PKG_VERSION"));

/// Builds [`GraphClient`]s that share one HTTP connection pool.
#[derive(Clone)]
pub struct GraphConnector {
    http: reqwest::Client,
    base_url: String,
}

impl GraphConnector {
    /// Create a connector for `base_url` (e.g. `https://graph.microsoft.com/v1.0`).
    ///
    /// `request_timeout` bounds every Graph call, including each page fetch.
    pub fn new(base_url: &str, request_timeout: Duration) -> GraphResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GraphError::Connect(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ClientConnector for GraphConnector {
    fn connect(
        &self,
        tenant_id: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> GraphResult<Arc<dyn DirectoryClient>> {
        debug!(%tenant_id, base_url = %self.base_url, "creating graph client");
        Ok(Arc::new(GraphClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential,
        }))
    }
}

/// A tenant-scoped Graph client.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    credential: Arc<dyn TokenCredential>,
}

impl GraphClient {
    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.base_url, kind.path())
    }

    /// Send an authenticated GET and fail on non-2xx.
    async fn send(&self, request: reqwest::RequestBuilder) -> GraphResult<reqwest::Response> {
        let token = self.credential.get_token(&[GRAPH_SCOPE]).await?;
        let response = request
            .bearer_auth(token.token)
            // Required for $count and advanced $filter queries.
            .header("ConsistencyLevel", "eventual")
            .send()
            .await
            .map_err(|e| GraphError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GraphError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn list<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<T>> {
        let request = match next_link {
            // Continuation links already carry the first page's query.
            Some(link) => self.http.get(link),
            None => self
                .http
                .get(self.collection_url(kind))
                .query(&query.params()),
        };

        self.send(request)
            .await?
            .json::<Page<T>>()
            .await
            .map_err(|e| GraphError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn count(&self, kind: EntityKind) -> GraphResult<u64> {
        let url = format!("{}/$count", self.collection_url(kind));
        let body = self
            .send(self.http.get(url))
            .await?
            .text()
            .await
            .map_err(|e| GraphError::Decode(e.to_string()))?;
        parse_count(&body)
    }

    async fn list_users(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<UserRecord>> {
        self.list(EntityKind::Users, query, next_link).await
    }

    async fn list_devices(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<DeviceRecord>> {
        self.list(EntityKind::Devices, query, next_link).await
    }
}

/// Parse a `$count` response body (plain text, possibly with a BOM).
fn parse_count(body: &str) -> GraphResult<u64> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    trimmed
        .parse::<u64>()
        .map_err(|e| GraphError::Decode(format!("invalid count {trimmed:?}: {e}")))
}
