//! Capability traits for directory access.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::credential::TokenCredential;
use crate::error::GraphResult;
use crate::types::{DeviceRecord, EntityKind, ListQuery, Page, UserRecord};

/// An authenticated, tenant-scoped directory client.
///
/// `next_link` is the continuation token from the previous page; `None`
/// requests the first page of `query`.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Total number of objects of `kind` in the tenant.
    async fn count(&self, kind: EntityKind) -> GraphResult<u64>;

    async fn list_users(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<UserRecord>>;

    async fn list_devices(
        &self,
        query: &ListQuery,
        next_link: Option<String>,
    ) -> GraphResult<Page<DeviceRecord>>;
}

/// Produces a credential for a tenant.
///
/// Failing here means the credential could not be constructed at all,
/// as opposed to a credential that later fails to issue a token.
pub trait IdentityProvider: Send + Sync {
    fn credential(&self, tenant_id: &str) -> GraphResult<Arc<dyn TokenCredential>>;
}

/// Builds a directory client around a validated credential.
pub trait ClientConnector: Send + Sync {
    fn connect(
        &self,
        tenant_id: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> GraphResult<Arc<dyn DirectoryClient>>;
}

/// Follow continuation tokens until the collection is exhausted.
///
/// Items are accumulated locally. Any page error aborts the walk and the
/// pages gathered so far are dropped, so callers only ever see a complete
/// result or an error.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch: F) -> GraphResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = GraphResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut next_link = None;

    loop {
        let page = fetch(next_link.take()).await?;
        let next = page.next().map(str::to_string);
        items.extend(page.value);

        match next {
            Some(link) => next_link = Some(link),
            None => return Ok(items),
        }
    }
}
