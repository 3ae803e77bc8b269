//! entra-graph — directory-service access for the Entra ID exporter.
//!
//! Defines the capability-set client the collectors depend on
//! ("list entities of type T for a tenant, paginated, filterable" and
//! "count entities of type T"), the identity abstraction used to obtain
//! bearer tokens, and a Microsoft Graph implementation over `reqwest`.
//!
//! # Architecture
//!
//! ```text
//! IdentityProvider ── credential(tenant) ──► TokenCredential
//!                                                │ get_token(scopes)
//! ClientConnector ─── connect(tenant, cred) ─► DirectoryClient
//!                                                ├── count(kind)
//!                                                ├── list_users(query, next_link)
//!                                                └── list_devices(query, next_link)
//! ```

pub mod azure;
pub mod client;
pub mod credential;
pub mod error;
pub mod graph;
pub mod types;

pub use azure::AzureIdentityProvider;
pub use client::{ClientConnector, DirectoryClient, IdentityProvider, fetch_all_pages};
pub use credential::{AccessToken, EnvTokenProvider, GRAPH_SCOPE, TokenCredential};
pub use error::{GraphError, GraphResult};
pub use graph::{GraphClient, GraphConnector};
pub use types::*;
