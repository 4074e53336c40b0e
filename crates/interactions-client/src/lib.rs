//! Site-scoped client for the Interaction Management API
//!
//! Every read and write runs against exactly one active site. The client
//! keeps a stale-while-revalidate query cache whose keys carry the site,
//! checks every record it receives against the active site, and clears all
//! cached data on logout and on site switches.

pub mod cache;
mod client;
pub mod config;
pub mod constants;
pub mod credentials;
mod error;
pub mod gateway;
pub mod guard;
mod mutation;
pub mod observability;
pub mod session;
pub mod tenant;
pub mod types;
pub mod validation;

pub use cache::{
    CacheConfig, CacheKey, CacheNamespace, CacheStats, DateRange, FilterField, FilterValue,
    InteractionQuery, InvalidationScope, QueryKey, SortDirection, SortField,
};
pub use client::{InteractionsClient, QueryResult};
pub use config::{Config, ConfigBuilder, TelemetryConfig};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StorageScope};
pub use error::{Error, Result};
#[cfg(feature = "http")]
pub use gateway::HttpGateway;
pub use gateway::{Gateway, GatewayOp, InMemoryGateway, RequestContext, TracedGateway};
pub use mutation::MutationCoordinator;
pub use session::{LogoutReason, ObserverId, SessionState};
pub use tenant::{SiteContext, SiteContextManager};
pub use types::*;
