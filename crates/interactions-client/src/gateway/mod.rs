//! Request/response gateway to the Interaction Management API
//!
//! The core only talks to [`Gateway`]. [`TracedGateway`] adds a tracing span
//! and a timeout around every call. [`InMemoryGateway`] serves an in-process
//! data set with the API's site rules, and `HttpGateway` (feature `http`)
//! speaks JSON over `reqwest`.

#[cfg(feature = "http")]
mod http;
mod memory;
mod traced;
#[cfg(feature = "http")]
mod wire;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

#[cfg(feature = "http")]
pub use http::HttpGateway;
pub use memory::{GatewayOp, InMemoryGateway};
pub use traced::TracedGateway;

use crate::cache::QueryKey;
use crate::error::Result;
use crate::types::{
    Credentials, Interaction, InteractionId, InteractionPage, InteractionPatch, LoginResponse,
    NewInteraction, Site, SiteId,
};

/// Credentials and site scope attached to an authenticated call
#[derive(Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub token: String,
    pub site_id: Option<SiteId>,
}

impl RequestContext {
    pub fn new(token: impl Into<String>, site_id: Option<SiteId>) -> Self {
        Self {
            token: token.into(),
            site_id,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("site_id", &self.site_id)
            .finish_non_exhaustive()
    }
}

/// Remote API operations
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    /// `POST /auth/logout`
    async fn logout(&self, ctx: &RequestContext) -> Result<()>;

    /// `GET /auth/sites`
    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>>;

    /// `POST /auth/site`; returns the site the server made current
    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site>;

    /// `GET /interactions`
    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage>;

    /// `GET /interactions/:id`
    async fn get_interaction(&self, ctx: &RequestContext, id: InteractionId)
    -> Result<Interaction>;

    /// `POST /interactions`
    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction>;

    /// `PUT /interactions/:id`
    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction>;

    /// `DELETE /interactions/:id`
    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        (**self).login(credentials).await
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<()> {
        (**self).logout(ctx).await
    }

    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>> {
        (**self).list_sites(ctx).await
    }

    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site> {
        (**self).set_site(ctx, site_id).await
    }

    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage> {
        (**self).list_interactions(ctx, query).await
    }

    async fn get_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
    ) -> Result<Interaction> {
        (**self).get_interaction(ctx, id).await
    }

    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction> {
        (**self).create_interaction(ctx, interaction).await
    }

    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction> {
        (**self).update_interaction(ctx, id, patch).await
    }

    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()> {
        (**self).delete_interaction(ctx, id).await
    }
}
