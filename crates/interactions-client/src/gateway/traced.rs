//! Traced, time-bounded gateway wrapper

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use super::{Gateway, RequestContext};
use crate::cache::QueryKey;
use crate::error::{Error, Result};
use crate::types::{
    Credentials, Interaction, InteractionId, InteractionPage, InteractionPatch, LoginResponse,
    NewInteraction, Site, SiteId,
};

/// Wrapper that adds a debug span and a timeout to every call of a [`Gateway`].
///
/// An expired timeout yields [`Error::Timeout`]; the inner call is dropped.
#[derive(Debug, Clone)]
pub struct TracedGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G> TracedGateway<G> {
    pub const fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn inner(&self) -> &G {
        &self.inner
    }

    async fn bounded<T, F>(&self, span: tracing::Span, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.timeout;
        async move {
            let result = tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| Error::Timeout(timeout))
                .and_then(|r| r);

            match &result {
                Ok(_) => tracing::debug!(gateway.result = "ok"),
                Err(e) if e.is_timeout() => {
                    tracing::warn!(gateway.result = "timeout", timeout_ms = timeout.as_millis());
                }
                Err(e) => tracing::debug!(gateway.result = "error", error = %e),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<G: Gateway> Gateway for TracedGateway<G> {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let span = tracing::debug_span!("gateway.login", username = %credentials.username);
        self.bounded(span, self.inner.login(credentials)).await
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<()> {
        let span = tracing::debug_span!("gateway.logout");
        self.bounded(span, self.inner.logout(ctx)).await
    }

    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>> {
        let span = tracing::debug_span!("gateway.list_sites");
        self.bounded(span, self.inner.list_sites(ctx)).await
    }

    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site> {
        let span = tracing::debug_span!("gateway.set_site", site_id = %site_id);
        self.bounded(span, self.inner.set_site(ctx, site_id)).await
    }

    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage> {
        let span = tracing::debug_span!("gateway.list_interactions", query = %query);
        self.bounded(span, self.inner.list_interactions(ctx, query))
            .await
    }

    async fn get_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
    ) -> Result<Interaction> {
        let span = tracing::debug_span!("gateway.get_interaction", interaction_id = %id);
        self.bounded(span, self.inner.get_interaction(ctx, id)).await
    }

    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction> {
        let span =
            tracing::debug_span!("gateway.create_interaction", site_id = %interaction.site_id);
        self.bounded(span, self.inner.create_interaction(ctx, interaction))
            .await
    }

    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction> {
        let span = tracing::debug_span!("gateway.update_interaction", interaction_id = %id);
        self.bounded(span, self.inner.update_interaction(ctx, id, patch))
            .await
    }

    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()> {
        let span = tracing::debug_span!("gateway.delete_interaction", interaction_id = %id);
        self.bounded(span, self.inner.delete_interaction(ctx, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::types::Site;

    fn gateway(latency: Duration) -> InMemoryGateway {
        InMemoryGateway::new()
            .with_site(Site::new(1, "North"))
            .with_user("ada", "secret", &[SiteId(1)])
            .with_latency(latency)
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let traced = TracedGateway::new(gateway(Duration::from_secs(5)), Duration::from_secs(1));
        let err = traced
            .login(&Credentials::new("ada", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Timeout(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_passes_through() {
        let traced =
            TracedGateway::new(gateway(Duration::from_millis(10)), Duration::from_secs(1));
        let login = traced
            .login(&Credentials::new("ada", "secret"))
            .await
            .unwrap();
        assert_eq!(login.user.username, "ada");
    }

    #[tokio::test]
    async fn test_inner_error_preserved() {
        let traced = TracedGateway::new(gateway(Duration::ZERO), Duration::from_secs(1));
        let err = traced
            .login(&Credentials::new("ada", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }
}
