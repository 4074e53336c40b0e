//! JSON-over-HTTP gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use url::Url;

use super::wire::{
    Envelope, ListResponse, RecordBody, SetSiteRequest, SetSiteResponse, SitesBody, error_detail,
};
use super::{Gateway, RequestContext};
use crate::cache::QueryKey;
use crate::config::Config;
use crate::constants::SITE_CONTEXT_HEADER;
use crate::error::{Error, Result};
use crate::types::{
    Credentials, Interaction, InteractionId, InteractionPage, InteractionPatch, LoginResponse,
    NewInteraction, Site, SiteId,
};

/// Gateway speaking the API's JSON protocol over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url`; relative endpoint paths are
    /// resolved below it.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("invalid API base URL: {base_url}")));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("API base URL is not configured".into()))?;
        Self::new(base_url, config.request_timeout)
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }

    fn list_url(&self, query: &QueryKey) -> Result<Url> {
        let mut url = self.endpoint("interactions")?;
        url.query_pairs_mut().extend_pairs(query.to_query_pairs());
        Ok(url)
    }

    fn authed(builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
        let builder = builder.bearer_auth(&ctx.token);
        match ctx.site_id {
            Some(site_id) => builder.header(SITE_CONTEXT_HEADER, site_id.to_string()),
            None => builder,
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Network(err.to_string())
        }
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::from_status(status.as_u16(), &error_detail(&body)))
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send_raw(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let request = self
            .client
            .post(self.endpoint("auth/login")?)
            .json(credentials);
        Ok(self.send::<Envelope<LoginResponse>>(request).await?.into_inner())
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<()> {
        let request = Self::authed(self.client.post(self.endpoint("auth/logout")?), ctx);
        self.send_raw(request).await.map(drop)
    }

    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>> {
        let request = Self::authed(self.client.get(self.endpoint("auth/sites")?), ctx);
        Ok(self.send::<Envelope<SitesBody>>(request).await?.into_inner().sites)
    }

    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site> {
        let request = Self::authed(self.client.post(self.endpoint("auth/site")?), ctx)
            .json(&SetSiteRequest { site_id });
        let response = self
            .send::<Envelope<SetSiteResponse>>(request)
            .await?
            .into_inner();

        if !response.success {
            return Err(Error::Authorization(
                response
                    .message
                    .unwrap_or_else(|| format!("site {site_id} was not accepted")),
            ));
        }
        response
            .current_site
            .ok_or_else(|| Error::Unknown("site change response has no current site".into()))
    }

    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage> {
        let request = Self::authed(self.client.get(self.list_url(query)?), ctx);
        Ok(self.send::<ListResponse>(request).await?.into_page(query))
    }

    async fn get_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
    ) -> Result<Interaction> {
        let url = self.endpoint(&format!("interactions/{id}"))?;
        let request = Self::authed(self.client.get(url), ctx);
        Ok(self
            .send::<Envelope<RecordBody>>(request)
            .await?
            .into_inner()
            .interaction)
    }

    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction> {
        let request = Self::authed(self.client.post(self.endpoint("interactions")?), ctx)
            .json(interaction);
        Ok(self
            .send::<Envelope<RecordBody>>(request)
            .await?
            .into_inner()
            .interaction)
    }

    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction> {
        let url = self.endpoint(&format!("interactions/{id}"))?;
        let request = Self::authed(self.client.put(url), ctx).json(patch);
        Ok(self
            .send::<Envelope<RecordBody>>(request)
            .await?
            .into_inner()
            .interaction)
    }

    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()> {
        let url = self.endpoint(&format!("interactions/{id}"))?;
        let request = Self::authed(self.client.delete(url), ctx);
        self.send_raw(request).await.map(drop)
    }
}
