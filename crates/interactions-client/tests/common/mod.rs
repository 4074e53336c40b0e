//! Fixtures shared by the integration scenarios

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use interactions_client::{
    CacheConfig, Config, Credentials, CredentialStore, Gateway, InMemoryGateway, Interaction,
    InteractionId, InteractionPage, InteractionPatch, InteractionType, InteractionsClient,
    LoginResponse, MemoryCredentialStore, NewInteraction, QueryKey, RequestContext, Result, Site,
    SiteId,
};

pub const USER: &str = "ada";
pub const PASSWORD: &str = "secret";

/// Gateway with sites 1, 2 and 3 and one user who can access `access`
pub fn gateway(access: &[i64]) -> InMemoryGateway {
    let ids: Vec<SiteId> = access.iter().copied().map(SiteId).collect();
    InMemoryGateway::new()
        .with_site(Site::new(1, "North Campus"))
        .with_site(Site::new(2, "South Campus"))
        .with_site(Site::new(3, "Downtown"))
        .with_user(USER, PASSWORD, &ids)
}

pub fn record(id: i64, site: i64, title: &str) -> Interaction {
    let start = Utc
        .with_ymd_and_hms(2024, 4, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
        + chrono::Duration::hours(id);
    Interaction {
        id: InteractionId(id),
        site_id: SiteId(site),
        title: title.to_string(),
        interaction_type: InteractionType::Meeting,
        lead: "Grace".to_string(),
        start_datetime: start,
        timezone: "UTC".to_string(),
        end_datetime: None,
        location: None,
        description: None,
        notes: None,
        created_by: None,
        created_at: Some(start),
        updated_by: None,
        updated_at: Some(start),
    }
}

/// Insert `count` records into `site`, with ids starting at `first_id`
pub fn seed(gateway: &InMemoryGateway, site: i64, first_id: i64, count: i64) {
    for id in first_id..first_id + count {
        gateway.insert_interaction(record(id, site, &format!("Interaction {id}")));
    }
}

pub fn config() -> Config {
    Config::default()
}

pub fn config_with_staleness(window: Duration) -> Config {
    Config {
        cache: CacheConfig::default().with_staleness_window(window),
        ..Config::default()
    }
}

pub fn client<G: Gateway + 'static>(gateway: G) -> InteractionsClient {
    InteractionsClient::in_memory(config(), gateway).unwrap()
}

pub fn client_with_store<G: Gateway + 'static>(
    gateway: G,
    store: Arc<dyn CredentialStore>,
) -> InteractionsClient {
    InteractionsClient::new(config(), gateway, store).unwrap()
}

pub fn memory_store() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::new())
}

pub async fn login(client: &InteractionsClient) {
    client
        .login(Credentials::new(USER, PASSWORD), false)
        .await
        .unwrap();
}

/// Gateway that slips a record of another site into every list page
#[derive(Debug, Clone)]
pub struct LeakyGateway {
    pub inner: InMemoryGateway,
    pub foreign: Interaction,
}

#[async_trait]
impl Gateway for LeakyGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        self.inner.login(credentials).await
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<()> {
        self.inner.logout(ctx).await
    }

    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>> {
        self.inner.list_sites(ctx).await
    }

    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site> {
        self.inner.set_site(ctx, site_id).await
    }

    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage> {
        let mut page = self.inner.list_interactions(ctx, query).await?;
        page.interactions.push(self.foreign.clone());
        Ok(page)
    }

    async fn get_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
    ) -> Result<Interaction> {
        if id == self.foreign.id {
            return Ok(self.foreign.clone());
        }
        self.inner.get_interaction(ctx, id).await
    }

    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction> {
        let mut created = self.inner.create_interaction(ctx, interaction).await?;
        created.site_id = self.foreign.site_id;
        Ok(created)
    }

    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction> {
        self.inner.update_interaction(ctx, id, patch).await
    }

    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()> {
        self.inner.delete_interaction(ctx, id).await
    }
}
