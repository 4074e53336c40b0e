//! Client facade tying session, site context, cache and mutations together

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cache::{CacheKey, CacheSet, CacheStats, InteractionQuery, Lookup, QueryKey};
use crate::config::Config;
use crate::constants::AUTH_TOKEN_KEY;
use crate::credentials::{CredentialStore, MemoryCredentialStore, StorageScope};
use crate::error::{Error, Result};
use crate::gateway::{Gateway, RequestContext, TracedGateway};
use crate::mutation::MutationCoordinator;
use crate::session::{LogoutObservers, LogoutReason, ObserverId, Session, SessionCell, SessionState};
use crate::tenant::{SiteContext, SiteContextManager};
use crate::types::{
    AuthenticatedUser, Credentials, Interaction, InteractionDraft, InteractionId,
    InteractionPage, InteractionPatch, Site, SiteId,
};

struct ClientInner {
    config: Config,
    gateway: Arc<dyn Gateway>,
    session: Arc<SessionCell>,
    store: Arc<dyn CredentialStore>,
    caches: CacheSet,
    sites: SiteContextManager,
    mutations: MutationCoordinator,
    observers: LogoutObservers,
}

/// Site-aware client for the Interaction Management API.
///
/// Cloning is cheap; clones share the session, the cache and the observers.
///
/// # Example
///
/// ```no_run
/// use interactions_client::{
///     Config, Credentials, InMemoryGateway, InteractionQuery, InteractionsClient,
/// };
///
/// # async fn run() -> interactions_client::Result<()> {
/// let client = InteractionsClient::in_memory(Config::default(), InMemoryGateway::new())?;
/// client.login(Credentials::new("ada", "secret"), false).await?;
/// let result = client.query_interactions(&InteractionQuery::new().search("review")).await;
/// if let Some(page) = result.data() {
///     println!("{} interactions", page.pagination.total_records);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InteractionsClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for InteractionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionsClient")
            .field("state", &self.inner.session.state())
            .field("current_site", &self.inner.session.current_site_id())
            .field("caches", &self.inner.caches)
            .finish_non_exhaustive()
    }
}

impl InteractionsClient {
    /// Create a client over `gateway`. Every gateway call is bounded by
    /// `config.request_timeout`.
    pub fn new<G>(config: Config, gateway: G, store: Arc<dyn CredentialStore>) -> Result<Self>
    where
        G: Gateway + 'static,
    {
        config.validate()?;

        let gateway: Arc<dyn Gateway> =
            Arc::new(TracedGateway::new(gateway, config.request_timeout));
        let session = Arc::new(SessionCell::new());
        let caches = CacheSet::new(config.cache);
        let sites = SiteContextManager::new(
            Arc::clone(&gateway),
            Arc::clone(&session),
            Arc::clone(&store),
            caches.clone(),
            config.persist_preferred_site,
        );
        let mutations =
            MutationCoordinator::new(Arc::clone(&gateway), Arc::clone(&session), caches.clone());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                gateway,
                session,
                store,
                caches,
                sites,
                mutations,
                observers: LogoutObservers::default(),
            }),
        })
    }

    /// Client whose credentials and preferences live only in memory
    pub fn in_memory<G>(config: Config, gateway: G) -> Result<Self>
    where
        G: Gateway + 'static,
    {
        Self::new(config, gateway, Arc::new(MemoryCredentialStore::new()))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // Session

    /// Authenticate and select the initial site.
    ///
    /// With `remember` the token is stored durably; otherwise it lives for
    /// the session only. An account without accessible sites still logs in;
    /// the returned context carries [`Error::NoSiteAccess`].
    pub async fn login(&self, credentials: Credentials, remember: bool) -> Result<SiteContext> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }

        let span = tracing::info_span!("client.login", username = %credentials.username);
        async move {
            let generation = self.inner.session.begin_login();
            self.inner.caches.clear();
            let response = match self.inner.gateway.login(&credentials).await {
                Ok(response) => response,
                Err(err) => {
                    self.inner.session.fail_login(generation, err.clone());
                    tracing::warn!(error = %err, "Login failed");
                    return Err(err);
                }
            };

            let scope = if remember {
                StorageScope::Durable
            } else {
                StorageScope::Session
            };
            if let Err(err) =
                self.inner
                    .store
                    .set(scope, AUTH_TOKEN_KEY, &response.access_token, None)
            {
                tracing::warn!(error = %err, "Failed to store auth token");
            }

            self.inner.session.complete_login(
                generation,
                Some(response.user.clone()),
                response.access_token,
            )?;
            tracing::info!(user_id = %response.user.id, "Logged in");

            self.establish_site().await
        }
        .instrument(span)
        .await
    }

    /// Resume a session from a stored token. Returns `Ok(None)` when no
    /// token is stored.
    pub async fn resume(&self) -> Result<Option<SiteContext>> {
        let token = match self.inner.store.get(AUTH_TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read stored token");
                return Ok(None);
            }
        };

        let generation = self.inner.session.begin_login();
        self.inner.caches.clear();
        self.inner.session.complete_login(generation, None, token)?;
        tracing::debug!("Resuming stored session");
        self.establish_site().await.map(Some)
    }

    async fn establish_site(&self) -> Result<SiteContext> {
        match self.observe(self.inner.sites.initialize().await) {
            Ok(_) | Err(Error::NoSiteAccess) => Ok(self.inner.sites.snapshot()),
            Err(err) => Err(err),
        }
    }

    /// End the session. Local state is cleared even when the server call
    /// fails; calling it without a session is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let ctx = self.inner.session.auth_context().ok();
        if self.end_session(LogoutReason::Requested).is_none() {
            return Ok(());
        }

        if let Some(ctx) = ctx
            && let Err(err) = self.inner.gateway.logout(&ctx).await
        {
            tracing::warn!(error = %err, "Server logout failed");
        }
        tracing::info!("Logged out");
        Ok(())
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.inner.session.user()
    }

    pub fn register_logout_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(LogoutReason) + Send + Sync + 'static,
    {
        self.inner.observers.register(observer)
    }

    /// Returns whether the observer was registered
    pub fn unregister_logout_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.unregister(id)
    }

    fn end_session(&self, reason: LogoutReason) -> Option<Session> {
        let session = self.inner.sites.on_logout();
        if let Err(err) = self.inner.store.remove(AUTH_TOKEN_KEY) {
            tracing::warn!(error = %err, "Failed to remove stored token");
        }
        if let Err(err) = self.inner.store.clear_session() {
            tracing::warn!(error = %err, "Failed to clear session storage");
        }

        if session.is_some() {
            tracing::info!(reason = ?reason, "Session ended");
            self.inner.observers.notify(reason);
        }
        session
    }

    /// Tear the session down when the API rejected its credentials
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_authentication()
        {
            tracing::warn!(error = %err, "Session rejected by server");
            self.end_session(LogoutReason::SessionExpired);
        }
        result
    }

    // Sites

    #[must_use]
    pub fn site_context(&self) -> SiteContext {
        self.inner.sites.snapshot()
    }

    #[must_use]
    pub fn current_site_id(&self) -> Option<SiteId> {
        self.inner.session.current_site_id()
    }

    pub async fn switch_site(&self, site_id: SiteId) -> Result<Site> {
        self.observe(self.inner.sites.switch_site(site_id).await)
    }

    pub async fn reload_sites(&self) -> Result<SiteContext> {
        self.observe(self.inner.sites.reload_sites().await)
    }

    // Queries

    /// Interactions of the active site matching `query`
    pub async fn query_interactions(&self, query: &InteractionQuery) -> QueryResult {
        self.run_query(query, None, false).await
    }

    /// Like [`query_interactions`](Self::query_interactions); a result that
    /// arrives after `liveness` is cancelled is discarded.
    pub async fn query_interactions_with(
        &self,
        query: &InteractionQuery,
        liveness: &CancellationToken,
    ) -> QueryResult {
        self.run_query(query, Some(liveness), false).await
    }

    /// Fetch `query` from the gateway regardless of freshness
    pub async fn refetch(&self, query: &InteractionQuery) -> QueryResult {
        self.run_query(query, None, true).await
    }

    async fn run_query(
        &self,
        query: &InteractionQuery,
        liveness: Option<&CancellationToken>,
        force: bool,
    ) -> QueryResult {
        let result = QueryResult {
            client: self.clone(),
            query: query.clone(),
            data: None,
            is_loading: false,
            is_stale: false,
            error: None,
        };

        let (ctx, key) = match self.list_key(query) {
            Ok(parts) => parts,
            Err(err) => return result.failed(err),
        };
        let site_id = key.site_id();
        let cache_key = CacheKey::List(key.clone());

        let gateway = Arc::clone(&self.inner.gateway);
        let fetch = move || async move { gateway.list_interactions(&ctx, &key).await };
        let lists = self.inner.caches.lists();
        let outcome = if force {
            lists.refetch(&cache_key, liveness, fetch).await
        } else {
            lists.get(&cache_key, liveness, fetch).await
        };

        let outcome = self.observe(outcome);
        let site_unchanged = self.inner.session.current_site_id() == Some(site_id);

        match outcome {
            Ok(lookup) if site_unchanged => result.loaded(lookup),
            Ok(_) => {
                tracing::debug!(site_id = %site_id, "Active site changed during query");
                result.failed(Error::Cancelled)
            }
            Err(err) => {
                let cached = if site_unchanged && !err.requires_login() {
                    lists.peek(&cache_key)
                } else {
                    None
                };
                QueryResult {
                    data: cached,
                    ..result.failed(err)
                }
            }
        }
    }

    fn list_key(&self, query: &InteractionQuery) -> Result<(RequestContext, QueryKey)> {
        let ctx = self.inner.session.request_context()?;
        let site_id = ctx.site_id.ok_or(Error::NoSiteAccess)?;
        let key = QueryKey::new(site_id, query)?;
        Ok((ctx, key))
    }

    /// One interaction of the active site
    pub async fn get_interaction(&self, id: InteractionId) -> Result<Arc<Interaction>> {
        let ctx = self.inner.session.request_context()?;
        let site_id = ctx.site_id.ok_or(Error::NoSiteAccess)?;
        let key = CacheKey::record(site_id, id);

        let gateway = Arc::clone(&self.inner.gateway);
        let lookup = self
            .inner
            .caches
            .records()
            .get(&key, None, move || async move {
                gateway.get_interaction(&ctx, id).await
            })
            .await;
        self.observe(lookup).map(|lookup| lookup.value)
    }

    // Mutations

    pub async fn create_interaction(&self, draft: InteractionDraft) -> Result<Interaction> {
        self.observe(self.inner.mutations.create(draft).await)
    }

    pub async fn update_interaction(
        &self,
        id: InteractionId,
        patch: InteractionPatch,
    ) -> Result<Interaction> {
        self.observe(self.inner.mutations.update(id, patch).await)
    }

    pub async fn delete_interaction(&self, id: InteractionId) -> Result<()> {
        self.observe(self.inner.mutations.delete(id).await)
    }

    // Cache introspection

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.caches.stats()
    }

    #[must_use]
    pub fn cache_entry_count(&self) -> usize {
        self.inner.caches.entry_count()
    }

    #[must_use]
    pub fn cached_keys(&self) -> Vec<CacheKey> {
        self.inner.caches.keys()
    }
}

/// Outcome of a list query.
///
/// A failed query still carries the last cached page for its key, if any.
#[derive(Debug, Clone)]
pub struct QueryResult {
    client: InteractionsClient,
    query: InteractionQuery,
    data: Option<Arc<InteractionPage>>,
    is_loading: bool,
    is_stale: bool,
    error: Option<Error>,
}

impl QueryResult {
    fn loaded(self, lookup: Lookup<InteractionPage>) -> Self {
        Self {
            is_stale: lookup.is_stale(),
            is_loading: lookup.refreshing,
            data: Some(lookup.value),
            error: lookup.last_error,
            ..self
        }
    }

    fn failed(self, error: Error) -> Self {
        Self {
            error: Some(error),
            ..self
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&Arc<InteractionPage>> {
        self.data.as_ref()
    }

    /// Whether a background refresh is running
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the data is older than the staleness window
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.is_stale
    }

    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub const fn query(&self) -> &InteractionQuery {
        &self.query
    }

    /// Run the same query again against the gateway
    pub async fn refetch(&self) -> Self {
        self.client.refetch(&self.query).await
    }

    /// Data or the error, dropping the cached fallback of a failed query
    pub fn into_result(self) -> Result<Arc<InteractionPage>> {
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(Error::Unknown("query produced no data".into())),
        }
    }
}
