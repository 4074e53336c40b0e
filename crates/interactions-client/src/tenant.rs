//! Site context: which site partition the session is scoped to
//!
//! The manager owns the selection policy (stored preference if still
//! accessible, otherwise the first accessible site), serializes site
//! switches, and clears the cache whenever the active site changes so no
//! entry of one site outlives a switch to another.

use std::sync::Arc;

use crate::cache::CacheSet;
use crate::constants::PREFERRED_SITE_KEY;
use crate::credentials::{CredentialStore, StorageScope};
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::session::{Session, SessionCell, SessionState, SwitchStart, SwitchTicket};
use crate::types::{Site, SiteId};

/// Snapshot of the site context for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    pub current_site: Option<Site>,
    pub sites: Vec<Site>,
    pub loading: bool,
    pub error: Option<Error>,
    pub state: SessionState,
}

impl SiteContext {
    #[must_use]
    pub fn current_site_id(&self) -> Option<SiteId> {
        self.current_site.as_ref().map(|s| s.id)
    }

    #[must_use]
    pub fn has_access(&self, site_id: SiteId) -> bool {
        self.sites.iter().any(|s| s.id == site_id)
    }
}

/// Switch in progress; restores the previous site if dropped unfinished
struct PendingSwitch<'a> {
    session: &'a SessionCell,
    ticket: Option<SwitchTicket>,
}

impl PendingSwitch<'_> {
    fn complete(mut self, outcome: Result<()>) -> bool {
        self.ticket
            .take()
            .is_some_and(|ticket| self.session.finish_switch(ticket, outcome))
    }
}

impl Drop for PendingSwitch<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            tracing::debug!(target_site = %ticket.target, "Site switch abandoned");
            self.session.finish_switch(ticket, Err(Error::Cancelled));
        }
    }
}

/// Tracks the active site and the accessible-site list
#[derive(Clone)]
pub struct SiteContextManager {
    gateway: Arc<dyn Gateway>,
    session: Arc<SessionCell>,
    store: Arc<dyn CredentialStore>,
    caches: CacheSet,
    persist_preference: bool,
}

impl std::fmt::Debug for SiteContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteContextManager")
            .field("state", &self.session.state())
            .field("current_site", &self.session.current_site_id())
            .field("store", &self.store)
            .field("persist_preference", &self.persist_preference)
            .finish_non_exhaustive()
    }
}

impl SiteContextManager {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        session: Arc<SessionCell>,
        store: Arc<dyn CredentialStore>,
        caches: CacheSet,
        persist_preference: bool,
    ) -> Self {
        Self {
            gateway,
            session,
            store,
            caches,
            persist_preference,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SiteContext {
        SiteContext {
            current_site: self.session.current_site(),
            sites: self.session.sites(),
            loading: self.session.is_loading(),
            error: self.session.last_error(),
            state: self.session.state(),
        }
    }

    /// Load the accessible sites for a freshly authenticated session and
    /// select one
    pub async fn initialize(&self) -> Result<Site> {
        let generation = self.session.generation();
        let ctx = self.session.auth_context()?;

        let sites = match self.gateway.list_sites(&ctx).await {
            Ok(sites) => sites,
            Err(err) => {
                self.session.record_error(generation, err.clone());
                return Err(err);
            }
        };
        self.apply_sites(generation, sites)
    }

    /// Re-fetch the accessible sites. The active site is kept when still
    /// accessible; otherwise a new one is selected and the cache cleared.
    pub async fn reload_sites(&self) -> Result<SiteContext> {
        if self.session.state() == SessionState::SwitchingTenant {
            return Err(Error::TenantSwitchInProgress);
        }
        let generation = self.session.generation();
        let ctx = self.session.auth_context()?;

        let sites = match self.gateway.list_sites(&ctx).await {
            Ok(sites) => sites,
            Err(err) => {
                self.session.record_error(generation, err.clone());
                return Err(err);
            }
        };
        self.apply_sites(generation, sites)?;
        Ok(self.snapshot())
    }

    /// Make `site_id` the active site.
    ///
    /// Fails with [`Error::TenantSwitchInProgress`] while another switch runs
    /// and [`Error::TenantNotAccessible`] for a site outside the list. On a
    /// gateway failure the previous site stays active and the error is
    /// returned unchanged.
    pub async fn switch_site(&self, site_id: SiteId) -> Result<Site> {
        let ticket = match self.session.begin_switch(site_id)? {
            SwitchStart::AlreadyActive(site) => {
                tracing::debug!(site_id = %site_id, "Site already active");
                return Ok(site);
            }
            SwitchStart::Started(ticket) => ticket,
        };
        let previous = ticket.previous;
        let pending = PendingSwitch {
            session: &self.session,
            ticket: Some(ticket),
        };

        let outcome = match self.session.auth_context() {
            Ok(ctx) => self.gateway.set_site(&ctx, site_id).await,
            Err(err) => Err(err),
        }
        .and_then(|site| {
            if site.id == site_id {
                Ok(site)
            } else {
                Err(Error::Authorization(format!(
                    "requested site {site_id}, server selected site {}",
                    site.id
                )))
            }
        });

        match outcome {
            Ok(site) => {
                self.caches.clear();
                if !pending.complete(Ok(())) {
                    return Err(Error::NotAuthenticated);
                }
                self.remember_site(site_id);
                tracing::info!(
                    site_id = %site_id,
                    previous_site = ?previous,
                    "Switched active site"
                );
                Ok(site)
            }
            Err(err) => {
                pending.complete(Err(err.clone()));
                tracing::warn!(site_id = %site_id, error = %err, "Site switch failed");
                Err(err)
            }
        }
    }

    /// Drop the site list, the active site and every cache entry
    pub fn on_logout(&self) -> Option<Session> {
        let session = self.session.teardown();
        self.caches.clear();
        session
    }

    fn apply_sites(&self, generation: u64, sites: Vec<Site>) -> Result<Site> {
        let sites: Vec<Site> = sites.into_iter().filter(|s| s.active).collect();
        let preferred = self.preferred_site();

        let selection = self.session.install_sites(generation, sites, |sites, current| {
            select_site(sites, current, preferred)
        })?;
        let Some(site) = selection.site else {
            self.caches.clear();
            tracing::warn!("Account has no accessible sites");
            return Err(Error::NoSiteAccess);
        };

        if selection.previous.is_some_and(|id| id != site.id) {
            tracing::info!(
                previous_site = ?selection.previous,
                site_id = %site.id,
                "Active site no longer accessible"
            );
            self.caches.clear();
        }
        if preferred != Some(site.id) {
            self.remember_site(site.id);
        }
        tracing::info!(site_id = %site.id, site_name = %site.name, "Site selected");
        Ok(site)
    }

    fn preferred_site(&self) -> Option<SiteId> {
        match self.store.get(PREFERRED_SITE_KEY) {
            Ok(value) => value.and_then(|v| v.trim().parse::<i64>().ok()).map(SiteId),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read preferred site");
                None
            }
        }
    }

    fn remember_site(&self, site_id: SiteId) {
        if !self.persist_preference {
            return;
        }
        if let Err(err) = self.store.set(
            StorageScope::Durable,
            PREFERRED_SITE_KEY,
            &site_id.to_string(),
            None,
        ) {
            tracing::warn!(site_id = %site_id, error = %err, "Failed to persist preferred site");
        }
    }
}

/// Active site if still accessible, else the preference if accessible, else
/// the first site
fn select_site(
    sites: &[Site],
    current: Option<SiteId>,
    preferred: Option<SiteId>,
) -> Option<SiteId> {
    let accessible = |id: &SiteId| sites.iter().any(|s| s.id == *id);
    current
        .filter(accessible)
        .or_else(|| preferred.filter(accessible))
        .or_else(|| sites.first().map(|s| s.id))
}
