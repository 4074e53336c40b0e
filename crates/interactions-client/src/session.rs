//! Session state machine and logout observers

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::gateway::RequestContext;
use crate::types::{AuthenticatedUser, Site, SiteId};

/// Lifecycle state of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    /// Logged in, no site selected yet (or none accessible)
    AuthenticatedNoTenant,
    AuthenticatedWithTenant,
    SwitchingTenant,
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(
            self,
            Self::AuthenticatedNoTenant | Self::AuthenticatedWithTenant | Self::SwitchingTenant
        )
    }

    /// Whether site-scoped data may be read in this state
    #[must_use]
    pub const fn can_serve_cached_data(self) -> bool {
        matches!(self, Self::AuthenticatedWithTenant)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::AuthenticatedNoTenant => "authenticated_no_tenant",
            Self::AuthenticatedWithTenant => "authenticated_with_tenant",
            Self::SwitchingTenant => "switching_tenant",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated session
#[derive(Clone)]
pub struct Session {
    /// `None` when the session was resumed from a stored token
    pub user: Option<AuthenticatedUser>,
    token: String,
    pub current_site: Option<SiteId>,
}

impl Session {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("current_site", &self.current_site)
            .finish_non_exhaustive()
    }
}

/// Proof that a switch was started under a given session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchTicket {
    generation: u64,
    pub previous: Option<SiteId>,
    pub target: SiteId,
}

/// Outcome of asking to start a switch
#[derive(Debug)]
pub enum SwitchStart {
    /// Target is already the active site
    AlreadyActive(Site),
    Started(SwitchTicket),
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    session: Option<Session>,
    sites: Vec<Site>,
    loading: bool,
    last_error: Option<Error>,
    /// Bumped on every login and teardown; stale async work compares against it
    generation: u64,
}

impl SessionInner {
    fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    /// Site-list updates apply only to the session they were fetched for,
    /// and never while a switch owns the active site
    fn check_settled(&self, generation: u64) -> Result<()> {
        if self.generation != generation || !self.state.is_authenticated() {
            return Err(Error::Cancelled);
        }
        if self.state == SessionState::SwitchingTenant {
            return Err(Error::TenantSwitchInProgress);
        }
        Ok(())
    }
}

/// Outcome of [`SessionCell::install_sites`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelection {
    /// Site that was current before the list was replaced
    pub previous: Option<SiteId>,
    /// Newly current site; `None` when no site is accessible
    pub site: Option<Site>,
}

/// Shared, lock-protected session state.
///
/// Every transition that completes asynchronous work takes the generation it
/// started under and is ignored when the session was torn down or replaced
/// in the meantime.
#[derive(Debug, Default)]
pub struct SessionCell {
    inner: RwLock<SessionInner>,
}

impl SessionCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    #[must_use]
    pub fn current_site_id(&self) -> Option<SiteId> {
        let inner = self.inner.read();
        if inner.state == SessionState::AuthenticatedWithTenant {
            inner.session.as_ref().and_then(|s| s.current_site)
        } else {
            None
        }
    }

    #[must_use]
    pub fn current_site(&self) -> Option<Site> {
        let inner = self.inner.read();
        inner
            .session
            .as_ref()
            .and_then(|s| s.current_site)
            .and_then(|id| inner.site(id).cloned())
    }

    #[must_use]
    pub fn sites(&self) -> Vec<Site> {
        self.inner.read().sites.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<Error> {
        self.inner.read().last_error.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.inner
            .read()
            .session
            .as_ref()
            .and_then(|s| s.user.clone())
    }

    /// Enter `Authenticating`; returns the generation of the new attempt
    pub fn begin_login(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = SessionState::Authenticating;
        inner.session = None;
        inner.sites.clear();
        inner.loading = true;
        inner.last_error = None;
        inner.generation
    }

    pub fn fail_login(&self, generation: u64, error: Error) {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return;
        }
        inner.state = SessionState::Unauthenticated;
        inner.session = None;
        inner.loading = false;
        inner.last_error = Some(error);
    }

    /// Enter `AuthenticatedNoTenant` with a fresh session
    pub fn complete_login(
        &self,
        generation: u64,
        user: Option<AuthenticatedUser>,
        token: String,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return Err(Error::Cancelled);
        }
        inner.state = SessionState::AuthenticatedNoTenant;
        inner.session = Some(Session {
            user,
            token,
            current_site: None,
        });
        inner.loading = true;
        Ok(())
    }

    pub fn set_sites(&self, generation: u64, sites: Vec<Site>) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_settled(generation)?;
        inner.sites = sites;
        Ok(())
    }

    /// Make `site_id` current; it must be in the accessible list
    pub fn select_site(&self, generation: u64, site_id: SiteId) -> Result<Site> {
        let mut inner = self.inner.write();
        inner.check_settled(generation)?;
        let site = inner
            .site(site_id)
            .cloned()
            .ok_or(Error::TenantNotAccessible(site_id))?;
        if let Some(session) = inner.session.as_mut() {
            session.current_site = Some(site_id);
        }
        inner.state = SessionState::AuthenticatedWithTenant;
        inner.loading = false;
        inner.last_error = None;
        Ok(site)
    }

    /// Replace the accessible-site list and pick the current site in one step.
    ///
    /// `choose` gets the new list and the site current so far. An empty
    /// choice leaves the session in `AuthenticatedNoTenant` with
    /// [`Error::NoSiteAccess`]. Rejected with
    /// [`Error::TenantSwitchInProgress`] while a switch runs.
    pub fn install_sites<F>(
        &self,
        generation: u64,
        sites: Vec<Site>,
        choose: F,
    ) -> Result<SiteSelection>
    where
        F: FnOnce(&[Site], Option<SiteId>) -> Option<SiteId>,
    {
        let mut inner = self.inner.write();
        inner.check_settled(generation)?;

        let previous = inner.session.as_ref().and_then(|s| s.current_site);
        let chosen = choose(&sites, previous);
        inner.sites = sites;
        let site = chosen.and_then(|id| inner.site(id).cloned());

        if let Some(session) = inner.session.as_mut() {
            session.current_site = site.as_ref().map(|s| s.id);
        }
        if site.is_some() {
            inner.state = SessionState::AuthenticatedWithTenant;
            inner.last_error = None;
        } else {
            inner.sites.clear();
            inner.state = SessionState::AuthenticatedNoTenant;
            inner.last_error = Some(Error::NoSiteAccess);
        }
        inner.loading = false;
        Ok(SiteSelection { previous, site })
    }

    pub fn record_error(&self, generation: u64, error: Error) {
        let mut inner = self.inner.write();
        if inner.generation == generation {
            inner.loading = false;
            inner.last_error = Some(error);
        }
    }

    /// Start a switch to `target`.
    ///
    /// Rejects a switch while another is running, and a target outside the
    /// accessible list. A target that is already active needs no switch.
    pub fn begin_switch(&self, target: SiteId) -> Result<SwitchStart> {
        let mut inner = self.inner.write();
        match inner.state {
            SessionState::SwitchingTenant => return Err(Error::TenantSwitchInProgress),
            SessionState::Unauthenticated | SessionState::Authenticating => {
                return Err(Error::NotAuthenticated);
            }
            SessionState::AuthenticatedNoTenant | SessionState::AuthenticatedWithTenant => {}
        }

        let site = inner
            .site(target)
            .cloned()
            .ok_or(Error::TenantNotAccessible(target))?;
        let previous = inner.session.as_ref().and_then(|s| s.current_site);

        if previous == Some(target) && inner.state == SessionState::AuthenticatedWithTenant {
            return Ok(SwitchStart::AlreadyActive(site));
        }

        inner.state = SessionState::SwitchingTenant;
        inner.loading = true;
        Ok(SwitchStart::Started(SwitchTicket {
            generation: inner.generation,
            previous,
            target,
        }))
    }

    /// Finish a switch. On success the target becomes current; on failure
    /// the previous site stays current. Returns `false` when the session the
    /// switch started under is gone.
    pub fn finish_switch(&self, ticket: SwitchTicket, outcome: Result<()>) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != ticket.generation || inner.state != SessionState::SwitchingTenant {
            return false;
        }

        let current = match outcome {
            Ok(()) => {
                inner.last_error = None;
                Some(ticket.target)
            }
            Err(error) => {
                inner.last_error = Some(error);
                ticket.previous
            }
        };
        if let Some(session) = inner.session.as_mut() {
            session.current_site = current;
        }
        inner.state = if current.is_some() {
            SessionState::AuthenticatedWithTenant
        } else {
            SessionState::AuthenticatedNoTenant
        };
        inner.loading = false;
        true
    }

    /// Context for site-scoped data calls
    pub fn request_context(&self) -> Result<RequestContext> {
        let inner = self.inner.read();
        match inner.state {
            SessionState::SwitchingTenant => Err(Error::TenantSwitchInProgress),
            SessionState::Unauthenticated | SessionState::Authenticating => {
                Err(Error::NotAuthenticated)
            }
            SessionState::AuthenticatedNoTenant => Err(Error::NoSiteAccess),
            SessionState::AuthenticatedWithTenant => {
                let session = inner.session.as_ref().ok_or(Error::NotAuthenticated)?;
                let site_id = session.current_site.ok_or(Error::NoSiteAccess)?;
                Ok(RequestContext::new(session.token.clone(), Some(site_id)))
            }
        }
    }

    /// Context for session-level calls (site list, site change, logout)
    pub fn auth_context(&self) -> Result<RequestContext> {
        let inner = self.inner.read();
        if !inner.state.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        let session = inner.session.as_ref().ok_or(Error::NotAuthenticated)?;
        Ok(RequestContext::new(
            session.token.clone(),
            session.current_site,
        ))
    }

    /// Drop the session and every site, returning the previous session
    pub fn teardown(&self) -> Option<Session> {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = SessionState::Unauthenticated;
        inner.sites.clear();
        inner.loading = false;
        inner.last_error = None;
        inner.session.take()
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// `logout` was called
    Requested,
    /// The API rejected the session's credentials
    SessionExpired,
}

/// Handle returned by [`LogoutObservers::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(LogoutReason) + Send + Sync>;

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    observers: Vec<(ObserverId, Observer)>,
}

/// Callbacks run when a session ends
#[derive(Default)]
pub struct LogoutObservers {
    inner: Mutex<ObserverList>,
}

impl fmt::Debug for LogoutObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutObservers")
            .field("count", &self.inner.lock().observers.len())
            .finish()
    }
}

impl LogoutObservers {
    pub fn register<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(LogoutReason) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer; unknown or already removed ids are ignored
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        inner.observers.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every observer. The list is copied first, so observers may
    /// register or unregister while being notified.
    pub fn notify(&self, reason: LogoutReason) {
        let observers: Vec<Observer> = self
            .inner
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(reason);
        }
    }
}
