//! In-process gateway that applies the API's site rules to an in-memory data set

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{Gateway, RequestContext};
use crate::cache::{FilterField, FilterValue, QueryKey, SortDirection, SortField};
use crate::error::{Error, Result};
use crate::types::{
    AuthenticatedUser, Credentials, Interaction, InteractionId, InteractionPage, InteractionPatch,
    LoginResponse, NewInteraction, Pagination, Site, SiteId, UserId,
};

/// Gateway operation, used for call accounting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Login,
    Logout,
    ListSites,
    SetSite,
    ListInteractions,
    GetInteraction,
    CreateInteraction,
    UpdateInteraction,
    DeleteInteraction,
}

#[derive(Debug)]
struct Account {
    id: UserId,
    username: String,
    password: String,
    sites: Vec<SiteId>,
}

#[derive(Debug)]
struct TokenSession {
    user: UserId,
    current_site: Option<SiteId>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sites: Vec<Site>,
    accounts: Vec<Account>,
    sessions: HashMap<String, TokenSession>,
    interactions: BTreeMap<InteractionId, Interaction>,
    next_interaction_id: i64,
    next_token: u64,
    calls: HashMap<GatewayOp, u64>,
    faults: HashMap<GatewayOp, VecDeque<Error>>,
}

impl MemoryState {
    fn account(&self, user: UserId) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.id == user)
            .ok_or_else(|| Error::Authentication("unknown user".into()))
    }

    fn authenticate(&self, ctx: &RequestContext) -> Result<&Account> {
        let session = self
            .sessions
            .get(&ctx.token)
            .ok_or_else(|| Error::Authentication("invalid or expired token".into()))?;
        self.account(session.user)
    }

    /// Site named by the request's site context, checked against the account
    fn scoped_site(&self, ctx: &RequestContext) -> Result<(UserId, SiteId)> {
        let account = self.authenticate(ctx)?;
        let site_id = ctx
            .site_id
            .ok_or_else(|| Error::validation("site context is required"))?;
        if !account.sites.contains(&site_id) {
            return Err(Error::Authorization(format!(
                "access denied to site {site_id}"
            )));
        }
        Ok((account.id, site_id))
    }

    fn record_in_site(&self, id: InteractionId, site_id: SiteId) -> Result<&Interaction> {
        self.interactions
            .get(&id)
            .filter(|r| r.site_id == site_id)
            .ok_or_else(|| Error::NotFound(format!("interaction {id}")))
    }
}

/// Gateway backed by an in-memory data set.
///
/// Tokens, site membership, site scoping of records, search, filtering,
/// sorting and pagination behave like the remote API. Every call is counted
/// per [`GatewayOp`], and faults can be queued per operation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<Mutex<MemoryState>>,
    latency: Duration,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.state.lock().next_interaction_id = 1;
        gateway
    }

    #[must_use]
    pub fn with_site(self, site: Site) -> Self {
        self.state.lock().sites.push(site);
        self
    }

    /// Add an account with access to `sites`, in the given order
    #[must_use]
    pub fn with_user(self, username: &str, password: &str, sites: &[SiteId]) -> Self {
        {
            let mut state = self.state.lock();
            let id = UserId(i64::try_from(state.accounts.len()).unwrap_or(i64::MAX) + 1);
            state.accounts.push(Account {
                id,
                username: username.to_string(),
                password: password.to_string(),
                sites: sites.to_vec(),
            });
        }
        self
    }

    #[must_use]
    pub fn with_interaction(self, record: Interaction) -> Self {
        self.insert_interaction(record);
        self
    }

    /// Delay applied to every call before it is served
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Insert or replace a record, as if another client had written it
    pub fn insert_interaction(&self, record: Interaction) {
        let mut state = self.state.lock();
        state.next_interaction_id = state.next_interaction_id.max(record.id.0 + 1);
        state.interactions.insert(record.id, record);
    }

    /// Change which sites an account can access
    pub fn set_user_sites(&self, username: &str, sites: &[SiteId]) {
        let mut state = self.state.lock();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.username == username) {
            account.sites = sites.to_vec();
        }
    }

    /// Invalidate every issued token
    pub fn revoke_tokens(&self) {
        self.state.lock().sessions.clear();
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: GatewayOp, error: Error) {
        self.state
            .lock()
            .faults
            .entry(op)
            .or_default()
            .push_back(error);
    }

    #[must_use]
    pub fn calls(&self, op: GatewayOp) -> u64 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.state.lock().calls.values().sum()
    }

    /// Site the server considers current for `token`
    #[must_use]
    pub fn server_site(&self, token: &str) -> Option<SiteId> {
        self.state
            .lock()
            .sessions
            .get(token)
            .and_then(|s| s.current_site)
    }

    #[must_use]
    pub fn interaction_count(&self, site_id: SiteId) -> usize {
        self.state
            .lock()
            .interactions
            .values()
            .filter(|r| r.site_id == site_id)
            .count()
    }

    /// Count the call, wait out the latency, then surface any queued fault
    async fn enter(&self, op: GatewayOp) -> Result<()> {
        *self.state.lock().calls.entry(op).or_insert(0) += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let fault = self
            .state
            .lock()
            .faults
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        fault.map_or(Ok(()), Err)
    }
}

fn matches_text(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

fn matches_search(record: &Interaction, search: &str) -> bool {
    [
        Some(record.title.as_str()),
        Some(record.lead.as_str()),
        record.location.as_deref(),
        record.description.as_deref(),
        record.notes.as_deref(),
    ]
    .into_iter()
    .any(|field| matches_text(field, search))
}

fn matches_filter(record: &Interaction, field: FilterField, value: &FilterValue) -> bool {
    match (field, value) {
        (FilterField::Type, FilterValue::Type(kind)) => record.interaction_type == *kind,
        (FilterField::Title, FilterValue::Text(t)) => matches_text(Some(&record.title), t),
        (FilterField::Lead, FilterValue::Text(t)) => matches_text(Some(&record.lead), t),
        (FilterField::Location, FilterValue::Text(t)) => {
            matches_text(record.location.as_deref(), t)
        }
        (FilterField::Description, FilterValue::Text(t)) => {
            matches_text(record.description.as_deref(), t)
        }
        (FilterField::Notes, FilterValue::Text(t)) => matches_text(record.notes.as_deref(), t),
        (FilterField::StartDatetime, FilterValue::DateRange(range)) => {
            range.contains(record.start_datetime)
        }
        (FilterField::EndDatetime, FilterValue::DateRange(range)) => {
            record.end_datetime.is_some_and(|at| range.contains(at))
        }
        (FilterField::CreatedAt, FilterValue::DateRange(range)) => {
            record.created_at.is_some_and(|at| range.contains(at))
        }
        _ => false,
    }
}

fn compare(a: &Interaction, b: &Interaction, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Type => a
            .interaction_type
            .as_str()
            .cmp(b.interaction_type.as_str()),
        SortField::Lead => a.lead.to_lowercase().cmp(&b.lead.to_lowercase()),
        SortField::StartDatetime => a.start_datetime.cmp(&b.start_datetime),
        SortField::EndDatetime => a.end_datetime.cmp(&b.end_datetime),
        SortField::Location => a.location.cmp(&b.location),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        self.enter(GatewayOp::Login).await?;
        let mut state = self.state.lock();

        let user = state
            .accounts
            .iter()
            .find(|a| a.username == credentials.username && a.password == credentials.password)
            .map(|a| AuthenticatedUser {
                id: a.id,
                username: a.username.clone(),
            })
            .ok_or_else(|| Error::Authentication("invalid username or password".into()))?;

        state.next_token += 1;
        let token = format!("mem-token-{}", state.next_token);
        state.sessions.insert(
            token.clone(),
            TokenSession {
                user: user.id,
                current_site: None,
            },
        );

        Ok(LoginResponse {
            access_token: token,
            user,
        })
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<()> {
        self.enter(GatewayOp::Logout).await?;
        self.state.lock().sessions.remove(&ctx.token);
        Ok(())
    }

    async fn list_sites(&self, ctx: &RequestContext) -> Result<Vec<Site>> {
        self.enter(GatewayOp::ListSites).await?;
        let state = self.state.lock();
        let account = state.authenticate(ctx)?;

        Ok(account
            .sites
            .iter()
            .filter_map(|id| state.sites.iter().find(|s| s.id == *id).cloned())
            .collect())
    }

    async fn set_site(&self, ctx: &RequestContext, site_id: SiteId) -> Result<Site> {
        self.enter(GatewayOp::SetSite).await?;
        let mut state = self.state.lock();
        let account = state.authenticate(ctx)?;

        if !account.sites.contains(&site_id) {
            return Err(Error::Authorization(format!(
                "access denied to site {site_id}"
            )));
        }
        let site = state
            .sites
            .iter()
            .find(|s| s.id == site_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("site {site_id}")))?;

        if let Some(session) = state.sessions.get_mut(&ctx.token) {
            session.current_site = Some(site_id);
        }
        Ok(site)
    }

    async fn list_interactions(
        &self,
        ctx: &RequestContext,
        query: &QueryKey,
    ) -> Result<InteractionPage> {
        self.enter(GatewayOp::ListInteractions).await?;
        let state = self.state.lock();
        let (_, site_id) = state.scoped_site(ctx)?;

        let mut matching: Vec<&Interaction> = state
            .interactions
            .values()
            .filter(|r| r.site_id == site_id)
            .filter(|r| query.search_text().is_none_or(|s| matches_search(r, s)))
            .filter(|r| {
                query
                    .filters()
                    .iter()
                    .all(|(field, value)| matches_filter(r, *field, value))
            })
            .collect();

        matching.sort_by(|a, b| {
            let order = compare(a, b, query.sort_field());
            match query.sort_direction() {
                SortDirection::Asc => order,
                SortDirection::Desc => order.reverse(),
            }
        });

        let total = matching.len() as u64;
        let size = query.page_size() as usize;
        let offset = (query.page() as usize - 1) * size;
        let interactions = matching
            .into_iter()
            .skip(offset)
            .take(size)
            .cloned()
            .collect();

        Ok(InteractionPage {
            interactions,
            pagination: Pagination::for_total(query.page(), query.page_size(), total),
        })
    }

    async fn get_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
    ) -> Result<Interaction> {
        self.enter(GatewayOp::GetInteraction).await?;
        let state = self.state.lock();
        let (_, site_id) = state.scoped_site(ctx)?;
        state.record_in_site(id, site_id).cloned()
    }

    async fn create_interaction(
        &self,
        ctx: &RequestContext,
        interaction: &NewInteraction,
    ) -> Result<Interaction> {
        self.enter(GatewayOp::CreateInteraction).await?;
        let mut state = self.state.lock();
        let (user, site_id) = state.scoped_site(ctx)?;

        if interaction.site_id != site_id {
            return Err(Error::Authorization(format!(
                "cannot create interaction for site {} from site {site_id}",
                interaction.site_id
            )));
        }

        let id = InteractionId(state.next_interaction_id);
        state.next_interaction_id += 1;
        let now = Utc::now();
        let draft = interaction.draft.clone();
        let record = Interaction {
            id,
            site_id,
            title: draft.title,
            interaction_type: draft.interaction_type,
            lead: draft.lead,
            start_datetime: draft.start_datetime,
            timezone: draft.timezone,
            end_datetime: draft.end_datetime,
            location: draft.location,
            description: draft.description,
            notes: draft.notes,
            created_by: Some(user),
            created_at: Some(now),
            updated_by: Some(user),
            updated_at: Some(now),
        };
        state.interactions.insert(id, record.clone());
        Ok(record)
    }

    async fn update_interaction(
        &self,
        ctx: &RequestContext,
        id: InteractionId,
        patch: &InteractionPatch,
    ) -> Result<Interaction> {
        self.enter(GatewayOp::UpdateInteraction).await?;
        let mut state = self.state.lock();
        let (user, site_id) = state.scoped_site(ctx)?;

        let mut record = state.record_in_site(id, site_id)?.clone();
        patch.apply_to(&mut record);
        if let Some(end) = record.end_datetime
            && end <= record.start_datetime
        {
            return Err(Error::validation("end date/time must be after start"));
        }
        record.updated_by = Some(user);
        record.updated_at = Some(Utc::now());

        state.interactions.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_interaction(&self, ctx: &RequestContext, id: InteractionId) -> Result<()> {
        self.enter(GatewayOp::DeleteInteraction).await?;
        let mut state = self.state.lock();
        let (_, site_id) = state.scoped_site(ctx)?;

        state.record_in_site(id, site_id)?;
        state.interactions.remove(&id);
        Ok(())
    }
}
