//! Create, update and delete with site stamping and cache invalidation

use std::sync::Arc;

use tracing::Instrument;

use crate::cache::{CacheSet, InvalidationScope};
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::guard;
use crate::session::SessionCell;
use crate::types::{Interaction, InteractionDraft, InteractionId, InteractionPatch, NewInteraction};
use crate::validation::{validate_draft, validate_patch};

/// Runs mutations against the active site.
///
/// Input is validated before any gateway call. Every successful mutation
/// invalidates the affected site's list entries, and updates and deletes
/// also drop the record entry, so the next read goes to the gateway.
#[derive(Clone)]
pub struct MutationCoordinator {
    gateway: Arc<dyn Gateway>,
    session: Arc<SessionCell>,
    caches: CacheSet,
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}

impl MutationCoordinator {
    pub fn new(gateway: Arc<dyn Gateway>, session: Arc<SessionCell>, caches: CacheSet) -> Self {
        Self {
            gateway,
            session,
            caches,
        }
    }

    /// Create an interaction in the active site
    pub async fn create(&self, draft: InteractionDraft) -> Result<Interaction> {
        validate_draft(&draft)?;
        let ctx = self.session.request_context()?;
        let site_id = ctx.site_id.ok_or(Error::NoSiteAccess)?;

        let span = tracing::debug_span!("mutation.create", site_id = %site_id);
        async move {
            let payload = NewInteraction { site_id, draft };
            let record = self.gateway.create_interaction(&ctx, &payload).await?;
            guard::validate(&record, site_id)?;

            let removed = self.caches.invalidate(InvalidationScope::Lists(site_id));
            tracing::info!(
                interaction_id = %record.id,
                invalidated = removed,
                "Interaction created"
            );
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Apply `patch` to an interaction of the active site
    pub async fn update(&self, id: InteractionId, patch: InteractionPatch) -> Result<Interaction> {
        validate_patch(&patch)?;
        let ctx = self.session.request_context()?;
        let site_id = ctx.site_id.ok_or(Error::NoSiteAccess)?;

        let span = tracing::debug_span!("mutation.update", site_id = %site_id, interaction_id = %id);
        async move {
            let record = self.gateway.update_interaction(&ctx, id, &patch).await?;
            guard::validate(&record, site_id)?;

            let removed = self.caches.invalidate(InvalidationScope::Record { site_id, id })
                + self.caches.invalidate(InvalidationScope::Lists(site_id));
            tracing::info!(invalidated = removed, "Interaction updated");
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Delete an interaction of the active site. A record that is already
    /// gone counts as deleted.
    pub async fn delete(&self, id: InteractionId) -> Result<()> {
        let ctx = self.session.request_context()?;
        let site_id = ctx.site_id.ok_or(Error::NoSiteAccess)?;

        let span = tracing::debug_span!("mutation.delete", site_id = %site_id, interaction_id = %id);
        async move {
            match self.gateway.delete_interaction(&ctx, id).await {
                Ok(()) => {}
                Err(Error::NotFound(detail)) => {
                    tracing::debug!(detail = %detail, "Interaction already deleted");
                }
                Err(err) => return Err(err),
            }

            let removed = self.caches.invalidate(InvalidationScope::Record { site_id, id })
                + self.caches.invalidate(InvalidationScope::Lists(site_id));
            tracing::info!(invalidated = removed, "Interaction deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
