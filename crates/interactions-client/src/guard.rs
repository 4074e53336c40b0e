//! Site ownership checks applied to every record entering or leaving the cache

use crate::error::{Error, Result};
use crate::types::{Interaction, InteractionPage, SiteId};

/// Data that belongs to exactly one site
pub trait SiteOwned: Send + Sync + 'static {
    /// Fail with an authorization fault unless all data belongs to `site_id`
    fn validate_site(&self, site_id: SiteId) -> Result<()>;
}

impl SiteOwned for Interaction {
    fn validate_site(&self, site_id: SiteId) -> Result<()> {
        validate(self, site_id)
    }
}

impl SiteOwned for InteractionPage {
    fn validate_site(&self, site_id: SiteId) -> Result<()> {
        validate_page(self, site_id)
    }
}

/// Check that `record` belongs to `current_site`
pub fn validate(record: &Interaction, current_site: SiteId) -> Result<()> {
    if record.site_id == current_site {
        return Ok(());
    }
    tracing::warn!(
        interaction_id = %record.id,
        record_site = %record.site_id,
        active_site = %current_site,
        "Discarding interaction from foreign site"
    );
    Err(Error::site_mismatch(record.id, current_site, record.site_id))
}

/// Check every record of a page; one foreign record rejects the whole page
pub fn validate_page(page: &InteractionPage, current_site: SiteId) -> Result<()> {
    page.interactions
        .iter()
        .try_for_each(|record| validate(record, current_site))
}
