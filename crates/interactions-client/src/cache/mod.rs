//! Query cache for site-scoped interaction data
//!
//! Two caches share one configuration: paginated list views keyed by
//! [`QueryKey`] and single records keyed by site and id. Every key carries
//! its site, and every value is checked against that site before it is
//! stored, so an entry can never hold another site's records.
//!
//! # Freshness
//!
//! An entry younger than [`CacheConfig::staleness_window`] is served as is.
//! An older entry is still served, and one background refresh replaces it
//! when the gateway answers. A failed refresh keeps the old value and records
//! the error on the entry.
//!
//! # Invalidation
//!
//! Mutations invalidate the affected site's list entries and record entry.
//! Logout and site switches clear everything, cancelling fetches in flight so
//! their results are never written back.

mod config;
mod key;
mod stats;
mod store;

pub use config::CacheConfig;
pub use key::{
    CacheKey, CacheNamespace, DateRange, FilterField, FilterValue, InteractionQuery,
    InvalidationScope, QueryKey, SortDirection, SortField,
};
pub use stats::CacheStats;
pub use store::{Freshness, Lookup, PendingFetch, QueryCache};

use crate::types::{Interaction, InteractionPage};

/// List and record caches sharing one configuration
#[derive(Debug, Clone)]
pub struct CacheSet {
    lists: QueryCache<InteractionPage>,
    records: QueryCache<Interaction>,
}

impl CacheSet {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            lists: QueryCache::new("interaction_lists", config),
            records: QueryCache::new("interactions", config),
        }
    }

    #[must_use]
    pub const fn lists(&self) -> &QueryCache<InteractionPage> {
        &self.lists
    }

    #[must_use]
    pub const fn records(&self) -> &QueryCache<Interaction> {
        &self.records
    }

    /// Apply `scope` to both caches, returning the number of entries removed
    pub fn invalidate(&self, scope: InvalidationScope) -> usize {
        self.lists.invalidate(scope) + self.records.invalidate(scope)
    }

    pub fn clear(&self) {
        self.invalidate(InvalidationScope::All);
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.lists.len() + self.records.len()
    }

    /// Keys of every cached entry in both caches
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys = self.lists.keys();
        keys.extend(self.records.keys());
        keys
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.lists.stats() + self.records.stats()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{InteractionId, InteractionType, Pagination, SiteId};

    fn record(id: i64, site: i64) -> Interaction {
        Interaction {
            id: InteractionId(id),
            site_id: SiteId(site),
            title: "Standup".into(),
            interaction_type: InteractionType::Update,
            lead: "Grace".into(),
            start_datetime: Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap(),
            timezone: "UTC".into(),
            end_datetime: None,
            location: None,
            description: None,
            notes: None,
            created_by: None,
            created_at: None,
            updated_by: None,
            updated_at: None,
        }
    }

    async fn populate(caches: &CacheSet, site: i64) {
        let list_key =
            CacheKey::List(QueryKey::new(SiteId(site), &InteractionQuery::new()).unwrap());
        caches
            .lists()
            .get(&list_key, None, move || async move {
                Ok(InteractionPage {
                    interactions: vec![record(site * 10, site)],
                    pagination: Pagination::for_total(1, 25, 1),
                })
            })
            .await
            .unwrap();
        caches
            .records()
            .get(
                &CacheKey::record(SiteId(site), InteractionId(site * 10)),
                None,
                move || async move { Ok(record(site * 10, site)) },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lists_scope_leaves_records() {
        let caches = CacheSet::new(CacheConfig::default());
        populate(&caches, 1).await;

        assert_eq!(caches.invalidate(InvalidationScope::Lists(SiteId(1))), 1);
        assert_eq!(caches.entry_count(), 1);
        assert_eq!(caches.records().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_every_site() {
        let caches = CacheSet::new(CacheConfig::default());
        populate(&caches, 1).await;
        populate(&caches, 2).await;
        assert_eq!(caches.entry_count(), 4);

        caches.clear();
        assert_eq!(caches.entry_count(), 0);
        assert!(caches.keys().is_empty());
    }

    #[tokio::test]
    async fn test_combined_stats() {
        let caches = CacheSet::new(CacheConfig::default());
        populate(&caches, 1).await;
        populate(&caches, 1).await;

        let stats = caches.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 2);
    }
}
