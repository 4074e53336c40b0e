//! Query parameters, normalized cache keys and invalidation scopes

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::types::{InteractionId, InteractionType, SiteId};
use crate::validation::sanitize_search;

/// Filterable interaction field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Title,
    Type,
    Lead,
    Location,
    Description,
    Notes,
    StartDatetime,
    EndDatetime,
    CreatedAt,
}

impl FilterField {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Type => "type",
            Self::Lead => "lead",
            Self::Location => "location",
            Self::Description => "description",
            Self::Notes => "notes",
            Self::StartDatetime => "start_datetime",
            Self::EndDatetime => "end_datetime",
            Self::CreatedAt => "created_at",
        }
    }

    const fn accepts(self, value: &FilterValue) -> bool {
        match self {
            Self::Type => matches!(value, FilterValue::Type(_)),
            Self::StartDatetime | Self::EndDatetime | Self::CreatedAt => {
                matches!(value, FilterValue::DateRange(_))
            }
            Self::Title | Self::Lead | Self::Location | Self::Description | Self::Notes => {
                matches!(value, FilterValue::Text(_))
            }
        }
    }
}

// Keys order filters by field name
impl Ord for FilterField {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for FilterField {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range; either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    #[must_use]
    pub const fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Typed filter value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Text(String),
    Type(InteractionType),
    DateRange(DateRange),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Canonical form, or `None` when the filter constrains nothing
    fn normalized(&self) -> Option<Self> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| Self::Text(trimmed.to_string()))
            }
            Self::Type(kind) => Some(Self::Type(*kind)),
            Self::DateRange(range) => (!range.is_unbounded()).then_some(Self::DateRange(*range)),
        }
    }

    /// Wire encoding used in `filter_<field>` query parameters
    #[must_use]
    pub fn to_param(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Type(kind) => kind.as_str().to_string(),
            Self::DateRange(range) => format!(
                "{},{}",
                range.from.map(|d| d.to_rfc3339()).unwrap_or_default(),
                range.to.map(|d| d.to_rfc3339()).unwrap_or_default()
            ),
        }
    }
}

/// Sortable interaction field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    Title,
    Type,
    Lead,
    StartDatetime,
    EndDatetime,
    Location,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Type => "type",
            Self::Lead => "lead",
            Self::StartDatetime => "start_datetime",
            Self::EndDatetime => "end_datetime",
            Self::Location => "location",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_lowercase().as_str() {
            "title" => Self::Title,
            "type" => Self::Type,
            "lead" => Self::Lead,
            "start_datetime" | "startdatetime" | "start" => Self::StartDatetime,
            "end_datetime" | "enddatetime" | "end" => Self::EndDatetime,
            "location" => Self::Location,
            "created_at" | "createdat" => Self::CreatedAt,
            "updated_at" | "updatedat" => Self::UpdatedAt,
            other => return Err(Error::validation(format!("unknown sort field: {other}"))),
        })
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(Error::validation(format!("unknown sort direction: {other}"))),
        }
    }
}

/// Caller-facing list query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionQuery {
    search: Option<String>,
    filters: BTreeMap<FilterField, FilterValue>,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: u32,
    page_size: u32,
}

impl Default for InteractionQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionQuery {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            search: None,
            filters: BTreeMap::new(),
            sort_field: SortField::CreatedAt,
            sort_direction: SortDirection::Desc,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Set a filter; a later value for the same field replaces the earlier one
    #[must_use]
    pub fn filter(mut self, field: FilterField, value: FilterValue) -> Self {
        self.filters.insert(field, value);
        self
    }

    #[must_use]
    pub const fn sort(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_field = field;
        self.sort_direction = direction;
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.page
    }
}

/// Normalized identity of one list view for one site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    site_id: SiteId,
    search: Option<String>,
    filters: Vec<(FilterField, FilterValue)>,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: u32,
    page_size: u32,
}

impl QueryKey {
    /// Validate and normalize `query` for `site_id`
    pub fn new(site_id: SiteId, query: &InteractionQuery) -> Result<Self> {
        if query.page == 0 {
            return Err(Error::validation("page must be at least 1"));
        }
        if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let search = match &query.search {
            Some(text) => sanitize_search(text)?,
            None => None,
        };

        let mut filters = Vec::with_capacity(query.filters.len());
        for (field, value) in &query.filters {
            if !field.accepts(value) {
                return Err(Error::validation(format!(
                    "filter value does not match field {field}"
                )));
            }
            if let Some(value) = value.normalized() {
                filters.push((*field, value));
            }
        }

        Ok(Self {
            site_id,
            search,
            filters,
            sort_field: query.sort_field,
            sort_direction: query.sort_direction,
            page: query.page,
            page_size: query.page_size,
        })
    }

    #[must_use]
    pub const fn site_id(&self) -> SiteId {
        self.site_id
    }

    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref()
    }

    #[must_use]
    pub fn filters(&self) -> &[(FilterField, FilterValue)] {
        &self.filters
    }

    #[must_use]
    pub const fn sort_field(&self) -> SortField {
        self.sort_field
    }

    #[must_use]
    pub const fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Query-string pairs for `GET /interactions`
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 5);
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        for (field, value) in &self.filters {
            pairs.push((format!("filter_{field}"), value.to_param()));
        }
        pairs.push(("sortField".to_string(), self.sort_field.as_str().to_string()));
        pairs.push((
            "sortDirection".to_string(),
            self.sort_direction.as_str().to_string(),
        ));
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("pageSize".to_string(), self.page_size.to_string()));
        pairs
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.site_id)?;
        if let Some(search) = &self.search {
            write!(f, ":q={search}")?;
        }
        for (field, value) in &self.filters {
            write!(f, ":{field}={}", value.to_param())?;
        }
        write!(
            f,
            ":{}:{}:{}:{}",
            self.sort_field.as_str(),
            self.sort_direction.as_str(),
            self.page,
            self.page_size
        )
    }
}

/// Cache key namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Paginated list views
    InteractionList,
    /// Single-record views
    Interaction,
}

impl CacheNamespace {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InteractionList => "list",
            Self::Interaction => "record",
        }
    }
}

/// Structured cache key, always scoped to one site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    List(QueryKey),
    Record { site_id: SiteId, id: InteractionId },
}

impl CacheKey {
    #[must_use]
    pub const fn record(site_id: SiteId, id: InteractionId) -> Self {
        Self::Record { site_id, id }
    }

    #[must_use]
    pub const fn site_id(&self) -> SiteId {
        match self {
            Self::List(key) => key.site_id,
            Self::Record { site_id, .. } => *site_id,
        }
    }

    #[must_use]
    pub const fn namespace(&self) -> CacheNamespace {
        match self {
            Self::List(_) => CacheNamespace::InteractionList,
            Self::Record { .. } => CacheNamespace::Interaction,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(key) => write!(f, "{}:{key}", self.namespace().as_str()),
            Self::Record { site_id, id } => {
                write!(f, "{}:{site_id}:{id}", self.namespace().as_str())
            }
        }
    }
}

/// Which entries an invalidation removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Every entry (logout, site switch)
    All,
    /// Every entry of one site
    AllForSite(SiteId),
    /// List entries of one site
    Lists(SiteId),
    /// The single-record entry for one interaction
    Record { site_id: SiteId, id: InteractionId },
}

impl InvalidationScope {
    #[must_use]
    pub fn matches(&self, key: &CacheKey) -> bool {
        match (self, key) {
            (Self::All, _) => true,
            (Self::AllForSite(site), key) => key.site_id() == *site,
            (Self::Lists(site), CacheKey::List(list)) => list.site_id == *site,
            (Self::Record { site_id, id }, CacheKey::Record { site_id: s, id: i }) => {
                site_id == s && id == i
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn range() -> DateRange {
        DateRange::new(Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()), None)
    }

    #[test]
    fn test_filter_insertion_order_irrelevant() {
        let a = InteractionQuery::new()
            .filter(FilterField::Type, FilterValue::Type(InteractionType::Call))
            .filter(FilterField::Lead, FilterValue::text("Ada"))
            .filter(FilterField::StartDatetime, FilterValue::DateRange(range()));
        let b = InteractionQuery::new()
            .filter(FilterField::StartDatetime, FilterValue::DateRange(range()))
            .filter(FilterField::Lead, FilterValue::text("Ada"))
            .filter(FilterField::Type, FilterValue::Type(InteractionType::Call));

        let ka = QueryKey::new(SiteId(1), &a).unwrap();
        let kb = QueryKey::new(SiteId(1), &b).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(ka.to_string(), kb.to_string());
    }

    #[test]
    fn test_filters_sorted_by_name() {
        let q = InteractionQuery::new()
            .filter(FilterField::Type, FilterValue::Type(InteractionType::Call))
            .filter(FilterField::Lead, FilterValue::text("Ada"))
            .filter(FilterField::CreatedAt, FilterValue::DateRange(range()));
        let key = QueryKey::new(SiteId(1), &q).unwrap();
        let names: Vec<_> = key.filters().iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(names, vec!["created_at", "lead", "type"]);
    }

    #[test]
    fn test_blank_search_and_filters_normalize_away() {
        let plain = QueryKey::new(SiteId(1), &InteractionQuery::new()).unwrap();
        let noisy = QueryKey::new(
            SiteId(1),
            &InteractionQuery::new()
                .search("   ")
                .filter(FilterField::Title, FilterValue::text("  "))
                .filter(
                    FilterField::EndDatetime,
                    FilterValue::DateRange(DateRange::new(None, None)),
                ),
        )
        .unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn test_text_filter_trimmed() {
        let a = QueryKey::new(
            SiteId(1),
            &InteractionQuery::new().filter(FilterField::Lead, FilterValue::text(" Ada ")),
        )
        .unwrap();
        let b = QueryKey::new(
            SiteId(1),
            &InteractionQuery::new().filter(FilterField::Lead, FilterValue::text("Ada")),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_site_is_part_of_key() {
        let q = InteractionQuery::new();
        assert_ne!(
            QueryKey::new(SiteId(1), &q).unwrap(),
            QueryKey::new(SiteId(2), &q).unwrap()
        );
    }

    #[test]
    fn test_page_bounds_validated() {
        assert!(QueryKey::new(SiteId(1), &InteractionQuery::new().page(0)).is_err());
        assert!(QueryKey::new(SiteId(1), &InteractionQuery::new().page_size(0)).is_err());
        assert!(QueryKey::new(SiteId(1), &InteractionQuery::new().page_size(101)).is_err());
        assert!(QueryKey::new(SiteId(1), &InteractionQuery::new().page_size(100)).is_ok());
    }

    #[test]
    fn test_mismatched_filter_value_rejected() {
        let q = InteractionQuery::new().filter(FilterField::Type, FilterValue::text("Call"));
        let err = QueryKey::new(SiteId(1), &q).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_query_pairs() {
        let q = InteractionQuery::new()
            .search("client")
            .filter(FilterField::Type, FilterValue::Type(InteractionType::Meeting))
            .sort(SortField::Title, SortDirection::Asc)
            .page(2)
            .page_size(10);
        let pairs = QueryKey::new(SiteId(3), &q).unwrap().to_query_pairs();
        let lookup = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(lookup("search"), Some("client"));
        assert_eq!(lookup("filter_type"), Some("Meeting"));
        assert_eq!(lookup("sortField"), Some("title"));
        assert_eq!(lookup("sortDirection"), Some("asc"));
        assert_eq!(lookup("page"), Some("2"));
        assert_eq!(lookup("pageSize"), Some("10"));
    }

    #[test]
    fn test_date_range_param_open_end() {
        assert_eq!(
            FilterValue::DateRange(range()).to_param(),
            "2024-01-01T00:00:00+00:00,"
        );
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::record(SiteId(1), InteractionId(42));
        assert_eq!(key.to_string(), "record:1:42");

        let list = CacheKey::List(QueryKey::new(SiteId(1), &InteractionQuery::new()).unwrap());
        assert_eq!(list.to_string(), "list:1:created_at:desc:1:25");
        assert_eq!(list.namespace(), CacheNamespace::InteractionList);
    }

    #[test]
    fn test_invalidation_scope_matching() {
        let list1 = CacheKey::List(QueryKey::new(SiteId(1), &InteractionQuery::new()).unwrap());
        let list2 = CacheKey::List(QueryKey::new(SiteId(2), &InteractionQuery::new()).unwrap());
        let rec = CacheKey::record(SiteId(1), InteractionId(3));
        let other_rec = CacheKey::record(SiteId(1), InteractionId(4));

        assert!(InvalidationScope::All.matches(&list2));
        assert!(InvalidationScope::AllForSite(SiteId(1)).matches(&list1));
        assert!(InvalidationScope::AllForSite(SiteId(1)).matches(&rec));
        assert!(!InvalidationScope::AllForSite(SiteId(1)).matches(&list2));
        assert!(InvalidationScope::Lists(SiteId(1)).matches(&list1));
        assert!(!InvalidationScope::Lists(SiteId(1)).matches(&rec));

        let scope = InvalidationScope::Record {
            site_id: SiteId(1),
            id: InteractionId(3),
        };
        assert!(scope.matches(&rec));
        assert!(!scope.matches(&other_rec));
        assert!(!scope.matches(&list1));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("Title".parse::<SortField>().unwrap(), SortField::Title);
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
