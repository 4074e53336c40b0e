//! Constants for the interactions client

use std::time::Duration;

/// Header carrying the active site on every authenticated request
pub const SITE_CONTEXT_HEADER: &str = "X-Site-Context";

/// Credential store key for the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Credential store key for the preferred site id
pub const PREFERRED_SITE_KEY: &str = "preferred_site_id";

/// Default bound on every gateway call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default age after which a cached entry is served stale and refreshed
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(30);

/// Default cap on cached entries per cache
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

// Field length limits enforced by the API
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_LEAD_LENGTH: usize = 100;
pub const MAX_LOCATION_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_NOTES_LENGTH: usize = 2000;
pub const MAX_SEARCH_LENGTH: usize = 200;
