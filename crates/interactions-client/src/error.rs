use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::types::{InteractionId, SiteId};

/// Client error taxonomy.
///
/// Errors are `Clone` so a single fetch outcome can be handed to every caller
/// awaiting a deduplicated request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Unknown error: {0}")]
    Unknown(String),

    // Site context errors
    #[error("Site {0} is not accessible for this account")]
    TenantNotAccessible(SiteId),

    #[error("A site switch is already in progress")]
    TenantSwitchInProgress,

    #[error("No accessible sites for this account")]
    NoSiteAccess,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    /// Validation error without per-field detail
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Validation error carrying per-field messages
    pub fn invalid_fields(fields: BTreeMap<String, String>) -> Self {
        let message = fields
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self::Validation {
            message: format!("invalid fields: {message}"),
            fields,
        }
    }

    /// Record returned under a site other than the active one
    pub fn site_mismatch(id: InteractionId, expected: SiteId, actual: SiteId) -> Self {
        Self::Authorization(format!(
            "interaction {id} belongs to site {actual}, active site is {expected}"
        ))
    }

    /// Classify an HTTP status code returned by the API
    #[must_use]
    pub fn from_status(status: u16, detail: &str) -> Self {
        let detail = detail.trim().to_string();
        match status {
            400 | 422 => Self::validation(detail),
            401 => Self::Authentication(detail),
            403 => Self::Authorization(detail),
            404 => Self::NotFound(detail),
            408 | 504 => Self::Timeout(Duration::ZERO),
            500..=599 => Self::Server { status, detail },
            _ => Self::Unknown(format!("unexpected status {status}: {detail}")),
        }
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    #[must_use]
    pub const fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Faults the caller may retry by hand; the cache is left untouched
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Server { .. } | Self::TenantSwitchInProgress
        )
    }

    /// Faults that end the session and send the user back to login
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::NotAuthenticated)
    }

    #[must_use]
    pub const fn is_site_error(&self) -> bool {
        matches!(
            self,
            Self::TenantNotAccessible(_) | Self::TenantSwitchInProgress | Self::NoSiteAccess
        )
    }

    /// Human-readable message for display. Server details stay in `Display`.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, fields } => {
                if fields.is_empty() {
                    format!("Please correct the highlighted input: {message}")
                } else {
                    let detail = fields
                        .iter()
                        .map(|(field, msg)| format!("{field}: {msg}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    format!("Please correct the highlighted input: {detail}")
                }
            }
            Self::Authentication(_) => "Your session has expired. Please log in again.".into(),
            Self::Authorization(_) => "You do not have permission to access this data.".into(),
            Self::NotFound(_) => "The requested interaction could not be found.".into(),
            Self::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".into()
            }
            Self::Timeout(_) => "The server took too long to respond. Please try again.".into(),
            Self::Server { .. } => {
                "The server encountered an error. Please try again later.".into()
            }
            Self::Unknown(_) => "An unexpected error occurred.".into(),
            Self::TenantNotAccessible(site) => {
                format!("You do not have access to site {site}.")
            }
            Self::TenantSwitchInProgress => {
                "A site change is in progress. Please wait and try again.".into()
            }
            Self::NoSiteAccess => {
                "Your account has no site access. Contact an administrator.".into()
            }
            Self::NotAuthenticated => "Please log in to continue.".into(),
            Self::Config(_) => "The application is misconfigured.".into(),
            Self::Storage(_) => "Local settings could not be saved.".into(),
            Self::Cancelled => "The request was cancelled.".into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Unknown(format!("malformed payload: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
