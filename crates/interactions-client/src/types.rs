//! Domain and wire types for sites and interactions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Site (tenant partition) identifier
    SiteId
);
numeric_id!(
    /// Interaction record identifier
    InteractionId
);
numeric_id!(
    /// User identifier
    UserId
);

const fn default_active() -> bool {
    true
}

/// Site the authenticated user can access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(alias = "site_id")]
    pub id: SiteId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active", alias = "is_active")]
    pub active: bool,
}

impl Site {
    pub fn new(id: impl Into<SiteId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            active: true,
        }
    }
}

/// Interaction category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InteractionType {
    Meeting,
    Call,
    Email,
    Update,
    Training,
    Review,
    Presentation,
    Conference,
    Workshop,
    Other,
}

impl InteractionType {
    pub const ALL: [Self; 10] = [
        Self::Meeting,
        Self::Call,
        Self::Email,
        Self::Update,
        Self::Training,
        Self::Review,
        Self::Presentation,
        Self::Conference,
        Self::Workshop,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Call => "Call",
            Self::Email => "Email",
            Self::Update => "Update",
            Self::Training => "Training",
            Self::Review => "Review",
            Self::Presentation => "Presentation",
            Self::Conference => "Conference",
            Self::Workshop => "Workshop",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let allowed = Self::ALL.map(|t| t.as_str()).join(", ");
                Error::validation(format!("type must be one of: {allowed}"))
            })
    }
}

/// Interaction record as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(alias = "interaction_id")]
    pub id: InteractionId,
    pub site_id: SiteId,
    pub title: String,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub lead: String,
    pub start_datetime: DateTime<Utc>,
    pub timezone: String,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<UserId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the user when creating an interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub lead: String,
    pub start_datetime: DateTime<Utc>,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InteractionDraft {
    pub fn new(
        title: impl Into<String>,
        interaction_type: InteractionType,
        lead: impl Into<String>,
        start_datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            interaction_type,
            lead: lead.into(),
            start_datetime,
            timezone: "UTC".to_string(),
            end_datetime: None,
            location: None,
            description: None,
            notes: None,
        }
    }
}

/// Create payload: the draft stamped with the active site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub site_id: SiteId,
    #[serde(flatten)]
    pub draft: InteractionDraft,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<InteractionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InteractionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a record in place
    pub fn apply_to(&self, record: &mut Interaction) {
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(kind) = self.interaction_type {
            record.interaction_type = kind;
        }
        if let Some(lead) = &self.lead {
            record.lead.clone_from(lead);
        }
        if let Some(start) = self.start_datetime {
            record.start_datetime = start;
        }
        if let Some(tz) = &self.timezone {
            record.timezone.clone_from(tz);
        }
        if self.end_datetime.is_some() {
            record.end_datetime = self.end_datetime;
        }
        if self.location.is_some() {
            record.location.clone_from(&self.location);
        }
        if self.description.is_some() {
            record.description.clone_from(&self.description);
        }
        if self.notes.is_some() {
            record.notes.clone_from(&self.notes);
        }
    }
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    #[serde(alias = "page_size")]
    pub page_size: u32,
    #[serde(alias = "total_pages")]
    pub total_pages: u32,
    #[serde(alias = "total_records", alias = "total")]
    pub total_records: u64,
}

impl Pagination {
    /// Pagination for `total_records` split into pages of `page_size`
    #[must_use]
    pub fn for_total(page: u32, page_size: u32, total_records: u64) -> Self {
        let size = u64::from(page_size.max(1));
        let total_pages = total_records.div_ceil(size).max(1);
        Self {
            page,
            page_size,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_records,
        }
    }
}

/// One page of interactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPage {
    pub interactions: Vec<Interaction>,
    pub pagination: Pagination,
}

impl InteractionPage {
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: InteractionId) -> bool {
        self.interactions.iter().any(|i| i.id == id)
    }
}

/// Login credentials
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Identity of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(alias = "user_id")]
    pub id: UserId,
    pub username: String,
}

/// Successful login response
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token", alias = "accessToken")]
    pub access_token: String,
    pub user: AuthenticatedUser,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Interaction {
        Interaction {
            id: InteractionId(1),
            site_id: SiteId(1),
            title: "Kickoff".into(),
            interaction_type: InteractionType::Meeting,
            lead: "Ada".into(),
            start_datetime: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
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

    #[test]
    fn test_interaction_type_parse_case_insensitive() {
        assert_eq!(
            "meeting".parse::<InteractionType>().unwrap(),
            InteractionType::Meeting
        );
        assert_eq!(
            " WORKSHOP ".parse::<InteractionType>().unwrap(),
            InteractionType::Workshop
        );
        assert!("party".parse::<InteractionType>().is_err());
    }

    #[test]
    fn test_interaction_deserialize_backend_field_names() {
        let json = r#"{
            "interaction_id": 12,
            "site_id": 3,
            "title": "Quarterly review",
            "type": "Review",
            "lead": "Grace",
            "start_datetime": "2024-05-01T14:00:00Z",
            "timezone": "America/New_York",
            "location": null
        }"#;
        let record: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, InteractionId(12));
        assert_eq!(record.site_id, SiteId(3));
        assert_eq!(record.interaction_type, InteractionType::Review);
        assert!(record.end_datetime.is_none());
    }

    #[test]
    fn test_site_deserialize_defaults_active() {
        let site: Site = serde_json::from_str(r#"{"site_id": 2, "name": "North"}"#).unwrap();
        assert_eq!(site.id, SiteId(2));
        assert!(site.active);

        let site: Site =
            serde_json::from_str(r#"{"id": 4, "name": "South", "is_active": false}"#).unwrap();
        assert!(!site.active);
    }

    #[test]
    fn test_new_interaction_flattens_draft() {
        let payload = NewInteraction {
            site_id: SiteId(5),
            draft: InteractionDraft::new(
                "Client Meeting",
                InteractionType::Meeting,
                "Ada",
                Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            ),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["site_id"], 5);
        assert_eq!(value["title"], "Client Meeting");
        assert_eq!(value["type"], "Meeting");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_patch_apply_only_present_fields() {
        let mut record = sample();
        let patch = InteractionPatch {
            title: Some("Renamed".into()),
            notes: Some("bring slides".into()),
            ..Default::default()
        };
        patch.apply_to(&mut record);
        assert_eq!(record.title, "Renamed");
        assert_eq!(record.notes.as_deref(), Some("bring slides"));
        assert_eq!(record.lead, "Ada");
        assert!(!patch.is_empty());
        assert!(InteractionPatch::default().is_empty());
    }

    #[test]
    fn test_pagination_for_total() {
        let p = Pagination::for_total(1, 25, 51);
        assert_eq!(p.total_pages, 3);
        let empty = Pagination::for_total(1, 25, 0);
        assert_eq!(empty.total_pages, 1);
    }

    #[test]
    fn test_pagination_accepts_both_casings() {
        let camel: Pagination = serde_json::from_str(
            r#"{"page":1,"pageSize":25,"totalPages":2,"totalRecords":30}"#,
        )
        .unwrap();
        let snake: Pagination =
            serde_json::from_str(r#"{"page":1,"page_size":25,"total_pages":2,"total":30}"#)
                .unwrap();
        assert_eq!(camel, snake);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("ada", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
