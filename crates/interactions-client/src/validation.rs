//! Input validation performed before any request reaches the network

use std::collections::BTreeMap;

use crate::Error;
use crate::constants::{
    MAX_DESCRIPTION_LENGTH, MAX_LEAD_LENGTH, MAX_LOCATION_LENGTH, MAX_NOTES_LENGTH,
    MAX_SEARCH_LENGTH, MAX_TITLE_LENGTH,
};
use crate::types::{InteractionDraft, InteractionPatch};

/// Characters stripped from free-text search input
const SEARCH_STRIP_CHARS: &[char] = &[';', '"', '\'', '<', '>'];

#[derive(Debug, Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn required(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{label} is required"));
        }
    }

    fn max_len(&mut self, field: &str, label: &str, value: Option<&str>, max: usize) {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.add(field, format!("{label} must be at most {max} characters"));
        }
    }

    fn into_result(self) -> Result<(), Error> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_fields(self.0))
        }
    }
}

/// Validate a new interaction
pub fn validate_draft(draft: &InteractionDraft) -> Result<(), Error> {
    let mut errors = FieldErrors::default();

    errors.required("title", "Title", &draft.title);
    errors.required("lead", "Lead", &draft.lead);
    errors.required("timezone", "Timezone", &draft.timezone);

    errors.max_len("title", "Title", Some(&draft.title), MAX_TITLE_LENGTH);
    errors.max_len("lead", "Lead", Some(&draft.lead), MAX_LEAD_LENGTH);
    errors.max_len(
        "location",
        "Location",
        draft.location.as_deref(),
        MAX_LOCATION_LENGTH,
    );
    errors.max_len(
        "description",
        "Description",
        draft.description.as_deref(),
        MAX_DESCRIPTION_LENGTH,
    );
    errors.max_len("notes", "Notes", draft.notes.as_deref(), MAX_NOTES_LENGTH);

    if let Some(end) = draft.end_datetime
        && end <= draft.start_datetime
    {
        errors.add("end_datetime", "End date/time must be after start date/time");
    }

    errors.into_result()
}

/// Validate a partial update.
///
/// Present fields follow the same rules as a draft. The end-after-start rule is
/// only checked when both ends are part of the patch.
pub fn validate_patch(patch: &InteractionPatch) -> Result<(), Error> {
    if patch.is_empty() {
        return Err(Error::validation("update contains no changes"));
    }

    let mut errors = FieldErrors::default();

    if let Some(title) = &patch.title {
        errors.required("title", "Title", title);
    }
    if let Some(lead) = &patch.lead {
        errors.required("lead", "Lead", lead);
    }
    if let Some(tz) = &patch.timezone {
        errors.required("timezone", "Timezone", tz);
    }

    errors.max_len("title", "Title", patch.title.as_deref(), MAX_TITLE_LENGTH);
    errors.max_len("lead", "Lead", patch.lead.as_deref(), MAX_LEAD_LENGTH);
    errors.max_len(
        "location",
        "Location",
        patch.location.as_deref(),
        MAX_LOCATION_LENGTH,
    );
    errors.max_len(
        "description",
        "Description",
        patch.description.as_deref(),
        MAX_DESCRIPTION_LENGTH,
    );
    errors.max_len("notes", "Notes", patch.notes.as_deref(), MAX_NOTES_LENGTH);

    if let (Some(start), Some(end)) = (patch.start_datetime, patch.end_datetime)
        && end <= start
    {
        errors.add("end_datetime", "End date/time must be after start date/time");
    }

    errors.into_result()
}

/// Normalize free-text search input.
///
/// Returns `None` when nothing searchable remains, so an empty search and no
/// search produce the same cache key.
pub fn sanitize_search(input: &str) -> Result<Option<String>, Error> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control() && !SEARCH_STRIP_CHARS.contains(c))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_SEARCH_LENGTH {
        return Err(Error::validation(format!(
            "search must be at most {MAX_SEARCH_LENGTH} characters"
        )));
    }

    Ok((!collapsed.is_empty()).then_some(collapsed))
}
