//! Domain types for the event management service.
//!
//! Identifiers are UUID newtypes so an attendee id can never be passed where
//! an event id is expected. Records mirror the `events` and
//! `event_participants` tables one to one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ServiceError;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (host or attendee).
///
/// Users live in another service; this side only ever sees the id forwarded
/// by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A hosted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub event_id: EventId,
    /// Owner of the event
    pub host_id: UserId,
    /// Title
    pub title: String,
    /// Free-form description
    pub description: Option<String>,
    /// Where the event takes place
    pub location: String,
    /// When the event takes place
    pub date_time: DateTime<Utc>,
    /// Optional category used by search
    pub category: Option<String>,
    /// Cached number of live participations
    pub attendees_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a fresh event from validated input.
    #[must_use]
    pub fn create(event_id: EventId, host_id: UserId, input: ValidNewEvent, now: DateTime<Utc>) -> Self {
        Self {
            event_id,
            host_id,
            title: input.title,
            description: input.description,
            location: input.location,
            date_time: input.date_time,
            category: input.category,
            attendees_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a set of changes in place.
    pub fn apply(&mut self, changes: &EventChanges, now: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &changes.description {
            self.description.clone_from(description);
        }
        if let Some(location) = &changes.location {
            self.location.clone_from(location);
        }
        if let Some(date_time) = changes.date_time {
            self.date_time = date_time;
        }
        if let Some(category) = &changes.category {
            self.category.clone_from(category);
        }
        self.updated_at = now;
    }

    /// The list-view projection of this event.
    #[must_use]
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            event_id: self.event_id,
            title: self.title.clone(),
            location: self.location.clone(),
            date_time: self.date_time,
            host_id: self.host_id,
            category: self.category.clone(),
            attendees_count: self.attendees_count,
        }
    }
}

/// Event fields returned by list and search endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event ID
    pub event_id: EventId,
    /// Title
    pub title: String,
    /// Location
    pub location: String,
    /// When the event takes place
    pub date_time: DateTime<Utc>,
    /// Owner of the event
    pub host_id: UserId,
    /// Category
    pub category: Option<String>,
    /// Cached number of live participations
    pub attendees_count: i64,
}

/// A single (event, attendee) registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// Event being attended
    pub event_id: EventId,
    /// Registered user
    pub attendee_id: UserId,
    /// When the registration happened
    pub joined_at: DateTime<Utc>,
}

// ============================================================================
// Inputs
// ============================================================================

/// Unvalidated input for creating an event.
///
/// Every field is optional so that missing fields surface as a validation
/// error instead of a deserialization failure.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewEvent {
    /// Title (required)
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Location (required)
    pub location: Option<String>,
    /// Date and time (required); a timestamp without offset is read as UTC
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub date_time: Option<DateTime<Utc>>,
    /// Category
    pub category: Option<String>,
}

/// Creation input that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidNewEvent {
    /// Title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Location
    pub location: String,
    /// Date and time
    pub date_time: DateTime<Utc>,
    /// Category
    pub category: Option<String>,
}

impl NewEvent {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if title, location or date/time is
    /// missing or blank.
    pub fn validate(self) -> Result<ValidNewEvent, ServiceError> {
        let title = non_blank(self.title);
        let location = non_blank(self.location);

        match (title, location, self.date_time) {
            (Some(title), Some(location), Some(date_time)) => Ok(ValidNewEvent {
                title,
                description: self.description,
                location,
                date_time,
                category: self.category,
            }),
            _ => Err(ServiceError::Validation(
                "Missing required event fields.".to_string(),
            )),
        }
    }
}

/// Partial update of an event. Only supplied fields change.
///
/// Host, id and the attendee counter are never client-writable. The optional
/// columns (`description`, `category`) distinguish "absent" (`None`) from an
/// explicit JSON `null` (`Some(None)`), which clears them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChanges {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description; `Some(None)` clears it
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// New location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// New date and time
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time: Option<DateTime<Utc>>,
    /// New category; `Some(None)` clears it
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
}

impl EventChanges {
    /// Whether no field was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.date_time.is_none()
            && self.category.is_none()
    }

    /// Check that the change set is applicable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when nothing is supplied or a
    /// required field would become blank.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::Validation(
                "No changes made or invalid fields provided.".to_string(),
            ));
        }
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&self.title) || blank(&self.location) {
            return Err(ServiceError::Validation(
                "Title and location cannot be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Search criteria for events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring matched against title or description
    pub query: Option<String>,
    /// Only events at or after this instant
    pub from: DateTime<Utc>,
    /// Exact category match
    pub category: Option<String>,
}

impl SearchFilter {
    /// Build a filter from raw query parameters.
    ///
    /// A missing `date` means "from now". Blank parameters count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if `date` is neither RFC 3339 nor
    /// `YYYY-MM-DD`.
    pub fn from_params(
        query: Option<String>,
        date: Option<&str>,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ServiceError> {
        let from = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_lower_bound(raw)?,
            None => now,
        };

        Ok(Self {
            query: non_blank(query),
            from,
            category: non_blank(category),
        })
    }

    /// Whether an event satisfies this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if event.date_time < self.from {
            return false;
        }
        if let Some(category) = &self.category {
            if event.category.as_ref() != Some(category) {
                return false;
            }
        }
        self.query.as_ref().is_none_or(|query| {
            let needle = query.to_lowercase();
            event.title.to_lowercase().contains(&needle)
                || event
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
    }
}

/// Parse an RFC 3339 timestamp, or one without offset (read as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_lower_bound(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    parse_timestamp(raw)
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| ServiceError::Validation(format!("Invalid date filter: {raw}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_timestamp(raw.trim()).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid date_time: {raw}"))
            })
        })
        .transpose()
}

/// Present-but-null becomes `Some(None)`; `#[serde(default)]` covers absent.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn sample_event() -> Event {
        let input = NewEvent {
            title: Some("Rust Meetup".to_string()),
            description: Some("Talks about async".to_string()),
            location: Some("Berlin".to_string()),
            date_time: Some(at("2030-05-01T18:00:00Z")),
            category: Some("tech".to_string()),
        }
        .validate()
        .unwrap();
        Event::create(EventId::new(), UserId::new(), input, at("2030-01-01T00:00:00Z"))
    }

    #[test]
    fn new_event_requires_title_location_and_date() {
        let missing_location = NewEvent {
            title: Some("Launch".to_string()),
            date_time: Some(at("2030-01-01T00:00:00Z")),
            ..NewEvent::default()
        };
        assert!(matches!(
            missing_location.validate(),
            Err(ServiceError::Validation(_))
        ));

        let blank_title = NewEvent {
            title: Some("   ".to_string()),
            location: Some("HQ".to_string()),
            date_time: Some(at("2030-01-01T00:00:00Z")),
            ..NewEvent::default()
        };
        assert!(blank_title.validate().is_err());
    }

    #[test]
    fn created_event_starts_with_zero_attendees() {
        let event = sample_event();
        assert_eq!(event.attendees_count, 0);
        assert_eq!(event.created_at, event.updated_at);
    }

    #[test]
    fn empty_changes_are_rejected() {
        assert!(EventChanges::default().validate().is_err());

        let blank_location = EventChanges {
            location: Some(String::new()),
            ..EventChanges::default()
        };
        assert!(blank_location.validate().is_err());
    }

    #[test]
    fn changes_serialize_only_supplied_fields() {
        let changes = EventChanges {
            title: Some("New".to_string()),
            ..EventChanges::default()
        };
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "New" }));
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let changes: EventChanges =
            serde_json::from_value(serde_json::json!({ "category": null })).unwrap();
        assert_eq!(changes.category, Some(None));
        assert_eq!(changes.description, None);
        assert!(changes.validate().is_ok());

        let mut event = sample_event();
        event.apply(&changes, at("2030-02-01T00:00:00Z"));
        assert_eq!(event.category, None);
        assert_eq!(event.description.as_deref(), Some("Talks about async"));

        // The broadcast payload keeps the null so consumers see the clear.
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({ "category": null }));
    }

    #[test]
    fn timestamps_without_offset_are_utc() {
        let input: NewEvent = serde_json::from_value(serde_json::json!({
            "title": "Launch",
            "location": "HQ",
            "date_time": "2030-01-01T09:30:00",
        }))
        .unwrap();
        assert_eq!(input.date_time, Some(at("2030-01-01T09:30:00Z")));

        let garbage: Result<NewEvent, _> =
            serde_json::from_value(serde_json::json!({ "date_time": "soon" }));
        assert!(garbage.is_err());
    }

    #[test]
    fn apply_leaves_unsupplied_fields_alone() {
        let mut event = sample_event();
        let later = at("2030-02-01T00:00:00Z");
        event.apply(
            &EventChanges {
                location: Some("Hamburg".to_string()),
                ..EventChanges::default()
            },
            later,
        );
        assert_eq!(event.location, "Hamburg");
        assert_eq!(event.title, "Rust Meetup");
        assert_eq!(event.updated_at, later);
    }

    #[test]
    fn search_defaults_to_now() {
        let now = at("2030-01-01T00:00:00Z");
        let filter = SearchFilter::from_params(None, None, None, now).unwrap();
        assert_eq!(filter.from, now);

        let filter = SearchFilter::from_params(None, Some("  "), None, now).unwrap();
        assert_eq!(filter.from, now);
    }

    #[test]
    fn search_accepts_plain_dates_and_timestamps() {
        let now = at("2030-01-01T00:00:00Z");
        let plain = SearchFilter::from_params(None, Some("2031-03-04"), None, now).unwrap();
        assert_eq!(plain.from, at("2031-03-04T00:00:00Z"));

        let stamped =
            SearchFilter::from_params(None, Some("2031-03-04T10:00:00+02:00"), None, now).unwrap();
        assert_eq!(stamped.from, at("2031-03-04T08:00:00Z"));

        let naive = SearchFilter::from_params(None, Some("2031-03-04T10:00:00"), None, now).unwrap();
        assert_eq!(naive.from, at("2031-03-04T10:00:00Z"));

        assert!(SearchFilter::from_params(None, Some("next week"), None, now).is_err());
    }

    #[test]
    fn query_matches_title_or_description_case_insensitively() {
        let event = sample_event();
        let now = at("2030-01-01T00:00:00Z");

        let by_title = SearchFilter::from_params(Some("MEETUP".to_string()), None, None, now).unwrap();
        assert!(by_title.matches(&event));

        let by_description =
            SearchFilter::from_params(Some("Async".to_string()), None, None, now).unwrap();
        assert!(by_description.matches(&event));

        let miss = SearchFilter::from_params(Some("python".to_string()), None, None, now).unwrap();
        assert!(!miss.matches(&event));
    }

    #[test]
    fn category_and_date_bound_filter_events() {
        let event = sample_event();
        let now = at("2030-01-01T00:00:00Z");

        let other_category =
            SearchFilter::from_params(None, None, Some("music".to_string()), now).unwrap();
        assert!(!other_category.matches(&event));

        let after = SearchFilter::from_params(None, Some("2030-06-01"), None, now).unwrap();
        assert!(!after.matches(&event));
    }
}
