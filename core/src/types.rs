//! Domain records for the Fomo events API.
//!
//! # Design
//! These types mirror the service's JSON schema but are defined independently
//! of the mock-server crate; integration tests catch schema drift between the
//! two. Every string field defaults to `""` when it is missing or `null` on
//! the wire, and every non-string optional defaults to `None`. The delete
//! acknowledgement follows the same string rule.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned numeric identifier of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A key/value pair filling one placeholder of the event template.
///
/// Keys need not be unique. The order of attributes inside an event is
/// preserved end to end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    #[serde(default, deserialize_with = "string_or_number")]
    pub key: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

impl CustomAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Outbound event payload for create and update calls.
///
/// The template is referenced by `event_type_id` or `event_type_tag`; at
/// least one of them must be set. `url` is required. The service limits every
/// string field to 255 characters and enforces that limit itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Template id. The service may report it as a JSON number; it is kept
    /// in its decimal string form.
    #[serde(default, deserialize_with = "string_or_number")]
    pub event_type_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_type_tag: String,
    /// Redirect target when the notification is clicked.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub province: String,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Caller-side correlation id, echoed back by the service.
    #[serde(default, deserialize_with = "string_or_number")]
    pub external_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_event_fields_attributes: Vec<CustomAttribute>,
}

impl EventDraft {
    /// Draft referencing a template by its id.
    pub fn with_type_id(event_type_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            event_type_id: event_type_id.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Draft referencing a template by its tag.
    pub fn with_type_tag(event_type_tag: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            event_type_tag: event_type_tag.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Append a custom attribute after the existing ones.
    pub fn add_custom_event_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_event_fields_attributes
            .push(CustomAttribute::new(key, value));
    }

    /// Check that the fields the service requires are present.
    ///
    /// Returns a description of the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_type_id.is_empty() && self.event_type_tag.is_empty() {
            return Err("either event_type_id or event_type_tag must be set".to_string());
        }
        if self.url.is_empty() {
            return Err("url must be set".to_string());
        }
        Ok(())
    }
}

/// A full event record as returned by the service.
///
/// The draft fields are flattened into the same JSON object as the
/// server-assigned ones. Mutate `draft` and pass the event to
/// `FomoClient::update_event` to change it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<EventId>,
    #[serde(default)]
    pub application_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default)]
    pub created_at_as_timestamp_in_seconds: Option<i64>,
    /// Template text rendered with this event's fields.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Rendered redirect link.
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default)]
    pub template_variables: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub draft: EventDraft,
}

/// Pagination metadata of a list-with-meta response.
///
/// `total_pages == ceil(total_count / per_page)` is guaranteed by the
/// service and not checked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub per_page: u32,
    pub page: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            per_page: 30,
            page: 1,
            total_count: 0,
            total_pages: 1,
        }
    }
}

/// One page of events together with its pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub meta: PageMeta,
}

/// Acknowledgement returned by a delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Page selection for list calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub per_page: u32,
    pub page: u32,
}

impl PageRequest {
    pub fn new(per_page: u32, page: u32) -> Self {
        Self { per_page, page }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: 30,
            page: 1,
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

/// Accept a string or a number for a text field; `null` becomes `""`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => s,
        Some(StringOrNumber::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_defaults_every_field() {
        let draft: EventDraft = serde_json::from_str("{}").unwrap();
        assert_eq!(draft, EventDraft::default());
        assert!(draft.custom_event_fields_attributes.is_empty());
    }

    #[test]
    fn null_strings_become_empty() {
        let draft: EventDraft =
            serde_json::from_str(r#"{"city":null,"custom_event_fields_attributes":null}"#).unwrap();
        assert_eq!(draft.city, "");
        assert!(draft.custom_event_fields_attributes.is_empty());
    }

    #[test]
    fn add_custom_event_field_preserves_order_and_duplicates() {
        let mut draft = EventDraft::with_type_tag("new_order", "https://example.com");
        draft.add_custom_event_field("b", "1");
        draft.add_custom_event_field("a", "2");
        draft.add_custom_event_field("b", "3");
        let keys: Vec<&str> = draft
            .custom_event_fields_attributes
            .iter()
            .map(|a| a.key.as_str())
            .collect();
        assert_eq!(keys, ["b", "a", "b"]);
    }

    #[test]
    fn validate_requires_template_reference() {
        let draft = EventDraft {
            url: "https://example.com".to_string(),
            ..EventDraft::default()
        };
        assert!(draft.validate().unwrap_err().contains("event_type"));
    }

    #[test]
    fn validate_requires_url() {
        let draft = EventDraft::with_type_id("183", "");
        assert!(draft.validate().unwrap_err().contains("url"));
    }

    #[test]
    fn validate_accepts_either_reference() {
        assert!(EventDraft::with_type_id("183", "https://a.example").validate().is_ok());
        assert!(EventDraft::with_type_tag("signup", "https://a.example").validate().is_ok());
    }

    #[test]
    fn page_meta_defaults_when_absent() {
        let meta: PageMeta = serde_json::from_str(r#"{"total_count":42}"#).unwrap();
        assert_eq!(meta.per_page, 30);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.total_count, 42);
        assert_eq!(meta.total_pages, 1);
    }

    #[test]
    fn numeric_ids_and_values_become_strings() {
        let draft: EventDraft = serde_json::from_str(
            r#"{"event_type_id":183,"external_id":null,"custom_event_fields_attributes":[{"key":"qty","value":3}]}"#,
        )
        .unwrap();
        assert_eq!(draft.event_type_id, "183");
        assert_eq!(draft.external_id, "");
        assert_eq!(draft.custom_event_fields_attributes, vec![CustomAttribute::new("qty", "3")]);
    }

    #[test]
    fn non_scalar_template_id_is_rejected() {
        let result: Result<EventDraft, _> = serde_json::from_str(r#"{"event_type_id":[1]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn event_id_displays_as_decimal() {
        assert_eq!(EventId(183).to_string(), "183");
    }

    #[test]
    fn event_flattens_draft_fields() {
        let event: Event = serde_json::from_str(
            r#"{"id":7,"title":"Hello","custom_event_fields_attributes":[{"key":"k","value":"v"}]}"#,
        )
        .unwrap();
        assert_eq!(event.id, Some(EventId(7)));
        assert_eq!(event.draft.title, "Hello");
        assert_eq!(
            event.draft.custom_event_fields_attributes,
            vec![CustomAttribute::new("k", "v")]
        );
        assert!(event.template_variables.is_none());
    }
}
