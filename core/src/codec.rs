//! JSON codec between the domain records and the Fomo wire format.
//!
//! # Design
//! Outbound drafts always carry every declared field, because the service
//! tells "unset" apart from "absent" only by default value. Object keys are
//! emitted in sorted order at every nesting level so request bodies are
//! reproducible regardless of which `serde_json` features are enabled.
//!
//! Inbound payloads are first parsed into a `serde_json::Value` so the
//! top-level shape can be checked explicitly; serde's derived struct impls
//! would otherwise accept a JSON array in place of an object.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{DeleteAck, Event, EventDraft, EventPage, PageMeta};

/// Request envelope for create and update calls.
#[derive(Serialize)]
struct EventEnvelope<'a> {
    event: &'a EventDraft,
}

/// Serialize a draft as a flat JSON object with sorted keys.
pub fn serialize_draft(draft: &EventDraft) -> Result<String, ApiError> {
    to_sorted_string(draft)
}

/// Serialize a draft wrapped as `{"event": {...}}`.
pub fn serialize_envelope(draft: &EventDraft) -> Result<String, ApiError> {
    to_sorted_string(&EventEnvelope { event: draft })
}

/// Parse a single event object.
pub fn deserialize_event(text: &str) -> Result<Event, ApiError> {
    event_from_value(parse(text)?)
}

/// Parse a JSON array of event objects.
pub fn deserialize_events(text: &str) -> Result<Vec<Event>, ApiError> {
    match parse(text)? {
        Value::Array(items) => events_from_values(items),
        other => Err(ApiError::malformed(format!(
            "expected a JSON array of events, found {}",
            kind(&other)
        ))),
    }
}

/// Parse a `{"events": [...], "meta": {...}}` envelope.
pub fn deserialize_page(text: &str) -> Result<EventPage, ApiError> {
    let mut envelope = expect_object(parse(text)?, "event page")?;

    let events = match envelope.remove("events") {
        Some(Value::Array(items)) => events_from_values(items)?,
        Some(other) => {
            return Err(ApiError::malformed(format!(
                "`events` must be an array, found {}",
                kind(&other)
            )))
        }
        None => return Err(ApiError::malformed("event page is missing `events`")),
    };

    let meta = match envelope.remove("meta") {
        Some(value) => from_object::<PageMeta>(value, "page meta")?,
        None => return Err(ApiError::malformed("event page is missing `meta`")),
    };

    Ok(EventPage { events, meta })
}

/// Parse a delete acknowledgement. A missing message becomes `""`.
pub fn deserialize_delete_ack(text: &str) -> Result<DeleteAck, ApiError> {
    from_object(parse(text)?, "delete acknowledgement")
}

fn parse(text: &str) -> Result<Value, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::malformed(format!("invalid JSON: {e}")))
}

fn event_from_value(value: Value) -> Result<Event, ApiError> {
    from_object(value, "event")
}

fn events_from_values(items: Vec<Value>) -> Result<Vec<Event>, ApiError> {
    items.into_iter().map(event_from_value).collect()
}

fn from_object<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    let object = expect_object(value, what)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|e| ApiError::malformed(format!("invalid {what}: {e}")))
}

fn expect_object(value: Value, what: &str) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(ApiError::malformed(format!(
            "expected {what} to be a JSON object, found {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn to_sorted_string<T: Serialize>(payload: &T) -> Result<String, ApiError> {
    let value = serde_json::to_value(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
    serde_json::to_string(&sort_keys(value)).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomAttribute, EventId};

    fn order_draft() -> EventDraft {
        let mut draft = EventDraft::with_type_tag("new_order", "https://example.com");
        draft.title = "Test event".to_string();
        draft.add_custom_event_field("variable_name", "value");
        draft
    }

    #[test]
    fn serialize_draft_emits_every_field() {
        let json: Value = serde_json::from_str(&serialize_draft(&EventDraft::default()).unwrap()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "event_type_id",
            "event_type_tag",
            "url",
            "first_name",
            "email_address",
            "ip_address",
            "city",
            "province",
            "country",
            "title",
            "external_id",
            "image_url",
        ] {
            assert_eq!(object[key], "", "{key}");
        }
        assert_eq!(object["custom_event_fields_attributes"], serde_json::json!([]));
    }

    #[test]
    fn serialize_draft_sorts_keys() {
        let text = serialize_draft(&order_draft()).unwrap();
        let positions: Vec<usize> = ["city", "country", "custom_event_fields_attributes", "email_address", "url"]
            .iter()
            .map(|key| text.find(&format!("\"{key}\"")).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(text.contains(r#"{"key":"variable_name","value":"value"}"#));
    }

    #[test]
    fn envelope_wraps_draft_under_event() {
        let json: Value = serde_json::from_str(&serialize_envelope(&order_draft()).unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        let event = &object["event"];
        assert_eq!(event["event_type_tag"], "new_order");
        assert_eq!(event["title"], "Test event");
        assert_eq!(event["url"], "https://example.com");
        assert_eq!(
            event["custom_event_fields_attributes"],
            serde_json::json!([{"key": "variable_name", "value": "value"}])
        );
    }

    #[test]
    fn draft_round_trips_through_event() {
        let draft = order_draft();
        let event = deserialize_event(&serialize_draft(&draft).unwrap()).unwrap();
        assert_eq!(event.draft, draft);
        assert_eq!(event.id, None);
        assert_eq!(event.created_at, "");
    }

    #[test]
    fn deserialize_event_ignores_unknown_fields() {
        let event = deserialize_event(r#"{"id":12,"title":"t","unexpected":{"nested":true}}"#).unwrap();
        assert_eq!(event.id, Some(EventId(12)));
        assert_eq!(event.draft.title, "t");
    }

    #[test]
    fn deserialize_event_reads_server_fields() {
        let event = deserialize_event(
            r#"{
                "id": 1,
                "application_id": 2,
                "created_at": "2017-01-01T00:00:00.000Z",
                "updated_at": "2017-01-02T00:00:00.000Z",
                "created_at_as_timestamp_in_seconds": 1483228800,
                "message": "Ryan just bought it",
                "link": "https://example.com",
                "template_variables": {"first_name": "Ryan"},
                "custom_event_fields_attributes": [
                    {"id": 9, "key": "a", "value": "1"},
                    {"id": 10, "key": "a", "value": "2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(event.application_id, Some(2));
        assert_eq!(event.created_at_as_timestamp_in_seconds, Some(1_483_228_800));
        assert_eq!(event.message, "Ryan just bought it");
        assert_eq!(event.template_variables.unwrap()["first_name"], "Ryan");
        assert_eq!(
            event.draft.custom_event_fields_attributes,
            vec![CustomAttribute::new("a", "1"), CustomAttribute::new("a", "2")]
        );
    }

    #[test]
    fn deserialize_event_accepts_numeric_template_id() {
        let event = deserialize_event(
            r#"{"id":1,"event_type_id":183,"custom_event_fields_attributes":[{"key":"price","value":9.5}]}"#,
        )
        .unwrap();
        assert_eq!(event.draft.event_type_id, "183");
        assert_eq!(event.draft.custom_event_fields_attributes, vec![CustomAttribute::new("price", "9.5")]);
    }

    #[test]
    fn deserialize_event_rejects_non_json() {
        let err = deserialize_event("not json").unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn deserialize_event_rejects_array() {
        let err = deserialize_event("[]").unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn deserialize_event_rejects_wrong_field_type() {
        let err = deserialize_event(r#"{"id":"abc"}"#).unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn deserialize_events_empty() {
        assert!(deserialize_events("[]").unwrap().is_empty());
    }

    #[test]
    fn deserialize_events_single() {
        let events = deserialize_events(r#"[{"id":3,"city":"San Francisco"}]"#).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, Some(EventId(3)));
        assert_eq!(events[0].draft.city, "San Francisco");
    }

    #[test]
    fn deserialize_events_rejects_object() {
        let err = deserialize_events(r#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn deserialize_events_rejects_non_object_element() {
        let err = deserialize_events(r#"[{"id":1}, 2]"#).unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn deserialize_page_keeps_meta_verbatim() {
        let page = deserialize_page(
            r#"{"events":[],"meta":{"per_page":30,"page":1,"total_count":0,"total_pages":1}}"#,
        )
        .unwrap();
        assert!(page.events.is_empty());
        assert_eq!(
            page.meta,
            PageMeta {
                per_page: 30,
                page: 1,
                total_count: 0,
                total_pages: 1
            }
        );
    }

    #[test]
    fn deserialize_page_defaults_missing_meta_fields() {
        let page = deserialize_page(r#"{"events":[{"id":5}],"meta":{"page":2}}"#).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.meta.per_page, 30);
        assert_eq!(page.meta.total_pages, 1);
    }

    #[test]
    fn deserialize_page_requires_both_keys() {
        for text in [r#"{"events":[]}"#, r#"{"meta":{}}"#, "[]"] {
            let err = deserialize_page(text).unwrap_err();
            assert!(matches!(err, ApiError::MalformedResponse(_)), "{text}");
        }
    }

    #[test]
    fn deserialize_page_rejects_wrong_shapes() {
        for text in [r#"{"events":{},"meta":{}}"#, r#"{"events":[],"meta":[]}"#] {
            let err = deserialize_page(text).unwrap_err();
            assert!(matches!(err, ApiError::MalformedResponse(_)), "{text}");
        }
    }

    #[test]
    fn deserialize_delete_ack_message() {
        let ack = deserialize_delete_ack(r#"{"message":"Event successfully deleted"}"#).unwrap();
        assert_eq!(ack.message, "Event successfully deleted");
    }

    #[test]
    fn deserialize_delete_ack_missing_message_is_empty() {
        assert_eq!(deserialize_delete_ack("{}").unwrap().message, "");
        assert_eq!(deserialize_delete_ack(r#"{"message":null}"#).unwrap().message, "");
    }
}
