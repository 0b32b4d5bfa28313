//! Normalized wire events.
//!
//! OneBot payloads arrive with snake_case field names. The gateway's internal
//! convention is camelCase, so every inbound payload passes through
//! [`NormalizedEvent::from_wire`] before it reaches an event sink. Beyond the
//! two fields the dispatch path inspects (`selfId`, `postType`) the payload
//! stays opaque.

use serde_json::{Map, Value};

/// A wire payload after field-name normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent(Value);

impl NormalizedEvent {
    /// Normalizes a raw wire payload.
    pub fn from_wire(raw: Value) -> Self {
        Self(camelize(raw))
    }

    /// The bot identity this event belongs to.
    pub fn self_id(&self) -> Option<i64> {
        self.0.get("selfId").and_then(Value::as_i64)
    }

    /// The event-type marker (`message`, `notice`, `request`, `metaEvent`).
    pub fn post_type(&self) -> Option<&str> {
        self.0.get("postType").and_then(Value::as_str)
    }

    /// Looks up an arbitrary normalized field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The full normalized payload.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the event, returning the normalized payload.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Recursively rewrites snake_case object keys to camelCase.
fn camelize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(camel_key(&key), camelize(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(camelize).collect()),
        other => other,
    }
}

fn camel_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camelize_flat() {
        let event = NormalizedEvent::from_wire(json!({
            "post_type": "message",
            "self_id": 514,
            "user_id": 10000,
            "message_type": "private",
            "sub_type": "friend",
            "message": "Hello",
        }));

        assert_eq!(event.post_type(), Some("message"));
        assert_eq!(event.self_id(), Some(514));
        assert_eq!(event.get("userId"), Some(&json!(10000)));
        assert_eq!(event.get("messageType"), Some(&json!("private")));
        assert_eq!(event.get("user_id"), None);
    }

    #[test]
    fn test_camelize_nested() {
        let event = NormalizedEvent::from_wire(json!({
            "post_type": "notice",
            "sender_info": { "user_id": 1, "nick_name": "a" },
            "items": [{ "file_id": "x" }],
        }));

        assert_eq!(
            event.as_value(),
            &json!({
                "postType": "notice",
                "senderInfo": { "userId": 1, "nickName": "a" },
                "items": [{ "fileId": "x" }],
            })
        );
    }

    #[test]
    fn test_missing_fields() {
        let event = NormalizedEvent::from_wire(json!({ "echo": 3 }));
        assert_eq!(event.self_id(), None);
        assert_eq!(event.post_type(), None);
    }

    #[test]
    fn test_leading_underscore_dropped() {
        assert_eq!(camel_key("_anonymous_flag"), "anonymousFlag");
        assert_eq!(camel_key("group_id"), "groupId");
        assert_eq!(camel_key("message"), "message");
    }
}
