use ais_api::BoundingBox;
use serde::Serialize;

/// Subscription request sent right after the WebSocket handshake.
///
/// ```json
/// {"APIKey": "...", "BoundingBoxes": [[[25.07, -21.45], [47.95, 44.99]]]}
/// ```
#[derive(Clone, Serialize)]
pub struct Subscription {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "BoundingBoxes")]
    pub bounding_boxes: Vec<BoundingBox>,
    /// Restrict the feed to these message types (all types when empty).
    #[serde(rename = "FilterMessageTypes", skip_serializing_if = "Vec::is_empty")]
    pub message_types: Vec<String>,
}

impl Subscription {
    pub fn new(api_key: impl Into<String>, bounding_boxes: Vec<BoundingBox>) -> Self {
        Self {
            api_key: api_key.into(),
            bounding_boxes,
            message_types: Vec::new(),
        }
    }

    pub fn with_message_types(mut self, types: Vec<String>) -> Self {
        self.message_types = types;
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// The API key must never reach the logs.
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("api_key", &"<redacted>")
            .field("bounding_boxes", &self.bounding_boxes)
            .field("message_types", &self.message_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_api::Region;

    #[test]
    fn wire_format() {
        let sub = Subscription::new("secret", Region::Global.boxes());
        assert_eq!(
            sub.to_json().unwrap(),
            r#"{"APIKey":"secret","BoundingBoxes":[[[-90.0,-180.0],[90.0,180.0]]]}"#
        );

        let sub = sub.with_message_types(vec!["PositionReport".into()]);
        let v: serde_json::Value = serde_json::from_str(&sub.to_json().unwrap()).unwrap();
        assert_eq!(v["FilterMessageTypes"], serde_json::json!(["PositionReport"]));
    }

    #[test]
    fn debug_redacts_key() {
        let sub = Subscription::new("secret", Vec::new());
        let dbg = format!("{sub:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
