//! The event draft produced by extraction and carried through approval

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every draft must carry, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 5] = ["title", "description", "start_time", "end_time", "location"];

/// An extracted event awaiting validation, approval or publishing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    /// ISO-8601 start, as returned by the model
    pub start_time: String,
    /// ISO-8601 end, as returned by the model
    pub end_time: String,
    pub location: String,
}

impl EventDraft {
    /// Builds a draft from a decoded JSON object
    ///
    /// Strings are taken verbatim, `null` and missing fields become empty
    /// strings and any other value is rendered as JSON text. Call this only
    /// after validation has confirmed the required fields are present.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |name: &str| match object.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Self {
            title: field("title"),
            description: field("description"),
            start_time: field("start_time"),
            end_time: field("end_time"),
            location: field("location"),
        }
    }

    /// Renders the chat message an admin reacts to
    ///
    /// The description is cut at `description_limit` characters and always
    /// followed by an ellipsis.
    pub fn chat_summary(&self, description_limit: usize) -> String {
        let description: String = self.description.chars().take(description_limit).collect();
        format!(
            "Event Detected! 🎉\nTitle: {}\nTime: {} - {}\nLocation: {}\n\n{}...",
            self.title, self.start_time, self.end_time, self.location, description
        )
    }
}

/// A validated draft plus any soft warnings, as returned by `/parse-event`
///
/// Serializes with the draft fields at the top level and a `warnings` array
/// only when there is something to warn about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvent {
    #[serde(flatten)]
    pub draft: EventDraft,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_object_takes_strings() {
        let value = json!({
            "title": "Launch Party",
            "description": "Source: https://example.com\n\nFun",
            "start_time": "2024-06-01T18:00:00-05:00",
            "end_time": "2024-06-01T21:00:00-05:00",
            "location": "HQ",
            "extra": "ignored"
        });
        let draft = EventDraft::from_object(value.as_object().unwrap());
        assert_eq!(draft.title, "Launch Party");
        assert_eq!(draft.location, "HQ");
        assert_eq!(draft.start_time, "2024-06-01T18:00:00-05:00");
    }

    #[test]
    fn test_from_object_null_becomes_empty() {
        let value = json!({"title": null, "location": 12});
        let draft = EventDraft::from_object(value.as_object().unwrap());
        assert_eq!(draft.title, "");
        assert_eq!(draft.location, "12");
        assert_eq!(draft.description, "");
    }

    #[test]
    fn test_chat_summary_truncates_description() {
        let draft = EventDraft {
            title: "Meetup".to_string(),
            description: "abcdefghij".to_string(),
            start_time: "2024-01-01T10:00:00Z".to_string(),
            end_time: "2024-01-01T11:00:00Z".to_string(),
            location: "Library".to_string(),
        };
        let summary = draft.chat_summary(4);
        assert!(summary.starts_with("Event Detected! 🎉\nTitle: Meetup\n"));
        assert!(summary.contains("Time: 2024-01-01T10:00:00Z - 2024-01-01T11:00:00Z"));
        assert!(summary.ends_with("\n\nabcd..."));
    }

    #[test]
    fn test_parsed_event_flattens_fields() {
        let parsed = ParsedEvent {
            draft: EventDraft {
                title: "Meetup".to_string(),
                ..EventDraft::default()
            },
            warnings: vec![],
        };
        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["title"], "Meetup");
        assert!(value.get("warnings").is_none());

        let with_warning: ParsedEvent = serde_json::from_value(json!({
            "title": "Meetup",
            "description": "",
            "start_time": "2024-01-01T10:00:00Z",
            "end_time": "2024-01-01T11:00:00Z",
            "location": "",
            "warnings": ["Empty value for field: location"]
        }))
        .unwrap();
        assert_eq!(with_warning.warnings.len(), 1);
        assert_eq!(with_warning.draft.start_time, "2024-01-01T10:00:00Z");
    }
}
