use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Interview descriptor returned by `GET interview/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    pub expire_date: DateTime<Utc>,
}

/// One question as stored by the interview service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    /// Allotted time in minutes; may be fractional or absent
    #[serde(default)]
    pub time: Option<f64>,
}

/// Body of `GET interview/{id}/questions`, wrapped or as a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionsPayload {
    Wrapped {
        #[serde(default)]
        questions: Vec<QuestionRecord>,
    },
    List(Vec<QuestionRecord>),
}

impl QuestionsPayload {
    pub fn into_questions(self) -> Vec<QuestionRecord> {
        match self {
            QuestionsPayload::Wrapped { questions } => questions,
            QuestionsPayload::List(questions) => questions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
}

/// Body of `POST users`, either `{ id }` or `{ user: { _id } }`
#[derive(Debug, Deserialize)]
pub struct CreateUserResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl CreateUserResponse {
    pub fn user_id(self) -> Option<String> {
        self.id.or(self.user.map(|u| u.id))
    }
}

/// Stored-video descriptor returned by `POST videos`
///
/// Read from any JSON object; the id comes from `_id`, then `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct StoredVideo {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredVideo {
    /// Descriptor from a successful upload reply; unreadable bodies carry no id
    pub fn from_reply(body: &str) -> Self {
        serde_json::from_str::<Map<String, Value>>(body)
            .map(StoredVideo::from)
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for StoredVideo {
    fn from(mut fields: Map<String, Value>) -> Self {
        let primary = fields.remove("_id").and_then(id_string);
        let secondary = fields.remove("id").and_then(id_string);

        StoredVideo {
            id: primary.or(secondary),
            fields,
        }
    }
}

fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_video_accepts_both_id_keys() {
        let video: StoredVideo =
            serde_json::from_str(r#"{"_id":"v1","id":"v1","url":"/v.webm"}"#).unwrap();
        assert_eq!(video.id.as_deref(), Some("v1"));
        assert_eq!(video.fields["url"], "/v.webm");
        assert!(!video.fields.contains_key("id"));
    }

    #[test]
    fn test_stored_video_prefers_underscore_id() {
        let video: StoredVideo = serde_json::from_str(r#"{"id":"virtual","_id":"v2"}"#).unwrap();
        assert_eq!(video.id.as_deref(), Some("v2"));

        let video: StoredVideo = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(video.id.as_deref(), Some("7"));
    }

    #[test]
    fn test_stored_video_from_unreadable_reply() {
        assert_eq!(StoredVideo::from_reply(""), StoredVideo::default());
        assert_eq!(StoredVideo::from_reply("Created"), StoredVideo::default());
        assert_eq!(StoredVideo::from_reply("[1, 2]").id, None);
    }

    #[test]
    fn test_stored_video_serializes_underscore_id() {
        let video = StoredVideo::from_reply(r#"{"id":"v3","size":10}"#);
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["_id"], "v3");
        assert_eq!(json["size"], 10);
    }
}
