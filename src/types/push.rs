use serde::{Deserialize, Serialize};

use super::notification::{NotificationKind, NotificationRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushData {
    #[serde(rename = "eventId")]
    pub event_id: String,
}

/// What a push says, independent of who receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub notification: PushNotification,
    pub data: PushData,
}

impl Content {
    pub fn new(event_id: &str, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            notification: PushNotification {
                title: title.into(),
                body: body.into(),
            },
            data: PushData {
                event_id: event_id.to_string(),
            },
        }
    }

    pub fn record(&self, kind: NotificationKind) -> NotificationRecord {
        NotificationRecord {
            title: self.notification.title.clone(),
            body: self.notification.body.clone(),
            timestamp: None,
            read: false,
            kind,
            event_id: self.data.event_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushTarget {
    Token(String),
    Tokens(Vec<String>),
    Topic(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    #[serde(flatten)]
    pub target: PushTarget,
    #[serde(flatten)]
    pub content: Content,
}

impl PushMessage {
    pub fn new(target: PushTarget, content: Content) -> Self {
        Self { target, content }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn push_message__should_encode_provider_payload() {
        // Given
        let content = Content::new("E1", "Event Updated", "Check it out");
        let message = PushMessage::new(PushTarget::Topic("event_E1".to_string()), content);

        // When
        let value = serde_json::to_value(&message).expect("encode message");

        // Then
        assert_eq!(
            value,
            serde_json::json!({
                "topic": "event_E1",
                "notification": {"title": "Event Updated", "body": "Check it out"},
                "data": {"eventId": "E1"}
            })
        );
    }

    #[test]
    fn content__should_build_unread_record() {
        // Given
        let content = Content::new("E1", "New Review", "Your event got a review.");

        // When
        let record = content.record(NotificationKind::Review);

        // Then
        assert_eq!(record.title, "New Review");
        assert_eq!(record.event_id, "E1");
        assert!(!record.read);
        assert!(record.timestamp.is_none());
    }
}
