use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewEvent,
    EventUpdate,
    EventCancellation,
    Review,
    WaitlistAlert,
}

/// In-app notification written for later display by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub title: String,
    pub body: String,
    /// Assigned by the store when the record is written.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(rename = "eventId")]
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationTarget {
    User(String),
    Global,
}

impl NotificationTarget {
    pub fn collection_path(&self) -> String {
        match self {
            NotificationTarget::User(user_id) => format!("users/{user_id}/notifications"),
            NotificationTarget::Global => "global_notifications".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationWrite {
    pub target: NotificationTarget,
    pub record: NotificationRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReminderKind {
    #[serde(rename = "24_hour")]
    DayBefore,
    #[serde(rename = "1_hour")]
    HourBefore,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 2] = [ReminderKind::DayBefore, ReminderKind::HourBefore];

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "24_hour",
            ReminderKind::HourBefore => "1_hour",
        }
    }

    /// How far ahead of the event start the reminder window opens.
    pub fn lead(self) -> time::Duration {
        match self {
            ReminderKind::DayBefore => time::Duration::hours(24),
            ReminderKind::HourBefore => time::Duration::hours(1),
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "in 24 hours",
            ReminderKind::HourBefore => "in 1 hour",
        }
    }

    pub fn marker_id(self, event_id: &str) -> String {
        format!("{event_id}_{}", self.as_str())
    }
}
