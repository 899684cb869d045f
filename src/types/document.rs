use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// A document as read from the store, together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub id: String,
    pub data: T,
}

impl<T> Snapshot<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Reads an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An event in the `News` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "Date",
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<OffsetDateTime>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "creatorId", default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ratings: HashMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub waitlist: Vec<String>,
}

impl Event {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "your event",
        }
    }

    pub fn date_seconds(&self) -> Option<i64> {
        self.date.map(OffsetDateTime::unix_timestamp)
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn waitlist_head(&self) -> Option<&str> {
        self.waitlist.first().map(String::as_str)
    }
}

/// A user in the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "bookedEvents", default, deserialize_with = "null_as_default")]
    pub booked_events: Vec<String>,
    #[serde(rename = "fcmToken", default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

impl User {
    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn has_booked(&self, event_id: &str) -> bool {
        self.booked_events.iter().any(|id| id == event_id)
    }
}
