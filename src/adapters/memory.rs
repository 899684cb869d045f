use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

use crate::error::StoreError;
use crate::ports::DocumentStore;
use crate::types::{
    Event, NotificationRecord, NotificationTarget, NotificationWrite, ReminderKind, Snapshot, User,
};

/// In-process document store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryData>>,
}

#[derive(Debug, Default)]
struct MemoryData {
    events: BTreeMap<String, Event>,
    users: BTreeMap<String, User>,
    reminders: BTreeSet<String>,
    notifications: BTreeMap<NotificationTarget, Vec<NotificationRecord>>,
}

impl MemoryStore {
    pub fn insert_event(&self, event_id: &str, event: Event) {
        self.lock().events.insert(event_id.to_string(), event);
    }

    pub fn insert_user(&self, user_id: &str, user: User) {
        self.lock().users.insert(user_id.to_string(), user);
    }

    pub fn insert_reminder(&self, event_id: &str, kind: ReminderKind) {
        self.lock().reminders.insert(kind.marker_id(event_id));
    }

    pub fn reminder_markers(&self) -> Vec<String> {
        self.lock().reminders.iter().cloned().collect()
    }

    pub fn notifications(&self, target: &NotificationTarget) -> Vec<NotificationRecord> {
        self.lock()
            .notifications
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    pub fn notification_count(&self) -> usize {
        self.lock().notifications.values().map(Vec::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryData> {
        self.inner.lock().expect("memory store lock")
    }
}

impl DocumentStore for MemoryStore {
    type Fut<'a, T>
        = std::future::Ready<Result<T, StoreError>>
    where
        Self: 'a,
        T: Send + 'a;

    fn event<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Option<Event>> {
        std::future::ready(Ok(self.lock().events.get(event_id).cloned()))
    }

    fn events(&self) -> Self::Fut<'_, Vec<Snapshot<Event>>> {
        let events = self
            .lock()
            .events
            .iter()
            .map(|(id, event)| Snapshot::new(id.clone(), event.clone()))
            .collect();
        std::future::ready(Ok(events))
    }

    fn user<'a>(&'a self, user_id: &'a str) -> Self::Fut<'a, Option<User>> {
        std::future::ready(Ok(self.lock().users.get(user_id).cloned()))
    }

    fn users_booked_for<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Vec<Snapshot<User>>> {
        let users = self
            .lock()
            .users
            .iter()
            .filter(|(_, user)| user.has_booked(event_id))
            .map(|(id, user)| Snapshot::new(id.clone(), user.clone()))
            .collect();
        std::future::ready(Ok(users))
    }

    fn reminder_sent<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, bool> {
        let sent = self.lock().reminders.contains(&kind.marker_id(event_id));
        std::future::ready(Ok(sent))
    }

    fn mark_reminder<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, ()> {
        self.lock().reminders.insert(kind.marker_id(event_id));
        std::future::ready(Ok(()))
    }

    fn commit_notifications(&self, writes: Vec<NotificationWrite>) -> Self::Fut<'_, ()> {
        let now = OffsetDateTime::now_utc();
        let mut data = self.lock();
        for write in writes {
            let mut record = write.record;
            record.timestamp = Some(now);
            data.notifications
                .entry(write.target)
                .or_default()
                .push(record);
        }
        std::future::ready(Ok(()))
    }
}
