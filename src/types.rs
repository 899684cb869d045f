mod document;
mod notification;
mod push;

pub use document::{Event, Snapshot, User};
pub use notification::{NotificationKind, NotificationRecord, NotificationTarget, NotificationWrite, ReminderKind};
pub use push::{Content, PushData, PushMessage, PushNotification, PushTarget};
