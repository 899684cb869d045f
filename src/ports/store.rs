use crate::error::StoreError;
use crate::types::{Event, NotificationWrite, ReminderKind, Snapshot, User};

/// Document-store operations the handlers rely on.
///
/// Missing documents are reported as `None`, never as errors.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    type Fut<'a, T>: Future<Output = Result<T, StoreError>> + Send + 'a
    where
        Self: 'a,
        T: Send + 'a;

    fn event<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Option<Event>>;

    fn events(&self) -> Self::Fut<'_, Vec<Snapshot<Event>>>;

    fn user<'a>(&'a self, user_id: &'a str) -> Self::Fut<'a, Option<User>>;

    /// Users whose `bookedEvents` contains `event_id`.
    fn users_booked_for<'a>(&'a self, event_id: &'a str) -> Self::Fut<'a, Vec<Snapshot<User>>>;

    fn reminder_sent<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, bool>;

    fn mark_reminder<'a>(&'a self, event_id: &'a str, kind: ReminderKind) -> Self::Fut<'a, ()>;

    /// Writes every record in one atomic batch. Each record gets a fresh id
    /// and a server-assigned timestamp.
    fn commit_notifications(&self, writes: Vec<NotificationWrite>) -> Self::Fut<'_, ()>;
}
