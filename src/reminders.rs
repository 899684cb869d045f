//! Reminders sent 24 hours and 1 hour before an event starts.
//!
//! Each (event, kind) pair fires at most once: a marker document is written
//! after the reminder goes out and checked before sending. The check and the
//! write are not atomic, so two overlapping runs can both send.

use serde::Serialize;
use time::OffsetDateTime;

use crate::dispatch::{DispatchReport, Dispatcher, Intent};
use crate::error::StoreError;
use crate::ports::{DocumentStore, PushSender};
use crate::types::{Content, Event, ReminderKind};

mod scheduler;

pub use scheduler::{ReminderLoopHandle, ReminderScheduler};

/// Reminder kinds whose window `(now, now + lead]` contains the event start.
pub fn due_reminders(event: &Event, now: OffsetDateTime) -> Vec<ReminderKind> {
    let Some(date) = event.date else {
        return Vec::new();
    };
    ReminderKind::ALL
        .into_iter()
        .filter(|kind| date > now && date <= now + kind.lead())
        .collect()
}

pub fn plan_reminder(
    event_id: &str,
    event: &Event,
    kind: ReminderKind,
    recipients: Vec<String>,
) -> Vec<Intent> {
    let content = Content::new(
        event_id,
        "Event Reminder",
        format!(
            "Your event '{}' is starting {}.",
            event.display_name(),
            kind.phrase()
        ),
    );
    vec![
        Intent::Users {
            user_ids: recipients,
            content,
        },
        Intent::MarkReminder {
            event_id: event_id.to_string(),
            kind,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredReminder {
    pub event_id: String,
    pub kind: ReminderKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRun {
    pub scanned: usize,
    pub fired: Vec<FiredReminder>,
    pub pushes: usize,
    pub writes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReminderJob<S, P> {
    dispatcher: Dispatcher<S, P>,
}

impl<S, P> ReminderJob<S, P>
where
    S: DocumentStore,
    P: PushSender,
{
    pub fn new(dispatcher: Dispatcher<S, P>) -> Self {
        Self { dispatcher }
    }

    pub async fn run(&self, now: OffsetDateTime) -> Result<ReminderRun, StoreError> {
        let store = self.dispatcher.store();
        let events = store.events().await?;
        let mut run = ReminderRun {
            scanned: events.len(),
            ..Default::default()
        };
        let mut report = DispatchReport::default();

        for snapshot in &events {
            for kind in due_reminders(&snapshot.data, now) {
                if store.reminder_sent(&snapshot.id, kind).await? {
                    tracing::debug!(event_id = %snapshot.id, kind = kind.as_str(), "reminder already sent");
                    continue;
                }
                let recipients = store
                    .users_booked_for(&snapshot.id)
                    .await?
                    .into_iter()
                    .map(|user| user.id)
                    .collect();
                tracing::info!(event_id = %snapshot.id, kind = kind.as_str(), "sending reminder");
                let plan = plan_reminder(&snapshot.id, &snapshot.data, kind, recipients);
                report.merge(self.dispatcher.execute(plan).await?);
                run.fired.push(FiredReminder {
                    event_id: snapshot.id.clone(),
                    kind,
                });
            }
        }

        run.pushes = report.pushes;
        run.writes = report.writes;
        run.error = report.failure;
        Ok(run)
    }
}
