//! Notifications for events being created, changed, or cancelled.

use time::OffsetDateTime;
use time::macros::format_description;

use crate::dispatch::{Dispatcher, Intent};
use crate::error::StoreError;
use crate::handlers::{HandlerOutcome, event_topic};
use crate::ports::{DocumentStore, PushSender};
use crate::types::{Content, Event, NotificationKind};

pub const NEW_EVENTS_TOPIC: &str = "newEvents";

pub fn format_event_date(date: Option<OffsetDateTime>) -> String {
    let formatted = date.and_then(|date| {
        date.to_offset(time::UtcOffset::UTC)
            .format(format_description!(
                "[weekday], [month repr:long] [day padding:none], [year] at [hour repr:12 padding:none]:[minute] [period] UTC"
            ))
            .ok()
    });
    formatted.unwrap_or_else(|| "an upcoming date".to_string())
}

pub fn plan_create(event_id: &str, event: &Event) -> Vec<Intent> {
    let name = event.display_name();
    let content = Content::new(
        event_id,
        format!("New Event: {name}"),
        format!(
            "{name} is happening on {}. Don't miss it!",
            format_event_date(event.date)
        ),
    );
    vec![
        Intent::Topic {
            topic: NEW_EVENTS_TOPIC.to_string(),
            content: content.clone(),
        },
        Intent::PersistGlobal(content.record(NotificationKind::NewEvent)),
    ]
}

/// Only the name, start time (to the second) and location count as a change.
pub fn details_changed(before: &Event, after: &Event) -> bool {
    before.name != after.name
        || before.date_seconds() != after.date_seconds()
        || before.location != after.location
}

pub fn plan_update(event_id: &str, before: &Event, after: &Event) -> Vec<Intent> {
    if !details_changed(before, after) {
        return Vec::new();
    }
    let content = Content::new(
        event_id,
        "Event Updated",
        format!(
            "'{}' has been updated. Check the latest details.",
            after.display_name()
        ),
    );
    notify_booked(event_id, content, NotificationKind::EventUpdate)
}

pub fn plan_delete(event_id: &str, before: &Event) -> Vec<Intent> {
    let content = Content::new(
        event_id,
        "Event Cancelled",
        format!("'{}' has been cancelled.", before.display_name()),
    );
    notify_booked(event_id, content, NotificationKind::EventCancellation)
}

fn notify_booked(event_id: &str, content: Content, kind: NotificationKind) -> Vec<Intent> {
    vec![
        Intent::Topic {
            topic: event_topic(event_id),
            content: content.clone(),
        },
        Intent::PersistBooked {
            event_id: event_id.to_string(),
            record: content.record(kind),
        },
    ]
}

pub async fn on_create<S, P>(
    dispatcher: &Dispatcher<S, P>,
    event_id: &str,
    event: &Event,
) -> Result<HandlerOutcome, StoreError>
where
    S: DocumentStore,
    P: PushSender,
{
    tracing::info!(event_id = %event_id, "announcing new event");
    let report = dispatcher.execute(plan_create(event_id, event)).await?;
    Ok(report.into())
}

pub async fn on_update<S, P>(
    dispatcher: &Dispatcher<S, P>,
    event_id: &str,
    before: &Event,
    after: &Event,
) -> Result<HandlerOutcome, StoreError>
where
    S: DocumentStore,
    P: PushSender,
{
    let plan = plan_update(event_id, before, after);
    if plan.is_empty() {
        tracing::debug!(event_id = %event_id, "event details unchanged");
        return Ok(HandlerOutcome::skipped("event details unchanged"));
    }
    tracing::info!(event_id = %event_id, "notifying attendees of event update");
    let report = dispatcher.execute(plan).await?;
    Ok(report.into())
}

pub async fn on_delete<S, P>(
    dispatcher: &Dispatcher<S, P>,
    event_id: &str,
    before: &Event,
) -> Result<HandlerOutcome, StoreError>
where
    S: DocumentStore,
    P: PushSender,
{
    tracing::info!(event_id = %event_id, "notifying attendees of cancellation");
    let report = dispatcher.execute(plan_delete(event_id, before)).await?;
    Ok(report.into())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::dispatch::testing::TestSender;
    use crate::types::{NotificationTarget, PushTarget, User};
    use time::macros::datetime;

    fn jazz_night() -> Event {
        Event {
            name: Some("Jazz Night".to_string()),
            date: Some(datetime!(2026-03-14 19:30 UTC)),
            location: Some("Main Hall".to_string()),
            ..Default::default()
        }
    }

    fn store_with_attendees() -> MemoryStore {
        let store = MemoryStore::default();
        store.insert_user(
            "u1",
            User {
                booked_events: vec!["E1".to_string()],
                fcm_token: Some("token-1".to_string()),
            },
        );
        store.insert_user(
            "u2",
            User {
                booked_events: vec!["E1".to_string(), "E2".to_string()],
                fcm_token: None,
            },
        );
        store.insert_user(
            "u3",
            User {
                booked_events: vec!["E2".to_string()],
                fcm_token: Some("token-3".to_string()),
            },
        );
        store
    }

    #[test]
    fn format_event_date__should_render_human_readable_date() {
        assert_eq!(
            format_event_date(Some(datetime!(2026-03-14 19:30 UTC))),
            "Saturday, March 14, 2026 at 7:30 PM UTC"
        );
    }

    #[test]
    fn format_event_date__should_fall_back_when_date_missing() {
        assert_eq!(format_event_date(None), "an upcoming date");
    }

    #[test]
    fn plan_create__should_announce_on_new_events_topic() {
        // When
        let plan = plan_create("E1", &jazz_night());

        // Then
        assert_eq!(plan.len(), 2);
        let Intent::Topic { topic, content } = &plan[0] else {
            panic!("expected topic push, got {:?}", plan[0]);
        };
        assert_eq!(topic, NEW_EVENTS_TOPIC);
        assert_eq!(content.notification.title, "New Event: Jazz Night");
        assert_eq!(
            content.notification.body,
            "Jazz Night is happening on Saturday, March 14, 2026 at 7:30 PM UTC. Don't miss it!"
        );
        assert!(matches!(
            &plan[1],
            Intent::PersistGlobal(record) if record.kind == NotificationKind::NewEvent
        ));
    }

    #[test]
    fn details_changed__should_ignore_other_fields() {
        // Given
        let before = jazz_night();
        let mut after = jazz_night();
        after.waitlist = vec!["u9".to_string()];
        after.ratings.insert("u1".to_string(), serde_json::json!(4));

        // Then
        assert!(!details_changed(&before, &after));
    }

    #[test]
    fn details_changed__should_ignore_sub_second_date_changes() {
        // Given
        let before = jazz_night();
        let mut after = jazz_night();
        after.date = Some(datetime!(2026-03-14 19:30:00.5 UTC));

        // Then
        assert!(!details_changed(&before, &after));
    }

    #[test]
    fn details_changed__should_detect_name_date_or_location() {
        let before = jazz_night();

        let mut renamed = jazz_night();
        renamed.name = Some("Blues Night".to_string());
        assert!(details_changed(&before, &renamed));

        let mut moved = jazz_night();
        moved.location = Some("Annex".to_string());
        assert!(details_changed(&before, &moved));

        let mut rescheduled = jazz_night();
        rescheduled.date = Some(datetime!(2026-03-14 20:30 UTC));
        assert!(details_changed(&before, &rescheduled));
    }

    #[tokio::test]
    async fn on_create__should_push_topic_and_write_global_record() {
        // Given
        let store = MemoryStore::default();
        let sender = TestSender::default();
        let dispatcher = Dispatcher::new(store.clone(), sender.clone());

        // When
        let outcome = on_create(&dispatcher, "E1", &jazz_night())
            .await
            .expect("handle create");

        // Then
        assert_eq!(
            outcome,
            HandlerOutcome::Completed {
                pushes: 1,
                writes: 1
            }
        );
        assert_eq!(
            sender.sent()[0].target,
            PushTarget::Topic("newEvents".to_string())
        );
        let records = store.notifications(&NotificationTarget::Global);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_id, "E1");
    }

    #[tokio::test]
    async fn on_update__should_do_nothing_when_only_waitlist_changed() {
        // Given
        let store = store_with_attendees();
        let sender = TestSender::default();
        let dispatcher = Dispatcher::new(store.clone(), sender.clone());
        let before = jazz_night();
        let mut after = jazz_night();
        after.waitlist = vec!["u7".to_string()];

        // When
        let outcome = on_update(&dispatcher, "E1", &before, &after)
            .await
            .expect("handle update");

        // Then
        assert_eq!(outcome, HandlerOutcome::skipped("event details unchanged"));
        assert!(sender.sent().is_empty());
        assert_eq!(store.notification_count(), 0);
    }

    #[tokio::test]
    async fn on_update__should_push_once_and_write_one_record_per_attendee() {
        // Given
        let store = store_with_attendees();
        let sender = TestSender::default();
        let dispatcher = Dispatcher::new(store.clone(), sender.clone());
        let before = jazz_night();
        let mut after = jazz_night();
        after.date = Some(datetime!(2026-03-15 19:30 UTC));

        // When
        let outcome = on_update(&dispatcher, "E1", &before, &after)
            .await
            .expect("handle update");

        // Then
        assert_eq!(
            outcome,
            HandlerOutcome::Completed {
                pushes: 1,
                writes: 2
            }
        );
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, PushTarget::Topic("event_E1".to_string()));
        for user_id in ["u1", "u2"] {
            let records = store.notifications(&NotificationTarget::User(user_id.to_string()));
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].kind, NotificationKind::EventUpdate);
        }
        assert!(
            store
                .notifications(&NotificationTarget::User("u3".to_string()))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn on_delete__should_notify_attendees_even_when_push_fails() {
        // Given
        let store = store_with_attendees();
        let sender = TestSender::failing("UNAVAILABLE");
        let dispatcher = Dispatcher::new(store.clone(), sender);

        // When
        let outcome = on_delete(&dispatcher, "E2", &jazz_night())
            .await
            .expect("handle delete");

        // Then
        assert_eq!(
            outcome,
            HandlerOutcome::Failed {
                error: "UNAVAILABLE".to_string(),
                pushes: 0,
                writes: 2
            }
        );
        let records = store.notifications(&NotificationTarget::User("u3".to_string()));
        assert_eq!(records[0].kind, NotificationKind::EventCancellation);
        assert_eq!(records[0].body, "'Jazz Night' has been cancelled.");
    }
}
