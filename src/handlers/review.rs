use crate::dispatch::{Dispatcher, Intent};
use crate::error::StoreError;
use crate::handlers::HandlerOutcome;
use crate::ports::{DocumentStore, PushSender};
use crate::types::{Content, Event, NotificationKind, User};

/// A review counts as added when the ratings map grew. Edits to existing
/// ratings keep the size and are not reported.
pub fn review_added(before: &Event, after: &Event) -> bool {
    after.ratings.len() > before.ratings.len()
}

pub fn plan_review(event_id: &str, event: &Event, creator_id: &str, creator: &User) -> Vec<Intent> {
    let content = Content::new(
        event_id,
        "New Review",
        format!("Your event '{}' received a new review.", event.display_name()),
    );
    let mut plan = vec![Intent::PersistUser {
        user_id: creator_id.to_string(),
        record: content.record(NotificationKind::Review),
    }];
    if let Some(token) = creator.push_token() {
        plan.push(Intent::Token {
            token: token.to_string(),
            content,
        });
    }
    plan
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
    if !review_added(before, after) {
        return Ok(HandlerOutcome::skipped("no new review"));
    }
    let Some(creator_id) = after.creator() else {
        tracing::debug!(event_id = %event_id, "reviewed event has no creator");
        return Ok(HandlerOutcome::skipped("event has no creator"));
    };
    let Some(creator) = dispatcher.store().user(creator_id).await? else {
        tracing::debug!(event_id = %event_id, creator_id = %creator_id, "event creator not found");
        return Ok(HandlerOutcome::skipped("event creator not found"));
    };

    tracing::info!(event_id = %event_id, creator_id = %creator_id, "notifying creator of new review");
    let report = dispatcher
        .execute(plan_review(event_id, after, creator_id, &creator))
        .await?;
    Ok(report.into())
}
