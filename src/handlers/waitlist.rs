//! Promotes the head of an event's waitlist when a booking is cancelled.
//!
//! The promoted user is only notified here; removing them from the waitlist
//! happens elsewhere. Two cancellations for the same event processed at the
//! same time can therefore both pick the same head.

use std::collections::HashSet;

use futures::future::join_all;

use crate::dispatch::{Dispatcher, Intent};
use crate::error::StoreError;
use crate::handlers::HandlerOutcome;
use crate::ports::{DocumentStore, PushSender};
use crate::types::{Content, Event, NotificationKind, User};

/// Event ids booked before but not after, in the order they were booked.
pub fn cancelled_events(before: &User, after: &User) -> Vec<String> {
    let kept: HashSet<&str> = after.booked_events.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    before
        .booked_events
        .iter()
        .filter(|id| !kept.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

pub fn plan_promotion(
    event_id: &str,
    event: &Event,
    promoted_id: &str,
    promoted: Option<&User>,
) -> Vec<Intent> {
    let content = Content::new(
        event_id,
        "A Spot Opened Up",
        format!(
            "A spot is now available for '{}'. Register now before it fills up!",
            event.display_name()
        ),
    );
    let mut plan = vec![Intent::PersistUser {
        user_id: promoted_id.to_string(),
        record: content.record(NotificationKind::WaitlistAlert),
    }];
    if let Some(token) = promoted.and_then(User::push_token) {
        plan.push(Intent::Token {
            token: token.to_string(),
            content,
        });
    }
    plan
}

async fn promote<S, P>(
    dispatcher: &Dispatcher<S, P>,
    event_id: &str,
) -> Result<HandlerOutcome, StoreError>
where
    S: DocumentStore,
    P: PushSender,
{
    let Some(event) = dispatcher.store().event(event_id).await? else {
        tracing::debug!(event_id = %event_id, "cancelled event not found");
        return Ok(HandlerOutcome::skipped("event not found"));
    };
    let Some(promoted_id) = event.waitlist_head() else {
        return Ok(HandlerOutcome::skipped("waitlist empty"));
    };
    let promoted = dispatcher.store().user(promoted_id).await?;

    tracing::info!(event_id = %event_id, user_id = %promoted_id, "offering freed spot to waitlist head");
    let plan = plan_promotion(event_id, &event, promoted_id, promoted.as_ref());
    Ok(dispatcher.execute(plan).await?.into())
}

/// Returns one outcome per cancelled event. All promotions run to completion
/// before the first store error, if any, is returned.
pub async fn on_update<S, P>(
    dispatcher: &Dispatcher<S, P>,
    user_id: &str,
    before: &User,
    after: &User,
) -> Result<Vec<HandlerOutcome>, StoreError>
where
    S: DocumentStore,
    P: PushSender,
{
    let cancelled = cancelled_events(before, after);
    if cancelled.is_empty() {
        return Ok(vec![HandlerOutcome::skipped("no cancelled bookings")]);
    }
    tracing::debug!(user_id = %user_id, cancelled = cancelled.len(), "bookings cancelled");

    let results = join_all(
        cancelled
            .iter()
            .map(|event_id| promote(dispatcher, event_id)),
    )
    .await;

    let mut outcomes = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (event_id, result) in cancelled.iter().zip(results) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                tracing::error!(event_id = %event_id, error = %err, "waitlist promotion failed");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(outcomes),
    }
}
