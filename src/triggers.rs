//! Document-change handlers, registered per collection.

use std::pin::Pin;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::dispatch::Dispatcher;
use crate::error::StoreError;
use crate::handlers::{HandlerOutcome, lifecycle, review, waitlist};
use crate::ports::{DocumentStore, PushSender};
use crate::types::{Event, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(ChangeKind::Created),
            "updated" => Some(ChangeKind::Updated),
            "deleted" => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Created { after: T },
    Updated { before: T, after: T },
    Deleted { before: T },
}

/// Wire form of a change notification.
#[derive(Debug, Deserialize)]
pub struct ChangePayload<T> {
    pub id: String,
    pub before: Option<T>,
    pub after: Option<T>,
}

impl<T> ChangePayload<T> {
    pub fn into_change(self, kind: ChangeKind) -> Result<(String, Change<T>), &'static str> {
        let change = match (kind, self.before, self.after) {
            (ChangeKind::Created, _, Some(after)) => Change::Created { after },
            (ChangeKind::Updated, Some(before), Some(after)) => Change::Updated { before, after },
            (ChangeKind::Deleted, Some(before), _) => Change::Deleted { before },
            (ChangeKind::Created, _, None) => return Err("created change requires `after`"),
            (ChangeKind::Updated, _, _) => {
                return Err("updated change requires `before` and `after`");
            }
            (ChangeKind::Deleted, None, _) => return Err("deleted change requires `before`"),
        };
        Ok((self.id, change))
    }
}

pub trait DocumentChangeHandler: Clone + Send + Sync + 'static {
    type Document: DeserializeOwned + Send + 'static;
    type Fut<'a>: Future<Output = Result<Vec<HandlerOutcome>, StoreError>> + Send + 'a
    where
        Self: 'a;

    fn collection(&self) -> &'static str;

    fn handles(&self, kind: ChangeKind) -> bool;

    fn handle<'a>(&'a self, document_id: &'a str, change: Change<Self::Document>) -> Self::Fut<'a>;
}

/// Handlers for the `News` collection.
#[derive(Debug, Clone)]
pub struct EventTriggers<S, P> {
    dispatcher: Dispatcher<S, P>,
}

impl<S, P> EventTriggers<S, P> {
    pub fn new(dispatcher: Dispatcher<S, P>) -> Self {
        Self { dispatcher }
    }
}

impl<S, P> DocumentChangeHandler for EventTriggers<S, P>
where
    S: DocumentStore,
    P: PushSender,
{
    type Document = Event;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<HandlerOutcome>, StoreError>> + Send + 'a>>
    where
        Self: 'a;

    fn collection(&self) -> &'static str {
        "News"
    }

    fn handles(&self, _kind: ChangeKind) -> bool {
        true
    }

    fn handle<'a>(&'a self, event_id: &'a str, change: Change<Event>) -> Self::Fut<'a> {
        Box::pin(async move {
            let dispatcher = &self.dispatcher;
            match change {
                Change::Created { after } => {
                    Ok(vec![lifecycle::on_create(dispatcher, event_id, &after).await?])
                }
                Change::Updated { before, after } => {
                    let (update, review) = futures::join!(
                        lifecycle::on_update(dispatcher, event_id, &before, &after),
                        review::on_update(dispatcher, event_id, &before, &after),
                    );
                    Ok(vec![update?, review?])
                }
                Change::Deleted { before } => {
                    Ok(vec![lifecycle::on_delete(dispatcher, event_id, &before).await?])
                }
            }
        })
    }
}

/// Handlers for the `users` collection.
#[derive(Debug, Clone)]
pub struct UserTriggers<S, P> {
    dispatcher: Dispatcher<S, P>,
}

impl<S, P> UserTriggers<S, P> {
    pub fn new(dispatcher: Dispatcher<S, P>) -> Self {
        Self { dispatcher }
    }
}

impl<S, P> DocumentChangeHandler for UserTriggers<S, P>
where
    S: DocumentStore,
    P: PushSender,
{
    type Document = User;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<HandlerOutcome>, StoreError>> + Send + 'a>>
    where
        Self: 'a;

    fn collection(&self) -> &'static str {
        "users"
    }

    fn handles(&self, kind: ChangeKind) -> bool {
        kind == ChangeKind::Updated
    }

    fn handle<'a>(&'a self, user_id: &'a str, change: Change<User>) -> Self::Fut<'a> {
        Box::pin(async move {
            match change {
                Change::Updated { before, after } => {
                    waitlist::on_update(&self.dispatcher, user_id, &before, &after).await
                }
                Change::Created { .. } | Change::Deleted { .. } => Ok(Vec::new()),
            }
        })
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::dispatch::testing::TestSender;
    use serde_json::json;

    #[test]
    fn into_change__should_require_snapshots_for_kind() {
        // Given
        let payload: ChangePayload<User> =
            serde_json::from_value(json!({"id": "u1", "after": {}})).expect("decode payload");

        // When
        let result = payload.into_change(ChangeKind::Updated);

        // Then
        assert_eq!(
            result.err(),
            Some("updated change requires `before` and `after`")
        );
    }

    #[test]
    fn change_payload__should_decode_documents_without_default() {
        // Given
        #[derive(Debug, Deserialize, PartialEq)]
        struct Marker {
            sent: bool,
        }

        // When
        let payload: ChangePayload<Marker> =
            serde_json::from_value(json!({"id": "m1", "after": {"sent": true}}))
                .expect("decode payload");

        // Then
        assert!(payload.before.is_none());
        assert_eq!(payload.after, Some(Marker { sent: true }));
    }

    #[test]
    fn into_change__should_build_deleted_change() {
        // Given
        let payload: ChangePayload<Event> =
            serde_json::from_value(json!({"id": "E1", "before": {"Name": "Jazz Night"}}))
                .expect("decode payload");

        // When
        let (id, change) = payload
            .into_change(ChangeKind::Deleted)
            .expect("deleted change");

        // Then
        assert_eq!(id, "E1");
        assert!(matches!(
            change,
            Change::Deleted { before } if before.name.as_deref() == Some("Jazz Night")
        ));
    }

    #[tokio::test]
    async fn event_triggers__should_run_update_and_review_handlers() {
        // Given
        let store = MemoryStore::default();
        store.insert_user("creator", User::default());
        let sender = TestSender::default();
        let triggers = EventTriggers::new(Dispatcher::new(store.clone(), sender.clone()));
        let before = Event {
            name: Some("Jazz Night".to_string()),
            creator_id: Some("creator".to_string()),
            ..Default::default()
        };
        let mut after = before.clone();
        after.ratings.insert("u1".to_string(), json!(5));

        // When
        let outcomes = triggers
            .handle("E1", Change::Updated { before, after })
            .await
            .expect("handle change");

        // Then
        assert_eq!(
            outcomes,
            vec![
                HandlerOutcome::skipped("event details unchanged"),
                HandlerOutcome::Completed {
                    pushes: 0,
                    writes: 1
                },
            ]
        );
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn user_triggers__should_only_handle_updates() {
        // Given
        let triggers = UserTriggers::new(Dispatcher::new(
            MemoryStore::default(),
            TestSender::default(),
        ));

        // Then
        assert_eq!(triggers.collection(), "users");
        assert!(triggers.handles(ChangeKind::Updated));
        assert!(!triggers.handles(ChangeKind::Created));
        assert!(!triggers.handles(ChangeKind::Deleted));
    }
}
