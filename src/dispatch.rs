use futures::future::join_all;

use crate::error::StoreError;
use crate::ports::{DocumentStore, PushSender};
use crate::types::{
    Content, NotificationRecord, NotificationTarget, NotificationWrite, PushMessage, PushTarget,
    ReminderKind,
};

/// A side effect a handler wants performed.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Topic { topic: String, content: Content },
    Token { token: String, content: Content },
    Users { user_ids: Vec<String>, content: Content },
    PersistGlobal(NotificationRecord),
    PersistUser { user_id: String, record: NotificationRecord },
    /// One record per user who booked the event, written as one batch.
    PersistBooked { event_id: String, record: NotificationRecord },
    MarkReminder { event_id: String, kind: ReminderKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    NoRecipients,
    Failed { code: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub pushes: usize,
    pub writes: usize,
    /// Code of the first push failure, if any.
    pub failure: Option<String>,
}

impl DispatchReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Sent => self.pushes += 1,
            Delivery::NoRecipients => {}
            Delivery::Failed { code } => {
                self.failure.get_or_insert(code);
            }
        }
    }

    pub fn merge(&mut self, other: DispatchReport) {
        self.pushes += other.pushes;
        self.writes += other.writes;
        if self.failure.is_none() {
            self.failure = other.failure;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pushes == 0 && self.writes == 0 && self.failure.is_none()
    }
}

/// Sends pushes and persists notification records.
#[derive(Debug, Clone)]
pub struct Dispatcher<S, P> {
    store: S,
    sender: P,
}

impl<S, P> Dispatcher<S, P>
where
    S: DocumentStore,
    P: PushSender,
{
    pub fn new(store: S, sender: P) -> Self {
        Self { store, sender }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolves each user to a push token and sends one message to all of
    /// them. Users without a token, or whose lookup fails, are skipped.
    pub async fn send_to_users(&self, user_ids: &[String], content: &Content) -> Delivery {
        let lookups = join_all(user_ids.iter().map(|user_id| self.store.user(user_id))).await;
        let mut tokens = Vec::new();
        for (user_id, lookup) in user_ids.iter().zip(lookups) {
            match lookup {
                Ok(Some(user)) => match user.push_token() {
                    Some(token) => tokens.push(token.to_string()),
                    None => tracing::debug!(user_id = %user_id, "recipient has no push token"),
                },
                Ok(None) => tracing::debug!(user_id = %user_id, "recipient not found"),
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "recipient lookup failed")
                }
            }
        }

        if tokens.is_empty() {
            tracing::debug!(event_id = %content.data.event_id, "no push tokens resolved");
            return Delivery::NoRecipients;
        }
        self.deliver(PushMessage::new(PushTarget::Tokens(tokens), content.clone()))
            .await
    }

    pub async fn send_to_topic(&self, topic: &str, content: &Content) -> Delivery {
        self.deliver(PushMessage::new(
            PushTarget::Topic(topic.to_string()),
            content.clone(),
        ))
        .await
    }

    pub async fn send_to_token(&self, token: &str, content: &Content) -> Delivery {
        self.deliver(PushMessage::new(
            PushTarget::Token(token.to_string()),
            content.clone(),
        ))
        .await
    }

    async fn deliver(&self, message: PushMessage) -> Delivery {
        match self.sender.send(&message).await {
            Ok(()) => Delivery::Sent,
            Err(err) => {
                tracing::warn!(
                    code = err.code_or_unknown(),
                    event_id = %message.content.data.event_id,
                    error = %err,
                    "push delivery failed"
                );
                Delivery::Failed {
                    code: err.code_or_unknown().to_string(),
                }
            }
        }
    }

    /// Writes all records atomically; returns the number written.
    pub async fn persist(&self, writes: Vec<NotificationWrite>) -> Result<usize, StoreError> {
        let count = writes.len();
        if count == 0 {
            return Ok(0);
        }
        self.store.commit_notifications(writes).await?;
        Ok(count)
    }

    /// Runs a plan in order. Push failures are recorded and the remaining
    /// intents still run; store failures stop the plan.
    pub async fn execute(&self, plan: Vec<Intent>) -> Result<DispatchReport, StoreError> {
        let mut report = DispatchReport::default();
        for intent in plan {
            match intent {
                Intent::Topic { topic, content } => {
                    report.record(self.send_to_topic(&topic, &content).await);
                }
                Intent::Token { token, content } => {
                    report.record(self.send_to_token(&token, &content).await);
                }
                Intent::Users { user_ids, content } => {
                    report.record(self.send_to_users(&user_ids, &content).await);
                }
                Intent::PersistGlobal(record) => {
                    report.writes += self
                        .persist(vec![NotificationWrite {
                            target: NotificationTarget::Global,
                            record,
                        }])
                        .await?;
                }
                Intent::PersistUser { user_id, record } => {
                    report.writes += self
                        .persist(vec![NotificationWrite {
                            target: NotificationTarget::User(user_id),
                            record,
                        }])
                        .await?;
                }
                Intent::PersistBooked { event_id, record } => {
                    let users = self.store.users_booked_for(&event_id).await?;
                    let writes = users
                        .into_iter()
                        .map(|user| NotificationWrite {
                            target: NotificationTarget::User(user.id),
                            record: record.clone(),
                        })
                        .collect();
                    report.writes += self.persist(writes).await?;
                }
                Intent::MarkReminder { event_id, kind } => {
                    self.store.mark_reminder(&event_id, kind).await?;
                    report.writes += 1;
                }
            }
        }
        Ok(report)
    }
}
