use std::time::Duration;

use time::OffsetDateTime;

use crate::error::PushError;
use crate::ports;
use crate::types::{PushMessage, PushTarget};

mod fcm;
mod firestore;
mod memory;

pub use fcm::FcmSender;
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// Push sender that only logs, for running without a messaging provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl ports::PushSender for LogSender {
    type Fut<'a>
        = std::future::Ready<Result<(), PushError>>
    where
        Self: 'a;

    fn send<'a>(&'a self, message: &'a PushMessage) -> Self::Fut<'a> {
        let recipient = match &message.target {
            PushTarget::Token(_) => "token".to_string(),
            PushTarget::Tokens(tokens) => format!("{} tokens", tokens.len()),
            PushTarget::Topic(topic) => format!("topic {topic}"),
        };
        tracing::info!(
            recipient = %recipient,
            event_id = %message.content.data.event_id,
            title = %message.content.notification.title,
            "push (not delivered)"
        );
        std::future::ready(Ok(()))
    }
}
