pub mod adapters;
mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod reminders;
pub mod state;
pub mod triggers;
pub mod types;

pub use app::app;

use crate::adapters::{FcmSender, FirestoreStore, LogSender, MemoryStore, TokioTimeProvider};
use crate::config::{AppConfig, Backend};
use crate::error::ServeError;
use crate::ports::{DocumentStore, PushSender};
use crate::reminders::ReminderScheduler;
use crate::state::AppState;

pub async fn serve(config: AppConfig) -> Result<(), ServeError> {
    match &config.backend {
        Backend::InMemory => {
            tracing::warn!("running against the in-memory store; pushes are only logged");
            run(&config, MemoryStore::default(), LogSender).await
        }
        Backend::Google(google) => {
            let store = FirestoreStore::new(google)?;
            let sender = FcmSender::new(google)?;
            tracing::info!(project_id = %google.project_id, "using Firestore and FCM");
            run(&config, store, sender).await
        }
    }
}

async fn run<S, P>(config: &AppConfig, store: S, sender: P) -> Result<(), ServeError>
where
    S: DocumentStore,
    P: PushSender,
{
    let state = AppState::new(store, sender);
    let _reminder_loop = match config.reminder_interval {
        Some(interval) => {
            tracing::info!(interval_secs = interval.as_secs(), "starting reminder loop");
            Some(ReminderScheduler::new(TokioTimeProvider, state.reminders.clone(), interval).spawn())
        }
        None => {
            tracing::info!("reminder loop disabled");
            None
        }
    };

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.listen,
            source,
        })?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, app(state))
        .await
        .map_err(ServeError::Server)
}
