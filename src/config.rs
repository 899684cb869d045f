use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub backend: Backend,
    /// `None` leaves reminder runs to an external caller of `/jobs/reminders`.
    pub reminder_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub enum Backend {
    InMemory,
    Google(GoogleConfig),
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub project_id: String,
    pub access_token: String,
    pub firestore_endpoint: String,
    pub fcm_endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: Backend::InMemory,
            reminder_interval: Some(Duration::from_secs(60 * 60)),
        }
    }
}
