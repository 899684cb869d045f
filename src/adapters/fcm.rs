use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::PushError;
use crate::ports;
use crate::types::{PushMessage, PushTarget};

/// Firebase Cloud Messaging over the HTTP v1 API.
#[derive(Clone)]
pub struct FcmSender {
    client: reqwest::Client,
    send_url: String,
    access_token: Arc<str>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a PushMessage,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: String,
}

impl FcmSender {
    pub fn new(config: &GoogleConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                config.fcm_endpoint.trim_end_matches('/'),
                config.project_id
            ),
            access_token: Arc::from(config.access_token.as_str()),
        })
    }

    async fn send_one(&self, message: &PushMessage) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&*self.access_token)
            .json(&SendRequest { message })
            .send()
            .await
            .map_err(|err| PushError::new(None, err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status.as_u16(), &body))
    }
}

fn provider_error(status: u16, body: &str) -> PushError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => PushError::new(parsed.error.status, parsed.error.message),
        Err(_) => PushError::new(None, format!("provider returned {status}")),
    }
}

/// A multicast fails only when no recipient received it. Failures of
/// individual tokens are logged.
fn multicast_result(results: Vec<Result<(), PushError>>) -> Result<(), PushError> {
    let mut delivered = false;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(()) => delivered = true,
            Err(err) => {
                tracing::warn!(code = err.code_or_unknown(), "multicast recipient failed");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if !delivered => Err(err),
        _ => Ok(()),
    }
}

impl ports::PushSender for FcmSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, message: &'a PushMessage) -> Self::Fut<'a> {
        Box::pin(async move {
            let tokens = match &message.target {
                PushTarget::Tokens(tokens) => tokens,
                PushTarget::Token(_) | PushTarget::Topic(_) => return self.send_one(message).await,
            };

            // The v1 API takes one recipient per request.
            let singles: Vec<PushMessage> = tokens
                .iter()
                .map(|token| {
                    PushMessage::new(PushTarget::Token(token.clone()), message.content.clone())
                })
                .collect();
            let results = join_all(singles.iter().map(|single| self.send_one(single))).await;
            multicast_result(results)
        })
    }
}
