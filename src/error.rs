#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store returned {status} for {path}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
}

impl StoreError {
    pub fn decode(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Delivery failure reported by the push provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("push delivery failed ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
pub struct PushError {
    pub code: Option<String>,
    pub message: String,
}

impl PushError {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_or_unknown(&self) -> &str {
        self.code.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(std::io::Error),
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn push_error__should_fall_back_to_unknown_code() {
        // Given
        let err = PushError::new(None, "connection reset");

        // Then
        assert_eq!(err.code_or_unknown(), "unknown");
        assert_eq!(
            err.to_string(),
            "push delivery failed (unknown): connection reset"
        );
    }
}
