//! Error taxonomy shared across all Hydra crates.
//!
//! Every surfaced error carries a `kind`, a `message`, and a structured
//! [`ErrorContext`] (offending node, request id) per the error handling
//! design: recovery policy is a function of `kind`, not of the specific
//! variant payload, so callers match on [`Error::kind`].

use std::fmt;

use uuid::Uuid;

/// Result type used throughout the Hydra workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error taxonomy. Recovery policy is attached to the kind, not the
/// variant: see the module documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network / timeout / 5xx. Retried on another node up to `max_attempts`.
    Transport,
    /// All candidate nodes exhausted or none healthy. Not retried.
    NoHealthyNodes,
    /// OOM / insufficient VRAM. Triggers a fallback to a smaller model.
    ResourceExhausted,
    /// Requested model is not present on any candidate node.
    ModelNotFound,
    /// Malformed JSON from a planning/analysis/decomposition model.
    Parse,
    /// A tool invocation was refused by the approval tracker.
    PermissionDenied,
    /// The caller cancelled the operation.
    Cancelled,
    /// Fatal misconfiguration, surfaced at startup.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::NoHealthyNodes => "no_healthy_nodes",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(s)
    }
}

/// Structured context attached to every [`Error`]: the offending node (if
/// any) and the request id, so logs and API responses can correlate a
/// failure back to a specific routing decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub node_id: Option<String>,
    pub request_id: Option<Uuid>,
    pub message: String,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            node_id: None,
            request_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    #[must_use]
    pub fn with_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// The error type returned by every Hydra operation.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{kind}: {}", context.message)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: ErrorContext,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, context: ErrorContext) -> Self {
        Self { kind, context }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, ErrorContext::new(message))
    }

    pub fn no_healthy_nodes(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoHealthyNodes, ErrorContext::new(message))
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, ErrorContext::new(message))
    }

    pub fn model_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelNotFound, ErrorContext::new(message))
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, ErrorContext::new(message))
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, ErrorContext::new(message))
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, ErrorContext::new(message))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, ErrorContext::new(message))
    }

    /// Whether a transport-layer retry on a different node is warranted.
    /// Mirrors the taxonomy's recovery policy: only `Transport` is
    /// unconditionally retryable here; `ResourceExhausted` retries via an
    /// explicit model fallback instead (see `hydra-pool`).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    #[must_use]
    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.context.node_id = Some(node_id.into());
        self
    }

    #[must_use]
    pub fn with_request(mut self, request_id: Uuid) -> Self {
        self.context.request_id = Some(request_id);
        self
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status.is_client_error() {
                return if status.as_u16() == 404 {
                    Error::model_not_found(err.to_string())
                } else {
                    Error::configuration(err.to_string())
                };
            }
        }
        Error::transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::parse(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::transport("connection refused").with_node("node-a");
        assert_eq!(err.to_string(), "transport: connection refused");
        assert_eq!(err.context.node_id.as_deref(), Some("node-a"));
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(Error::transport("x").is_retryable());
        assert!(!Error::no_healthy_nodes("x").is_retryable());
        assert!(!Error::resource_exhausted("x").is_retryable());
        assert!(!Error::cancelled("x").is_retryable());
    }

    #[tokio::test]
    async fn reqwest_404_maps_to_non_retryable_model_not_found() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let reqwest_err = resp.error_for_status().unwrap_err();
        let err = Error::from(reqwest_err);

        assert_eq!(err.kind(), ErrorKind::ModelNotFound);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn reqwest_other_4xx_maps_to_non_retryable_configuration() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(400)).mount(&server).await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let reqwest_err = resp.error_for_status().unwrap_err();
        let err = Error::from(reqwest_err);

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn reqwest_5xx_maps_to_retryable_transport() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let reqwest_err = resp.error_for_status().unwrap_err();
        let err = Error::from(reqwest_err);

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn kind_round_trips_through_display() {
        for kind in [
            ErrorKind::Transport,
            ErrorKind::NoHealthyNodes,
            ErrorKind::ResourceExhausted,
            ErrorKind::ModelNotFound,
            ErrorKind::Parse,
            ErrorKind::PermissionDenied,
            ErrorKind::Cancelled,
            ErrorKind::Configuration,
        ] {
            assert!(!kind.to_string().is_empty());
        }
    }
}
