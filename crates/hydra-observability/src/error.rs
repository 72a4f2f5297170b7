//! Error type for observability operations.

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to initialize tracing: {0}")]
    Initialization(String),

    #[error("failed to connect to exporter endpoint: {0}")]
    ExporterConnection(String),

    #[error("metrics operation failed: {0}")]
    Metrics(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_displays_message() {
        let err = Error::Initialization("already set".to_string());
        assert_eq!(err.to_string(), "failed to initialize tracing: already set");
    }
}
