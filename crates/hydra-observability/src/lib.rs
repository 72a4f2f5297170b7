//! Ambient logging/tracing and metrics (spec §10.1). Grounded on
//! `dashflow-observability`; trimmed to what `hydra-cli` needs: a
//! tracing-subscriber initializer and a Prometheus `/metrics` route.

pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod metrics_server;

pub use config::{SamplingStrategy, TracingConfig};
pub use error::{Error, Result};
pub use exporter::init_tracing;
