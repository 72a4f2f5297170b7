//! Configuration for tracing initialization (spec §10.1).

use serde::{Deserialize, Serialize};

/// Span sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SamplingStrategy {
    #[default]
    Always,
    Never,
    Probabilistic(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub service_name: String,
    /// OTLP collector endpoint; only consulted when the `otel` feature
    /// is enabled.
    pub otlp_endpoint: Option<String>,
    pub sampling: SamplingStrategy,
    /// Port `hydra-cli serve-api` binds the Prometheus metrics registry to.
    pub metrics_port: Option<u16>,
}

impl TracingConfig {
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            otlp_endpoint: None,
            sampling: SamplingStrategy::Always,
            metrics_port: None,
        }
    }

    #[must_use]
    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_sampling_rate(mut self, rate: f64) -> Self {
        self.sampling = if rate >= 1.0 {
            SamplingStrategy::Always
        } else if rate <= 0.0 {
            SamplingStrategy::Never
        } else {
            SamplingStrategy::Probabilistic(rate)
        };
        self
    }

    #[must_use]
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new("hydra")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_always_sampling() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "hydra");
        assert_eq!(config.sampling, SamplingStrategy::Always);
    }

    #[test]
    fn sampling_rate_is_clamped_into_strategy() {
        assert_eq!(TracingConfig::new("x").with_sampling_rate(1.5).sampling, SamplingStrategy::Always);
        assert_eq!(TracingConfig::new("x").with_sampling_rate(-0.5).sampling, SamplingStrategy::Never);
        assert_eq!(
            TracingConfig::new("x").with_sampling_rate(0.25).sampling,
            SamplingStrategy::Probabilistic(0.25)
        );
    }
}
