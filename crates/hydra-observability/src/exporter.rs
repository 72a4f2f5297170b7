//! Tracing subscriber initialization (spec §10.1). Grounded on
//! `dashflow-observability/src/exporter.rs`; trimmed to a single W3C
//! trace-context propagator and an optional OTLP layer.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TracingConfig;
use crate::error::{Error, Result};

/// Installs an `EnvFilter`-driven `tracing-subscriber` registry with a
/// `fmt` layer, and, when the `otel` feature is enabled and
/// `config.otlp_endpoint` is set, an OpenTelemetry span-export layer.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(feature = "otel")]
    if let Some(endpoint) = &config.otlp_endpoint {
        let tracer = otel::build_tracer(&config.service_name, endpoint, config.sampling)?;
        return tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| Error::Initialization(e.to_string()));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Initialization(e.to_string()))
}

#[cfg(feature = "otel")]
mod otel {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::{global, KeyValue};
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider, Tracer};
    use opentelemetry_sdk::Resource;

    use crate::config::SamplingStrategy;
    use crate::error::{Error, Result};

    pub fn build_tracer(service_name: &str, endpoint: &str, sampling: SamplingStrategy) -> Result<Tracer> {
        let resource =
            Resource::builder_empty().with_attributes(vec![KeyValue::new("service.name", service_name.to_string())]).build();

        let sampler = match sampling {
            SamplingStrategy::Always => Sampler::AlwaysOn,
            SamplingStrategy::Never => Sampler::AlwaysOff,
            SamplingStrategy::Probabilistic(rate) => Sampler::TraceIdRatioBased(rate),
        };

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| Error::ExporterConnection(e.to_string()))?;

        let provider =
            SdkTracerProvider::builder().with_resource(resource).with_sampler(sampler).with_batch_exporter(exporter).build();

        global::set_text_map_propagator(TraceContextPropagator::new());
        let tracer = provider.tracer("hydra");
        global::set_tracer_provider(provider);
        Ok(tracer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_without_otlp_endpoint_does_not_panic() {
        let config = TracingConfig::new("test-service");
        let _ = init_tracing(&config);
    }
}
