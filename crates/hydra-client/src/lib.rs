//! Backend Client (spec §4.1): a thin per-node wrapper over the local
//! inference HTTP API (spec §6 "Backend HTTP API"). No in-process retry —
//! that is the Pool Facade's job (`hydra-pool`) — and cancellation
//! propagates straight through to the underlying HTTP request by virtue
//! of dropping the future.

use std::pin::Pin;
use std::time::Instant;

use futures::{Stream, StreamExt};
use hydra_core::request::GenerationOptions;
use hydra_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single streamed frame from `POST /api/generate` with `stream: true`:
/// newline-delimited JSON, each line `{response, done}` (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub text: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_p: f64,
    repeat_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<i64>,
}

impl From<&GenerationOptions> for OllamaOptions {
    fn from(opts: &GenerationOptions) -> Self {
        Self {
            temperature: opts.temperature,
            top_p: opts.top_p,
            repeat_penalty: opts.repeat_penalty,
            num_predict: opts.max_tokens,
            keep_alive: opts.keep_alive,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequestBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponseBody {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponseBody {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PsResponseBody {
    #[serde(default)]
    models: Vec<PsEntry>,
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    name: String,
}

/// Thin wrapper over one node's inference HTTP API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// `generate(model, prompt, options, stream=false)`. Model generation
    /// is untimed by policy (spec §5): no timeout is applied here.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome> {
        let started = Instant::now();
        let body = GenerateRequestBody {
            model,
            prompt,
            stream: false,
            options: OllamaOptions::from(options),
        };
        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;
        let resp = resp.error_for_status().map_err(Error::from)?;
        let parsed: GenerateResponseBody = resp.json().await?;
        Ok(GenerateOutcome {
            text: parsed.response,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// `generate_stream(model, prompt, options)`: yields each NDJSON
    /// frame as soon as it arrives, never buffering more than the current
    /// partial line (spec §4.1).
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<GenerateChunk>> + Send>>> {
        let body = GenerateRequestBody {
            model,
            prompt,
            stream: true,
            options: OllamaOptions::from(options),
        };
        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;
        let resp = resp.error_for_status().map_err(Error::from)?;

        let s = async_stream::stream! {
            let mut bytes_stream = resp.bytes_stream();
            let mut buffer = String::new();
            while let Some(next) = bytes_stream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(Error::from(e));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].to_string();
                    buffer.drain(..=pos);
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GenerateChunk>(&line) {
                        Ok(chunk) => {
                            let done = chunk.done;
                            yield Ok(chunk);
                            if done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(Error::parse(e.to_string()));
                            return;
                        }
                    }
                }
            }
            if !buffer.trim().is_empty() {
                if let Ok(chunk) = serde_json::from_str::<GenerateChunk>(buffer.trim()) {
                    yield Ok(chunk);
                }
            }
        };
        Ok(Box::pin(s))
    }

    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let body = EmbedRequestBody { model, input };
        let resp = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await?;
        let resp = resp.error_for_status().map_err(Error::from)?;
        let parsed: EmbedResponseBody = resp.json().await?;
        parsed
            .embeddings
            .into_iter()
            .next()
            .or(parsed.embedding)
            .ok_or_else(|| Error::parse("embed response contained no vector"))
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        let resp = resp.error_for_status().map_err(Error::from)?;
        let parsed: TagsResponseBody = resp.json().await?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn list_loaded(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(format!("{}/api/ps", self.base_url))
            .send()
            .await?;
        let resp = resp.error_for_status().map_err(Error::from)?;
        let parsed: PsResponseBody = resp.json().await?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Cheap liveness probe, no model load (spec §4.1, used by the Health
    /// Monitor).
    pub async fn health(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_parses_non_streaming_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "hello world",
                "done": true
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let outcome = client
            .generate("llama3.2:3b", "hi", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.text, "hello world");
    }

    #[tokio::test]
    async fn generate_stream_yields_each_ndjson_frame() {
        let server = MockServer::start().await;
        let body = "{\"response\":\"a\",\"done\":false}\n{\"response\":\"b\",\"done\":true}\n";
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let mut stream = client
            .generate_stream("llama3.2:3b", "hi", &GenerationOptions::default())
            .await
            .unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].response, "a");
        assert!(!chunks[0].done);
        assert_eq!(chunks[1].response, "b");
        assert!(chunks[1].done);
    }

    #[tokio::test]
    async fn health_returns_false_on_connection_error() {
        let client = BackendClient::new("http://127.0.0.1:1");
        assert!(!client.health().await);
    }

    #[tokio::test]
    async fn list_models_parses_tags_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3.2:3b"}, {"name": "qwen2.5-coder:7b"}]
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:3b", "qwen2.5-coder:7b"]);
    }
}
