use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::metrics::{COMPLETION_FAILURES, COMPLETION_LATENCY};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct";

// Marker prefix for failed completions on the wire
pub const ERROR_PREFIX: &str = "[ERROR]";

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("OPENROUTER_API_KEY not set.")]
    MissingApiKey,
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Malformed(String),
}

// Outcome of one completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Reply(String),
    Failed(CompletionError),
}

impl Completion {
    // reply text, or the [ERROR] marker line for a failure
    pub fn text(&self) -> String {
        match self {
            Completion::Reply(text) => text.clone(),
            Completion::Failed(err) => format!("{ERROR_PREFIX} {err}"),
        }
    }
}

// Anything that can turn a prompt into a completion
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Completion;
}

// OpenAI-style chat completions client (OpenRouter by default)
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            // an empty key is as good as none
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("no choices[0].message.content".to_string()))
    }
}

#[async_trait]
impl Completer for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Completion {
        let Some(api_key) = self.api_key.as_deref() else {
            COMPLETION_FAILURES.inc();
            return Completion::Failed(CompletionError::MissingApiKey);
        };

        let start_time = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.send(api_key, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.timeout.as_secs())),
        };
        COMPLETION_LATENCY.observe(start_time.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                tracing::info!(model = %self.model, prompt = %prompt, "completion received");
                Completion::Reply(reply)
            }
            Err(err) => {
                COMPLETION_FAILURES.inc();
                tracing::warn!(model = %self.model, prompt = %prompt, error = %err, "completion failed");
                Completion::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};

    // Serve `app` on an ephemeral local port and return its completions URL
    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1/chat/completions")
    }

    fn client(url: &str, key: Option<&str>, timeout: Duration) -> OpenRouterClient {
        OpenRouterClient::new(
            reqwest::Client::new(),
            url,
            DEFAULT_MODEL,
            key.map(str::to_string),
            timeout,
        )
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        let c = client("http://127.0.0.1:9/unused", None, Duration::from_secs(1));
        let out = c.complete("A").await;
        assert_eq!(out, Completion::Failed(CompletionError::MissingApiKey));
        assert!(out.text().starts_with("[ERROR]"));

        let blank = client("http://127.0.0.1:9/unused", Some("  "), Duration::from_secs(1));
        assert!(!blank.has_api_key());
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let app = Router::new().route(
            "/api/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], DEFAULT_MODEL);
                assert_eq!(body["messages"][0]["role"], "user");
                let prompt = body["messages"][0]["content"].as_str().unwrap().to_string();
                Json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": format!("echo {prompt}") } }]
                }))
            }),
        );
        let url = spawn_upstream(app).await;

        let out = client(&url, Some("sk-test"), Duration::from_secs(5))
            .complete("HELLO")
            .await;
        assert_eq!(out, Completion::Reply("echo HELLO".to_string()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure() {
        let app = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let url = spawn_upstream(app).await;

        let out = client(&url, Some("sk-test"), Duration::from_secs(5))
            .complete("A")
            .await;
        assert_eq!(
            out,
            Completion::Failed(CompletionError::Status {
                status: 401,
                body: "bad key".to_string()
            })
        );
        assert_eq!(out.text(), "[ERROR] upstream returned 401: bad key");
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let app = Router::new()
            .route("/api/v1/chat/completions", post(|| async { "not json" }))
            .route(
                "/empty",
                post(|| async { Json(serde_json::json!({ "choices": [] })) }),
            );
        let url = spawn_upstream(app).await;

        let out = client(&url, Some("k"), Duration::from_secs(5)).complete("A").await;
        assert!(matches!(out, Completion::Failed(CompletionError::Malformed(_))));

        let empty_url = url.replace("/api/v1/chat/completions", "/empty");
        let out = client(&empty_url, Some("k"), Duration::from_secs(5))
            .complete("A")
            .await;
        assert!(matches!(out, Completion::Failed(CompletionError::Malformed(_))));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let url = spawn_upstream(app).await;

        let out = client(&url, Some("k"), Duration::from_millis(200))
            .complete("A")
            .await;
        assert!(matches!(out, Completion::Failed(CompletionError::Timeout(_))));
        assert!(out.text().starts_with("[ERROR]"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let out = client(&format!("http://{addr}/x"), Some("k"), Duration::from_secs(5))
            .complete("A")
            .await;
        assert!(matches!(out, Completion::Failed(CompletionError::Transport(_))));
    }
}
