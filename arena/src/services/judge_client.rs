//! Judge backend implementations
//!
//! `AnthropicJudge` talks to the Anthropic Messages API; `ScriptedJudge`
//! is a deterministic offline stand-in for demos and tests. Both return
//! raw reply text; verdict parsing stays in the adapter.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::{ArenaError, ArenaResult};
use crate::traits::JudgeBackend;
use crate::types::{JudgeReply, JudgeRequest};
use shared::{JudgeFailure, SharedError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Judge backend backed by the Anthropic Messages API
pub struct AnthropicJudge {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicJudge {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Read the API key from `ANTHROPIC_API_KEY`
    pub fn from_env() -> ArenaResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ArenaError::InvalidConfig(SharedError::InvalidConfig {
                field: "ANTHROPIC_API_KEY".to_string(),
                value: "<unset>".to_string(),
            })
        })?;
        Ok(Self::new(api_key))
    }

    /// Point the client at a different endpoint (integration tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl JudgeBackend for AnthropicJudge {
    async fn send_comparison(&self, request: JudgeRequest) -> Result<JudgeReply, JudgeFailure> {
        let request_start = Instant::now();

        let request_body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JudgeFailure::Timeout
                } else {
                    JudgeFailure::Network { message: e.to_string() }
                }
            })?;

        let response_time = request_start.elapsed();

        if !response.status().is_success() {
            return match response.status().as_u16() {
                401 | 403 => Err(JudgeFailure::AuthenticationFailed),
                429 => Err(JudgeFailure::RateLimited),
                400 => Err(JudgeFailure::InvalidRequest {
                    message: response.status().to_string(),
                }),
                503 | 529 => Err(JudgeFailure::ServiceUnavailable),
                _ => Err(JudgeFailure::ServerError {
                    status: response.status().to_string(),
                }),
            };
        }

        let response_json: serde_json::Value = response.json().await.map_err(|e| JudgeFailure::InvalidRequest {
            message: format!("failed to parse response body: {e}"),
        })?;

        let content = response_json
            .get("content")
            .and_then(|content| content.get(0))
            .and_then(|item| item.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| JudgeFailure::InvalidRequest {
                message: "no text content in response".to_string(),
            })?;

        let usage = response_json.get("usage");
        let input_tokens = usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);
        let output_tokens = usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);

        Ok(JudgeReply {
            content: content.to_string(),
            model: request.model,
            input_tokens,
            output_tokens,
            response_time,
        })
    }
}

/// Deterministic offline judge: the more developed submission wins, equal
/// word counts tie. Useful for demos and tests without an API key.
pub struct ScriptedJudge {
    latency: Duration,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }

    /// Simulate a slow judge
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JudgeBackend for ScriptedJudge {
    async fn send_comparison(&self, request: JudgeRequest) -> Result<JudgeReply, JudgeFailure> {
        let request_start = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut ranked = request.entries.clone();
        ranked.sort_by(|a, b| {
            b.word_count
                .cmp(&a.word_count)
                .then(a.participant_id.cmp(&b.participant_id))
        });

        let longest = ranked[0].word_count.max(1);
        let scores = request
            .entries
            .iter()
            .map(|e| {
                let score = 1.0 + 3.0 * (e.word_count as f64 / longest as f64);
                format!("\"{}\": {:.2}", e.participant_id, score.min(4.0))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let runner_up_words = ranked.get(1).map(|e| e.word_count).unwrap_or(0);
        let content = if ranked[0].word_count == runner_up_words {
            format!(
                r#"{{"winner": null, "scores": {{{scores}}}, "rationale": "Both submissions are equally developed."}}"#
            )
        } else {
            format!(
                r#"{{"winner": "{}", "scores": {{{scores}}}, "rationale": "{} is the more developed submission ({} vs {} words)."}}"#,
                ranked[0].participant_id, ranked[0].name, ranked[0].word_count, runner_up_words
            )
        };

        Ok(JudgeReply {
            content,
            model: request.model,
            input_tokens: (request.prompt.len() / 4) as u64,
            output_tokens: 64,
            response_time: request_start.elapsed(),
        })
    }
}
