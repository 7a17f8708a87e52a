//! Tests for judge backend services

use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::services::judge_client::{AnthropicJudge, ScriptedJudge};
use crate::traits::JudgeBackend;
use crate::types::{JudgeEntry, JudgeRequest};
use shared::JudgeFailure;

fn request(entries: Vec<JudgeEntry>) -> JudgeRequest {
    JudgeRequest {
        match_id: Uuid::new_v4(),
        prompt: "compare the submissions".to_string(),
        entries,
        model: "claude-3-5-sonnet-20241022".to_string(),
        max_tokens: 2000,
        temperature: 0.1,
    }
}

fn entry(name: &str, word_count: usize) -> JudgeEntry {
    JudgeEntry {
        participant_id: Uuid::new_v4(),
        name: name.to_string(),
        word_count,
    }
}

#[tokio::test]
async fn test_anthropic_judge_extracts_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "{\"winner\": null}"}],
            "usage": {"input_tokens": 120, "output_tokens": 40}
        })))
        .mount(&server)
        .await;

    let judge = AnthropicJudge::new("test-key").with_base_url(server.uri());
    let reply = judge
        .send_comparison(request(vec![entry("a", 30), entry("b", 20)]))
        .await
        .unwrap();

    assert_eq!(reply.content, "{\"winner\": null}");
    assert_eq!(reply.input_tokens, 120);
    assert_eq!(reply.output_tokens, 40);
}

#[tokio::test]
async fn test_anthropic_judge_maps_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let judge = AnthropicJudge::new("test-key").with_base_url(server.uri());
    let result = judge
        .send_comparison(request(vec![entry("a", 30), entry("b", 20)]))
        .await;
    assert_eq!(result.unwrap_err(), JudgeFailure::RateLimited);
}

#[tokio::test]
async fn test_anthropic_judge_maps_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let judge = AnthropicJudge::new("bad-key").with_base_url(server.uri());
    let result = judge
        .send_comparison(request(vec![entry("a", 30), entry("b", 20)]))
        .await;
    assert_eq!(result.unwrap_err(), JudgeFailure::AuthenticationFailed);
}

#[tokio::test]
async fn test_anthropic_judge_maps_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let judge = AnthropicJudge::new("test-key").with_base_url(server.uri());
    let result = judge
        .send_comparison(request(vec![entry("a", 30), entry("b", 20)]))
        .await;
    assert!(matches!(result.unwrap_err(), JudgeFailure::ServerError { .. }));
}

#[tokio::test]
async fn test_anthropic_judge_rejects_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [],
            "usage": {"input_tokens": 1, "output_tokens": 0}
        })))
        .mount(&server)
        .await;

    let judge = AnthropicJudge::new("test-key").with_base_url(server.uri());
    let result = judge
        .send_comparison(request(vec![entry("a", 30), entry("b", 20)]))
        .await;
    assert!(matches!(result.unwrap_err(), JudgeFailure::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_scripted_judge_prefers_longer_submission() {
    let judge = ScriptedJudge::new();
    let long = entry("long", 120);
    let short = entry("short", 30);
    let winner_id = long.participant_id;

    let reply = judge.send_comparison(request(vec![long, short])).await.unwrap();
    assert!(reply.content.contains(&winner_id.to_string()));
    assert!(reply.content.contains("\"winner\""));
}

#[tokio::test]
async fn test_scripted_judge_is_deterministic() {
    let judge = ScriptedJudge::new();
    let entries = vec![entry("a", 50), entry("b", 40)];

    let first = judge.send_comparison(request(entries.clone())).await.unwrap();
    let second = judge.send_comparison(request(entries)).await.unwrap();
    assert_eq!(first.content, second.content);
}

#[tokio::test]
async fn test_scripted_judge_ties_on_equal_length() {
    let judge = ScriptedJudge::new().with_latency(Duration::from_millis(1));
    let reply = judge
        .send_comparison(request(vec![entry("a", 40), entry("b", 40)]))
        .await
        .unwrap();
    assert!(reply.content.contains("\"winner\": null"));
}
