//! Judge client adapter
//!
//! Owns per-call policy for the external judge: submission validation,
//! timeout, retry with backoff for transient failures, and the validating
//! parse from raw reply text into a [`Verdict`]. Parse failures are
//! non-transient and never retried with the same request.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::prompt::PromptBuilder;
use crate::error::{ArenaError, ArenaResult};
use crate::traits::JudgeBackend;
use crate::types::{JudgeEntry, JudgeReply, JudgeRequest, MatchContext};
use shared::{ArenaConfig, JudgeFailure, Verdict};

/// Low temperature keeps grading consistent across calls
const JUDGE_TEMPERATURE: f32 = 0.1;
const JUDGE_MAX_TOKENS: u32 = 2000;

/// Wire shape the judge must reply with
#[derive(Debug, Deserialize)]
struct VerdictWire {
    winner: Option<Uuid>,
    scores: HashMap<Uuid, f64>,
    rationale: String,
}

/// Per-call judge policy wrapper around a raw backend
pub struct Judge<B: JudgeBackend> {
    backend: Arc<B>,
    prompts: PromptBuilder,
    timeout: Duration,
    max_retries: u32,
    min_submission_words: usize,
    model: String,
    json_fence: Regex,
}

impl<B: JudgeBackend> Judge<B> {
    pub fn new(backend: Arc<B>, config: &ArenaConfig) -> Self {
        // Matches a fenced JSON block anywhere in the reply
        let json_fence = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap();
        Self {
            backend,
            prompts: PromptBuilder::new(),
            timeout: config.judge_timeout(),
            max_retries: config.max_retries,
            min_submission_words: config.min_submission_words,
            model: config.model.clone(),
            json_fence,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Run one judged comparison for a match.
    ///
    /// Fails fast with `InvalidSubmission` before any network call when a
    /// submission is degenerate; returns `JudgeUnavailable` once transient
    /// failures exhaust the retry budget; returns `MalformedVerdict` when
    /// the reply does not parse into the verdict contract.
    pub async fn judge(&self, ctx: &MatchContext) -> ArenaResult<Verdict> {
        self.validate_submissions(ctx)?;

        let request = JudgeRequest {
            match_id: ctx.match_id,
            prompt: self.prompts.comparison_prompt(ctx),
            entries: ctx
                .entries
                .iter()
                .map(|(p, s)| JudgeEntry {
                    participant_id: p.id,
                    name: p.name.clone(),
                    word_count: s.word_count,
                })
                .collect(),
            model: self.model.clone(),
            max_tokens: JUDGE_MAX_TOKENS,
            temperature: JUDGE_TEMPERATURE,
        };

        let reply = self.send_with_retries(request).await?;
        self.parse_verdict(&reply.content, ctx)
    }

    fn validate_submissions(&self, ctx: &MatchContext) -> ArenaResult<()> {
        for (participant, submission) in &ctx.entries {
            if submission.content.trim().is_empty() {
                return Err(ArenaError::InvalidSubmission {
                    participant: participant.id,
                    reason: "submission content is empty".to_string(),
                });
            }
            if submission.word_count < self.min_submission_words {
                return Err(ArenaError::InvalidSubmission {
                    participant: participant.id,
                    reason: format!(
                        "submission has {} words, below the {} word minimum",
                        submission.word_count, self.min_submission_words
                    ),
                });
            }
        }
        Ok(())
    }

    /// Send the request with a per-call timeout, retrying transient
    /// failures with exponential backoff
    async fn send_with_retries(&self, request: JudgeRequest) -> ArenaResult<JudgeReply> {
        let mut last_failure = JudgeFailure::Timeout;

        for attempt in 0..=self.max_retries {
            let outcome = tokio::time::timeout(self.timeout, self.backend.send_comparison(request.clone())).await;

            let failure = match outcome {
                Ok(Ok(reply)) => {
                    debug!(
                        match_id = %request.match_id,
                        response_ms = reply.response_time.as_millis() as u64,
                        "judge reply received"
                    );
                    return Ok(reply);
                }
                Ok(Err(failure)) => failure,
                Err(_) => JudgeFailure::Timeout,
            };

            if !failure.is_transient() {
                return Err(ArenaError::JudgeUnavailable {
                    attempts: attempt + 1,
                    last: failure,
                });
            }

            last_failure = failure;
            if attempt < self.max_retries {
                let delay = Duration::from_millis(100 * (1 << attempt));
                warn!(
                    match_id = %request.match_id,
                    "⏳ judge error (attempt {}): {}, retrying in {}ms",
                    attempt + 1,
                    last_failure,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(ArenaError::JudgeUnavailable {
            attempts: self.max_retries + 1,
            last: last_failure,
        })
    }

    /// Validating parse from raw reply text to a structured verdict
    fn parse_verdict(&self, raw: &str, ctx: &MatchContext) -> ArenaResult<Verdict> {
        let payload = self.extract_json(raw);

        let wire: VerdictWire = serde_json::from_str(payload).map_err(|e| {
            error!("❌ unparseable judge reply: {e}; raw payload: {raw}");
            ArenaError::MalformedVerdict {
                detail: format!("reply is not valid verdict JSON: {e}"),
                raw: raw.to_string(),
            }
        })?;

        let ids = ctx.participant_ids();
        if let Some(winner) = wire.winner {
            if !ids.contains(&winner) {
                error!("❌ judge declared unknown winner {winner}; raw payload: {raw}");
                return Err(ArenaError::MalformedVerdict {
                    detail: format!("winner {winner} is not a participant of this match"),
                    raw: raw.to_string(),
                });
            }
        }
        for id in &ids {
            if !wire.scores.contains_key(id) {
                error!("❌ judge omitted a score for {id}; raw payload: {raw}");
                return Err(ArenaError::MalformedVerdict {
                    detail: format!("missing score for participant {id}"),
                    raw: raw.to_string(),
                });
            }
        }

        // Scores for ids outside the match are dropped rather than kept
        let scores: HashMap<Uuid, f64> = wire
            .scores
            .into_iter()
            .filter(|(id, _)| ids.contains(id))
            .collect();

        Ok(match wire.winner {
            Some(winner) => Verdict::Decision {
                winner,
                scores,
                rationale: wire.rationale,
            },
            None => Verdict::Tie {
                scores,
                rationale: wire.rationale,
            },
        })
    }

    /// Pull the JSON object out of a reply that may wrap it in prose or a
    /// markdown fence
    fn extract_json<'a>(&self, raw: &'a str) -> &'a str {
        if let Some(captures) = self.json_fence.captures(raw) {
            if let Some(block) = captures.get(1) {
                return block.as_str();
            }
        }
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if end > start => &raw[start..=end],
            _ => raw,
        }
    }
}
