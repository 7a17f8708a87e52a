//! Match executor
//!
//! Runs one match end to end: status transitions, the judge call through
//! the adapter, and result/failure attachment. A judge failure is recorded
//! on the match, never surfaced as an error, so the round keeps making
//! progress around it.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::judge::Judge;
use crate::traits::JudgeBackend;
use crate::types::MatchContext;
use shared::{ArenaConfig, Match, MatchResult, MatchStatus};

pub struct MatchExecutor<B: JudgeBackend> {
    judge: Judge<B>,
    model: String,
}

impl<B: JudgeBackend> MatchExecutor<B> {
    pub fn new(backend: Arc<B>, config: &ArenaConfig) -> Self {
        Self {
            judge: Judge::new(backend, config),
            model: config.model.clone(),
        }
    }

    pub fn with_judge(mut self, judge: Judge<B>) -> Self {
        self.judge = judge;
        self
    }

    /// Execute one match and hand it back with its outcome attached.
    ///
    /// Re-invoking on a completed match returns the stored result without a
    /// second judge call, so retry orchestration above this layer is safe.
    pub async fn execute(&self, mut m: Match, ctx: MatchContext) -> Match {
        if m.status == MatchStatus::Completed {
            debug!(match_id = %m.id, "match already completed, returning stored result");
            return m;
        }

        m.status = MatchStatus::Running;
        m.failure = None;

        match self.judge.judge(&ctx).await {
            Ok(verdict) => {
                info!(
                    match_id = %m.id,
                    round = m.round,
                    tie = verdict.is_tie(),
                    "✅ match judged"
                );
                m.result = Some(MatchResult::new(verdict, self.model.clone()));
                m.status = MatchStatus::Completed;
            }
            Err(error) => {
                warn!(match_id = %m.id, round = m.round, "⚠️ match failed: {error}");
                m.failure = Some(error.to_failure_kind());
                m.status = MatchStatus::Failed;
            }
        }
        m.completed_at = Some(Utc::now());
        m
    }
}
