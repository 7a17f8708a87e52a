//! Concurrency coordinator
//!
//! Drains one round's matches through the executor under a bounded
//! concurrency budget. Matches are fully independent; the semaphore is the
//! only state shared between workers, and every match is owned by exactly
//! one worker until it is handed back here.

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::core::executor::MatchExecutor;
use crate::traits::JudgeBackend;
use crate::types::{CancelFlag, MatchContext};
use shared::{FailureKind, Match, MatchStatus, RoundOutcome};

enum Slot {
    Ran(Match),
    Skipped(Match),
}

pub struct RoundCoordinator {
    limit: usize,
}

impl RoundCoordinator {
    pub fn new(limit: usize) -> Self {
        Self { limit: limit.max(1) }
    }

    /// Run every match of a round, at most `limit` in flight at once.
    ///
    /// Individual failures never abort the round; the outcome carries the
    /// completed and failed matches side by side and callers decide what to
    /// do about the failures. Cancellation is honored between dispatches:
    /// in-flight judge calls finish (or time out per their own policy) and
    /// matches never dispatched are reported as skipped, still pending.
    pub async fn run_round<B: JudgeBackend + 'static>(
        &self,
        executor: Arc<MatchExecutor<B>>,
        round: u32,
        work: Vec<(Match, MatchContext)>,
        cancel: &CancelFlag,
    ) -> RoundOutcome {
        info!(
            round,
            matches = work.len(),
            limit = self.limit,
            "🏁 dispatching round"
        );

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut handles = Vec::with_capacity(work.len());

        for (m, ctx) in work {
            if cancel.is_cancelled() {
                handles.push((m, None));
                continue;
            }

            let semaphore = semaphore.clone();
            let executor = executor.clone();
            let cancel = cancel.clone();
            // Kept for attribution if the worker dies before handing back
            let fallback = m.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Slot::Skipped(m),
                };
                if cancel.is_cancelled() {
                    return Slot::Skipped(m);
                }
                Slot::Ran(executor.execute(m, ctx).await)
            });
            handles.push((fallback, Some(handle)));
        }

        let joined = join_all(handles.into_iter().map(|(fallback, handle)| async move {
            match handle {
                None => Slot::Skipped(fallback),
                Some(handle) => match handle.await {
                    Ok(slot) => slot,
                    Err(join_error) => {
                        error!(match_id = %fallback.id, "❌ match worker died: {join_error}");
                        let mut m = fallback;
                        m.status = MatchStatus::Failed;
                        m.failure = Some(FailureKind::Internal {
                            detail: format!("match worker died: {join_error}"),
                        });
                        m.completed_at = Some(Utc::now());
                        Slot::Ran(m)
                    }
                },
            }
        }))
        .await;

        let mut matches = Vec::with_capacity(joined.len());
        let mut skipped = Vec::new();
        for slot in joined {
            match slot {
                Slot::Ran(m) => matches.push(m),
                Slot::Skipped(m) => {
                    skipped.push(m.id);
                    matches.push(m);
                }
            }
        }

        let outcome = RoundOutcome { round, matches, skipped };
        info!(
            round,
            completed = outcome.completed_count(),
            failed = outcome.failed_count(),
            skipped = outcome.skipped.len(),
            "🏆 round finished"
        );
        outcome
    }
}
