//! Tournament engine
//!
//! The orchestration surface: create a tournament, run it round by round
//! (or to completion), and read standings. Rounds serialize here; matches
//! within a round parallelize in the coordinator. All tournament mutation
//! happens on the caller's task, using only results handed back by workers.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::coordinator::RoundCoordinator;
use crate::core::executor::MatchExecutor;
use crate::core::prompt::PromptBuilder;
use crate::core::judge::Judge;
use crate::core::{schedule, standings};
use crate::error::{ArenaError, ArenaResult};
use crate::traits::{JudgeBackend, SubmissionProvider};
use crate::types::{CancelFlag, MatchContext};
use shared::{
    ArenaConfig, Match, RoundOutcome, StandingEntry, Tournament, TournamentFormat,
};

pub struct TournamentEngine<B: JudgeBackend + 'static> {
    config: ArenaConfig,
    backend: Arc<B>,
    executor: Arc<MatchExecutor<B>>,
    coordinator: RoundCoordinator,
    cancel: CancelFlag,
}

impl<B: JudgeBackend + 'static> TournamentEngine<B> {
    pub fn new(backend: Arc<B>, config: ArenaConfig) -> ArenaResult<Self> {
        config.validate()?;
        let executor = Arc::new(MatchExecutor::new(backend.clone(), &config));
        let coordinator = RoundCoordinator::new(config.max_concurrent_matches);
        Ok(Self {
            config,
            backend,
            executor,
            coordinator,
            cancel: CancelFlag::new(),
        })
    }

    /// Swap in a custom rubric/instruction set for the judge
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        let judge = Judge::new(self.backend.clone(), &self.config).with_prompts(prompts);
        self.executor = Arc::new(MatchExecutor::new(self.backend.clone(), &self.config).with_judge(judge));
        self
    }

    /// Handle for cooperative cancellation of in-progress rounds
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Create a tournament: fetch and validate every submission up front,
    /// then schedule the opening round.
    ///
    /// Degenerate submissions surface as `InvalidSubmission` here, before
    /// any judge call is spent on them.
    pub async fn create_tournament(
        &self,
        name: impl Into<String>,
        format: TournamentFormat,
        provider: &dyn SubmissionProvider,
    ) -> ArenaResult<Tournament> {
        let name = name.into();
        let participants = provider.participants().await?;

        if participants.len() < 2 {
            return Err(ArenaError::InvalidFormatInput {
                message: format!("{format} needs at least 2 participants, got {}", participants.len()),
            });
        }
        let distinct: HashSet<Uuid> = participants.iter().map(|p| p.id).collect();
        if distinct.len() != participants.len() {
            return Err(ArenaError::InvalidFormatInput {
                message: "participant ids must be unique".to_string(),
            });
        }

        let mut submissions = HashMap::new();
        for participant in &participants {
            let submission = provider.submission(participant.id).await?;
            if submission.word_count < self.config.min_submission_words {
                return Err(ArenaError::InvalidSubmission {
                    participant: participant.id,
                    reason: format!(
                        "submission has {} words, below the {} word minimum",
                        submission.word_count, self.config.min_submission_words
                    ),
                });
            }
            submissions.insert(participant.id, submission);
        }

        let id = Uuid::new_v4();
        let plan = schedule::next_round(id, &participants, format, &[], self.config.seed)?
            .ok_or_else(|| ArenaError::InvalidFormatInput {
                message: "format produced no opening round".to_string(),
            })?;

        info!(
            tournament = %id,
            %format,
            participants = participants.len(),
            matches = plan.matches.len(),
            "🎯 tournament created"
        );

        Ok(Tournament {
            id,
            name,
            format,
            participants,
            submissions,
            matches: plan.matches,
            current_round: 0,
            terminal: false,
            winner: None,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// Execute the next pending round and fold its results into the
    /// tournament.
    ///
    /// A cancelled round leaves its undispatched matches pending and does
    /// not advance the round counter, so a later call resumes exactly
    /// where this one stopped (completed matches are never re-judged).
    pub async fn run_next_round(&self, tournament: &mut Tournament) -> ArenaResult<RoundOutcome> {
        if tournament.terminal {
            return Err(ArenaError::TournamentComplete { id: tournament.id });
        }

        let round = tournament.current_round + 1;
        let work = tournament
            .matches
            .iter()
            .filter(|m| m.round == round)
            .cloned()
            .map(|m| {
                let ctx = self.build_context(tournament, &m)?;
                Ok((m, ctx))
            })
            .collect::<ArenaResult<Vec<_>>>()?;

        let outcome = self
            .coordinator
            .run_round(self.executor.clone(), round, work, &self.cancel)
            .await;

        for updated in &outcome.matches {
            if let Some(slot) = tournament.matches.iter_mut().find(|m| m.id == updated.id) {
                *slot = updated.clone();
            }
        }

        if !outcome.skipped.is_empty() {
            info!(tournament = %tournament.id, round, "⏸️ round cancelled before completion");
            return Ok(outcome);
        }

        tournament.current_round = round;
        self.advance(tournament)?;
        Ok(outcome)
    }

    /// Drive rounds until the tournament is terminal or a cancellation
    /// stops the run early
    pub async fn run_to_completion(&self, tournament: &mut Tournament) -> ArenaResult<()> {
        while !tournament.terminal {
            if self.cancel.is_cancelled() {
                info!(tournament = %tournament.id, "⏸️ run cancelled between rounds");
                break;
            }
            let outcome = self.run_next_round(tournament).await?;
            if !outcome.skipped.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Current standings, recomputed from the full match log
    pub fn standings(&self, tournament: &Tournament) -> Vec<StandingEntry> {
        standings::compute(&tournament.participants, &tournament.matches, self.config.tie_credit)
    }

    /// Schedule the next round, or close out the tournament when the
    /// format's completion condition holds
    fn advance(&self, tournament: &mut Tournament) -> ArenaResult<()> {
        let next = schedule::next_round(
            tournament.id,
            &tournament.participants,
            tournament.format,
            &tournament.matches,
            self.config.seed,
        )?;

        match next {
            Some(plan) => {
                info!(
                    tournament = %tournament.id,
                    round = plan.round,
                    matches = plan.matches.len(),
                    byes = plan.byes.len(),
                    "📋 next round scheduled"
                );
                tournament.matches.extend(plan.matches);
            }
            None => {
                tournament.terminal = true;
                tournament.completed_at = Some(Utc::now());
                tournament.winner = schedule::champion(
                    &tournament.participants,
                    tournament.format,
                    &tournament.matches,
                )
                .or_else(|| {
                    self.standings(tournament)
                        .first()
                        .map(|entry| entry.participant_id)
                });

                let unresolved = tournament.unresolved().len();
                info!(
                    tournament = %tournament.id,
                    winner = ?tournament.winner,
                    unresolved,
                    "🏆 tournament complete"
                );
            }
        }
        Ok(())
    }

    fn build_context(&self, tournament: &Tournament, m: &Match) -> ArenaResult<MatchContext> {
        let mut entries = Vec::with_capacity(m.participants.len());
        for pid in &m.participants {
            let participant = tournament.participant(*pid).ok_or_else(|| ArenaError::InvalidSubmission {
                participant: *pid,
                reason: "participant is not part of this tournament".to_string(),
            })?;
            let submission = tournament.submissions.get(pid).ok_or_else(|| ArenaError::InvalidSubmission {
                participant: *pid,
                reason: "no submission on record".to_string(),
            })?;
            entries.push((participant.clone(), submission.clone()));
        }
        Ok(MatchContext {
            match_id: m.id,
            round: m.round,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::judge_client::ScriptedJudge;
    use crate::services::submissions::InMemorySubmissionStore;
    use shared::MatchStatus;

    fn store(entries: &[(&str, usize)]) -> InMemorySubmissionStore {
        let mut store = InMemorySubmissionStore::new();
        for (name, words) in entries {
            store.add(*name, "word ".repeat(*words).trim().to_string());
        }
        store
    }

    fn engine(limit: usize) -> TournamentEngine<ScriptedJudge> {
        let config = ArenaConfig {
            max_concurrent_matches: limit,
            judge_timeout_secs: 5,
            max_retries: 0,
            min_submission_words: 10,
            seed: Some(11),
            ..ArenaConfig::default()
        };
        TournamentEngine::new(Arc::new(ScriptedJudge::new()), config).unwrap()
    }

    #[tokio::test]
    async fn test_round_robin_to_completion() {
        let engine = engine(4);
        let store = store(&[("alice", 80), ("bob", 60), ("carol", 40), ("dan", 20)]);

        let mut tournament = engine
            .create_tournament("pilot", TournamentFormat::RoundRobin, &store)
            .await
            .unwrap();
        assert_eq!(tournament.matches.len(), 6);

        engine.run_to_completion(&mut tournament).await.unwrap();

        assert!(tournament.terminal);
        assert_eq!(tournament.current_round, 1);
        assert!(tournament
            .matches
            .iter()
            .all(|m| m.status == MatchStatus::Completed));

        // The scripted judge favors longer submissions, so the ranking
        // follows word counts
        let standings = engine.standings(&tournament);
        let names: Vec<&str> = standings.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol", "dan"]);
        assert_eq!(standings[0].wins, 3.0);
        assert_eq!(tournament.winner, Some(standings[0].participant_id));
    }

    #[tokio::test]
    async fn test_single_elimination_round_progression() {
        let engine = engine(4);
        let store = store(&[
            ("p1", 100),
            ("p2", 90),
            ("p3", 80),
            ("p4", 70),
            ("p5", 60),
        ]);

        let mut tournament = engine
            .create_tournament("bracket", TournamentFormat::SingleElimination, &store)
            .await
            .unwrap();

        engine.run_to_completion(&mut tournament).await.unwrap();

        // ceil(log2(5)) = 3 rounds, one undefeated finalist
        assert!(tournament.terminal);
        assert_eq!(tournament.current_round, 3);
        assert!(tournament.winner.is_some());

        let finalist = tournament.winner.unwrap();
        let beaten: Vec<_> = tournament
            .matches
            .iter()
            .filter(|m| m.participants.contains(&finalist))
            .collect();
        assert!(beaten.iter().all(|m| m.winner() == Some(finalist)));
    }

    #[tokio::test]
    async fn test_double_elimination_runs_terminal() {
        let engine = engine(4);
        let store = store(&[("p1", 90), ("p2", 70), ("p3", 50), ("p4", 30)]);

        let mut tournament = engine
            .create_tournament("double", TournamentFormat::DoubleElimination, &store)
            .await
            .unwrap();
        engine.run_to_completion(&mut tournament).await.unwrap();

        assert!(tournament.terminal);
        assert!(tournament.winner.is_some());
    }

    #[tokio::test]
    async fn test_terminal_tournament_rejects_more_rounds() {
        let engine = engine(2);
        let store = store(&[("a", 40), ("b", 30)]);

        let mut tournament = engine
            .create_tournament("tiny", TournamentFormat::RoundRobin, &store)
            .await
            .unwrap();
        engine.run_to_completion(&mut tournament).await.unwrap();

        let result = engine.run_next_round(&mut tournament).await;
        assert!(matches!(result, Err(ArenaError::TournamentComplete { .. })));
    }

    #[tokio::test]
    async fn test_single_participant_rejected() {
        let engine = engine(2);
        let store = store(&[("loner", 40)]);

        let result = engine
            .create_tournament("solo", TournamentFormat::RoundRobin, &store)
            .await;
        assert!(matches!(result, Err(ArenaError::InvalidFormatInput { .. })));
    }

    #[tokio::test]
    async fn test_short_submission_rejected_before_scheduling() {
        let engine = engine(2);
        let store = store(&[("fine", 40), ("terse", 2)]);

        let result = engine
            .create_tournament("strict", TournamentFormat::RoundRobin, &store)
            .await;
        assert!(matches!(result, Err(ArenaError::InvalidSubmission { .. })));
    }

    #[tokio::test]
    async fn test_partial_failures_still_reach_standings() {
        use crate::types::{JudgeReply, JudgeRequest};
        use async_trait::async_trait;
        use shared::JudgeFailure;

        // Delegates to the scripted judge, except any match involving the
        // submission with the marked word count fails outright
        struct FlakyBackend {
            fail_word_count: usize,
        }

        #[async_trait]
        impl crate::traits::JudgeBackend for FlakyBackend {
            async fn send_comparison(&self, request: JudgeRequest) -> Result<JudgeReply, JudgeFailure> {
                if request.entries.iter().any(|e| e.word_count == self.fail_word_count) {
                    return Err(JudgeFailure::ServiceUnavailable);
                }
                ScriptedJudge::new().send_comparison(request).await
            }
        }

        let config = ArenaConfig {
            max_concurrent_matches: 2,
            judge_timeout_secs: 5,
            max_retries: 0,
            min_submission_words: 10,
            ..ArenaConfig::default()
        };
        let engine =
            TournamentEngine::new(Arc::new(FlakyBackend { fail_word_count: 37 }), config).unwrap();
        let store = store(&[("a", 80), ("b", 60), ("c", 37)]);

        let mut tournament = engine
            .create_tournament("partial", TournamentFormat::RoundRobin, &store)
            .await
            .unwrap();
        engine.run_to_completion(&mut tournament).await.unwrap();

        // Both of c's matches failed; the tournament still completes and
        // reports them as unresolved
        assert!(tournament.terminal);
        assert_eq!(tournament.unresolved().len(), 2);

        // Failed matches count for neither side
        let standings = engine.standings(&tournament);
        let entry = |name: &str| standings.iter().find(|e| e.name == name).unwrap();
        assert_eq!(entry("a").wins, 1.0);
        assert_eq!(entry("b").losses, 1.0);
        assert_eq!(entry("c").played, 0);
        assert_eq!(entry("c").wins, 0.0);
        assert_eq!(entry("c").losses, 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_round_leaves_matches_pending() {
        let engine = engine(1);
        let store = store(&[("a", 80), ("b", 60), ("c", 40)]);

        let mut tournament = engine
            .create_tournament("resumable", TournamentFormat::RoundRobin, &store)
            .await
            .unwrap();

        engine.cancel_flag().cancel();
        let outcome = engine.run_next_round(&mut tournament).await.unwrap();
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(tournament.current_round, 0);
        assert!(!tournament.terminal);
        assert!(tournament.matches.iter().all(|m| m.status == MatchStatus::Pending));
    }
}
