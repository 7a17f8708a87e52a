//! Core types used throughout the arena system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Tournament formats supported by the schedule generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    RoundRobin,
    SingleElimination,
    DoubleElimination,
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentFormat::RoundRobin => write!(f, "round_robin"),
            TournamentFormat::SingleElimination => write!(f, "single_elimination"),
            TournamentFormat::DoubleElimination => write!(f, "double_elimination"),
        }
    }
}

impl std::str::FromStr for TournamentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round_robin" | "round-robin" | "rr" => Ok(TournamentFormat::RoundRobin),
            "single_elimination" | "single-elimination" | "single" => Ok(TournamentFormat::SingleElimination),
            "double_elimination" | "double-elimination" | "double" => Ok(TournamentFormat::DoubleElimination),
            _ => Err(format!("Unknown tournament format: {s}")),
        }
    }
}

/// Lifecycle of a scheduled match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A contestant in the arena. Identity is fixed before the tournament starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    /// Higher-seeded participants are drawn first when byes are handed out
    pub seed_weight: u32,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            seed_weight: 0,
        }
    }

    pub fn with_seed_weight(mut self, weight: u32) -> Self {
        self.seed_weight = weight;
        self
    }
}

/// A participant's text submission. Content is opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub participant_id: Uuid,
    pub content: String,
    pub word_count: usize,
    /// Where the content came from (filename etc.), diagnostics only
    pub source: Option<String>,
}

impl Submission {
    pub fn new(participant_id: Uuid, content: impl Into<String>) -> Self {
        let content = content.into();
        let word_count = content.split_whitespace().count();
        Self {
            participant_id,
            content,
            word_count,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Structured judge output, validated at the adapter boundary.
///
/// Anything the judge returns that does not fit one of these shapes is a
/// malformed verdict, never coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Decision {
        winner: Uuid,
        scores: HashMap<Uuid, f64>,
        rationale: String,
    },
    Tie {
        scores: HashMap<Uuid, f64>,
        rationale: String,
    },
}

impl Verdict {
    pub fn winner(&self) -> Option<Uuid> {
        match self {
            Verdict::Decision { winner, .. } => Some(*winner),
            Verdict::Tie { .. } => None,
        }
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, Verdict::Tie { .. })
    }

    pub fn scores(&self) -> &HashMap<Uuid, f64> {
        match self {
            Verdict::Decision { scores, .. } => scores,
            Verdict::Tie { scores, .. } => scores,
        }
    }

    pub fn score_of(&self, participant: Uuid) -> f64 {
        self.scores().get(&participant).copied().unwrap_or(0.0)
    }

    pub fn rationale(&self) -> &str {
        match self {
            Verdict::Decision { rationale, .. } => rationale,
            Verdict::Tie { rationale, .. } => rationale,
        }
    }
}

/// Outcome of one completed match. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub verdict: Verdict,
    pub model: String,
    pub judged_at: DateTime<Utc>,
}

impl MatchResult {
    pub fn new(verdict: Verdict, model: impl Into<String>) -> Self {
        Self {
            verdict,
            model: model.into(),
            judged_at: Utc::now(),
        }
    }
}

/// Failure classification for calls to the external judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JudgeFailure {
    RateLimited,
    Timeout,
    ServiceUnavailable,
    AuthenticationFailed,
    Network { message: String },
    InvalidRequest { message: String },
    ServerError { status: String },
}

impl JudgeFailure {
    /// Transient failures are worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            JudgeFailure::RateLimited
                | JudgeFailure::Timeout
                | JudgeFailure::ServiceUnavailable
                | JudgeFailure::Network { .. }
        )
    }
}

impl fmt::Display for JudgeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgeFailure::RateLimited => write!(f, "rate limit exceeded"),
            JudgeFailure::Timeout => write!(f, "request timed out"),
            JudgeFailure::ServiceUnavailable => write!(f, "service unavailable"),
            JudgeFailure::AuthenticationFailed => write!(f, "authentication failed"),
            JudgeFailure::Network { message } => write!(f, "network error: {message}"),
            JudgeFailure::InvalidRequest { message } => write!(f, "invalid request: {message}"),
            JudgeFailure::ServerError { status } => write!(f, "server error: {status}"),
        }
    }
}

/// Why a match could not produce a result. Failure is recorded, not thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidSubmission { participant: Uuid, reason: String },
    JudgeUnavailable { attempts: u32, last: JudgeFailure },
    MalformedVerdict { detail: String },
    Internal { detail: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidSubmission { participant, reason } => {
                write!(f, "invalid submission from {participant}: {reason}")
            }
            FailureKind::JudgeUnavailable { attempts, last } => {
                write!(f, "judge unavailable after {attempts} attempt(s): {last}")
            }
            FailureKind::MalformedVerdict { detail } => write!(f, "malformed verdict: {detail}"),
            FailureKind::Internal { detail } => write!(f, "internal failure: {detail}"),
        }
    }
}

/// One scheduled comparison between two or more participants.
///
/// Matches are appended to the tournament's match log and never deleted;
/// only the status, result and timestamp fields move forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub round: u32,
    /// Ordered participant ids, always 2+
    pub participants: Vec<Uuid>,
    pub status: MatchStatus,
    pub result: Option<MatchResult>,
    pub failure: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(tournament_id: Uuid, round: u32, participants: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            participants,
            status: MatchStatus::Pending,
            result: None,
            failure: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        self.participants.len() == 2 && self.participants.contains(&a) && self.participants.contains(&b)
    }

    /// Declared winner of a completed decision match
    pub fn winner(&self) -> Option<Uuid> {
        if self.status != MatchStatus::Completed {
            return None;
        }
        self.result.as_ref().and_then(|r| r.verdict.winner())
    }
}

/// The matches for one round, plus participants advancing without one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundPlan {
    pub round: u32,
    pub matches: Vec<Match>,
    pub byes: Vec<Uuid>,
}

impl RoundPlan {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Everything a round produced: the updated matches (keyed by id, in no
/// particular completion order) plus the ids of matches never dispatched
/// because the round was cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub matches: Vec<Match>,
    pub skipped: Vec<Uuid>,
}

impl RoundOutcome {
    pub fn completed(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.status == MatchStatus::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.status == MatchStatus::Failed)
    }

    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn result(&self, match_id: Uuid) -> Option<&MatchResult> {
        self.matches
            .iter()
            .find(|m| m.id == match_id)
            .and_then(|m| m.result.as_ref())
    }
}

/// Derived ranking row. Recomputed fresh from the match log, never stored
/// as a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingEntry {
    pub participant_id: Uuid,
    pub name: String,
    /// Fractional when ties award partial credit
    pub wins: f64,
    pub losses: f64,
    pub ties: u32,
    pub played: u32,
    pub average_score: f64,
    pub rank: u32,
}

/// Aggregate root for one tournament run.
///
/// The match log is append-only; `current_round` and `terminal` advance
/// monotonically and nothing else mutates after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub format: TournamentFormat,
    pub participants: Vec<Participant>,
    pub submissions: HashMap<Uuid, Submission>,
    pub matches: Vec<Match>,
    /// Highest round that has been executed (0 = none yet)
    pub current_round: u32,
    pub terminal: bool,
    pub winner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn participant(&self, id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn round_matches(&self, round: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.round == round).collect()
    }

    /// Failed matches, excluded from scoring; consumers use this to judge
    /// confidence in the final ranking
    pub fn unresolved(&self) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.status == MatchStatus::Failed).collect()
    }

    pub fn completion_fraction(&self) -> f64 {
        if self.matches.is_empty() {
            return 0.0;
        }
        let done = self
            .matches
            .iter()
            .filter(|m| matches!(m.status, MatchStatus::Completed | MatchStatus::Failed))
            .count();
        done as f64 / self.matches.len() as f64
    }
}

/// Engine configuration surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Maximum simultaneously in-flight judge calls
    pub max_concurrent_matches: usize,
    /// Per-call judge timeout in seconds
    pub judge_timeout_secs: u64,
    /// Retries after the first attempt for transient judge failures
    pub max_retries: u32,
    /// Win credit each side receives for a tie, 0.0..=1.0
    pub tie_credit: f64,
    /// Submissions below this word count fail fast before any judge call
    pub min_submission_words: usize,
    /// Seed for deterministic bye/seeding order; None keeps input order
    pub seed: Option<u64>,
    /// Judge model identifier
    pub model: String,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_concurrent_matches: 5,
            judge_timeout_secs: 60,
            max_retries: 2,
            tie_credit: 0.5,
            min_submission_words: 25,
            seed: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
        }
    }
}

impl ArenaConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        Self {
            max_concurrent_matches: env::var("MAX_CONCURRENT_MATCHES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_matches),
            judge_timeout_secs: env::var("GRADING_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.judge_timeout_secs),
            max_retries: env::var("ARENA_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            tie_credit: env::var("ARENA_TIE_CREDIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tie_credit),
            min_submission_words: env::var("ARENA_MIN_SUBMISSION_WORDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_submission_words),
            seed: env::var("ARENA_SEED").ok().and_then(|v| v.parse().ok()),
            model: env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model),
        }
    }

    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.max_concurrent_matches == 0 || self.max_concurrent_matches > 20 {
            return Err(SharedError::InvalidConfig {
                field: "max_concurrent_matches".to_string(),
                value: self.max_concurrent_matches.to_string(),
            });
        }
        if self.judge_timeout_secs == 0 {
            return Err(SharedError::InvalidConfig {
                field: "judge_timeout_secs".to_string(),
                value: self.judge_timeout_secs.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.tie_credit) {
            return Err(SharedError::InvalidConfig {
                field: "tie_credit".to_string(),
                value: self.tie_credit.to_string(),
            });
        }
        Ok(())
    }
}
