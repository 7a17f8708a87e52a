//! Arena engine error types

use shared::{FailureKind, JudgeFailure, SharedError};
use thiserror::Error;
use uuid::Uuid;

/// Result type for arena operations
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena engine error taxonomy.
///
/// Match-level failures (`InvalidSubmission`, `JudgeUnavailable`,
/// `MalformedVerdict`) are recorded on the match and never abort a round;
/// `InvalidFormatInput` and `InvalidConfig` are fatal before any match runs.
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("invalid format input: {message}")]
    InvalidFormatInput { message: String },

    #[error("invalid submission from participant {participant}: {reason}")]
    InvalidSubmission { participant: Uuid, reason: String },

    #[error("judge unavailable after {attempts} attempt(s): {last}")]
    JudgeUnavailable { attempts: u32, last: JudgeFailure },

    #[error("malformed verdict: {detail}")]
    MalformedVerdict { detail: String, raw: String },

    #[error("tournament {id} is already terminal")]
    TournamentComplete { id: Uuid },

    #[error("configuration error: {0}")]
    InvalidConfig(#[from] SharedError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ArenaError {
    /// Translate a match-level error into the failure recorded on the match.
    /// Fatal error kinds have no match-level representation and map to an
    /// internal failure if they ever reach a match.
    pub fn to_failure_kind(&self) -> FailureKind {
        match self {
            ArenaError::InvalidSubmission { participant, reason } => FailureKind::InvalidSubmission {
                participant: *participant,
                reason: reason.clone(),
            },
            ArenaError::JudgeUnavailable { attempts, last } => FailureKind::JudgeUnavailable {
                attempts: *attempts,
                last: last.clone(),
            },
            ArenaError::MalformedVerdict { detail, .. } => FailureKind::MalformedVerdict {
                detail: detail.clone(),
            },
            other => FailureKind::Internal {
                detail: other.to_string(),
            },
        }
    }
}
