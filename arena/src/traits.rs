//! Arena trait definitions for dependency injection

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ArenaResult;
use crate::types::{JudgeReply, JudgeRequest};
use shared::{JudgeFailure, Participant, Submission};

/// One raw comparison call to an external judge.
///
/// Implementations make exactly one attempt; timeout, retry and verdict
/// parsing policy belong to the adapter layer above.
#[mockall::automock]
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    /// Send a single comparison request and return the raw reply text
    async fn send_comparison(&self, request: JudgeRequest) -> Result<JudgeReply, JudgeFailure>;
}

/// Source of participants and their submission content
#[mockall::automock]
#[async_trait]
pub trait SubmissionProvider: Send + Sync {
    /// All participants this provider knows about
    async fn participants(&self) -> ArenaResult<Vec<Participant>>;

    /// Submission content for one participant
    async fn submission(&self, participant: Uuid) -> ArenaResult<Submission>;
}
