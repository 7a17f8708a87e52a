//! Arena-specific data types

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use shared::{Participant, Submission};

/// A single raw request to the judge backend.
///
/// Carries both the rendered prompt (what an HTTP backend sends) and the
/// structured entries (what an offline backend scores from), so either kind
/// of backend can serve it.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub match_id: Uuid,
    pub prompt: String,
    pub entries: Vec<JudgeEntry>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Per-participant metadata visible to the backend
#[derive(Debug, Clone)]
pub struct JudgeEntry {
    pub participant_id: Uuid,
    pub name: String,
    pub word_count: usize,
}

/// Raw reply from a judge backend, before verdict parsing
#[derive(Debug, Clone)]
pub struct JudgeReply {
    pub content: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub response_time: Duration,
}

/// Everything the judge adapter needs to evaluate one match
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub match_id: Uuid,
    pub round: u32,
    pub entries: Vec<(Participant, Submission)>,
}

impl MatchContext {
    pub fn participant_ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|(p, _)| p.id).collect()
    }
}

/// Cooperative cancellation flag shared between the caller and a running
/// round. Honored between match dispatches, never mid-call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
