//! AI-judged tournament arena engine
//!
//! Ranks text submissions by repeatedly asking an external AI judge to
//! compare pairs and folding the pairwise outcomes into standings. The
//! engine schedules matches for round-robin and elimination formats, runs
//! judging calls under a bounded concurrency budget with retry and timeout
//! handling, and recomputes rankings from the append-only match log.

pub mod core;
pub mod error;
pub mod services;
pub mod state;
pub mod traits;
pub mod types;

// Re-export main types
pub use crate::core::{MatchExecutor, PromptBuilder, RoundCoordinator, TournamentEngine};
pub use error::{ArenaError, ArenaResult};
pub use state::TournamentRegistry;
pub use traits::*;
pub use types::*;
