//! Shared types for the AI-judged tournament arena
//!
//! Contains the domain model shared between the engine core and its
//! services, plus error and logging utilities. Engine logic lives in the
//! `arena` crate.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
