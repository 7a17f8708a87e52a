//! Arena service implementations

pub mod judge_client;
pub mod submissions;

#[cfg(test)]
pub mod tests;

pub use judge_client::*;
pub use submissions::*;
