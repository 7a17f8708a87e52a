//! Tournament registry
//!
//! An owned map of running tournaments passed to the orchestration layer.
//! The engine itself holds no global state; everything lives here, by
//! explicit reference.

use std::collections::HashMap;
use uuid::Uuid;

use shared::Tournament;

#[derive(Debug, Default)]
pub struct TournamentRegistry {
    tournaments: HashMap<Uuid, Tournament>,
}

impl TournamentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tournament, returning its id
    pub fn insert(&mut self, tournament: Tournament) -> Uuid {
        let id = tournament.id;
        self.tournaments.insert(id, tournament);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&Tournament> {
        self.tournaments.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Tournament> {
        self.tournaments.get_mut(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Tournament> {
        self.tournaments.remove(&id)
    }

    /// All registered tournaments, newest first
    pub fn list(&self) -> Vec<&Tournament> {
        let mut all: Vec<&Tournament> = self.tournaments.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn len(&self) -> usize {
        self.tournaments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tournaments.is_empty()
    }
}
