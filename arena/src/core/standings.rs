//! Standings aggregation
//!
//! A pure function of the match log: recomputed fresh on every call, never
//! mutated in place, so live standings stay consistent with the
//! authoritative log even while later rounds are still running.

use std::collections::HashMap;
use std::cmp::Ordering;
use uuid::Uuid;

use shared::{Match, MatchStatus, Participant, StandingEntry};

/// Fold the completed matches into ranked standings.
///
/// Failed matches are excluded from both sides' tallies. Ties award each
/// side `tie_credit` of a win. Ranking is a total order: wins descending,
/// then average judge score, then head-to-head among the tied pair, then
/// participant id ascending.
pub fn compute(participants: &[Participant], matches: &[Match], tie_credit: f64) -> Vec<StandingEntry> {
    let mut entries: HashMap<Uuid, StandingEntry> = participants
        .iter()
        .map(|p| {
            (
                p.id,
                StandingEntry {
                    participant_id: p.id,
                    name: p.name.clone(),
                    wins: 0.0,
                    losses: 0.0,
                    ties: 0,
                    played: 0,
                    average_score: 0.0,
                    rank: 0,
                },
            )
        })
        .collect();

    let mut score_totals: HashMap<Uuid, (f64, u32)> = HashMap::new();

    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        let Some(result) = &m.result else { continue };

        for &pid in &m.participants {
            let Some(entry) = entries.get_mut(&pid) else { continue };
            entry.played += 1;

            let totals = score_totals.entry(pid).or_insert((0.0, 0));
            totals.0 += result.verdict.score_of(pid);
            totals.1 += 1;

            match result.verdict.winner() {
                Some(winner) if winner == pid => entry.wins += 1.0,
                Some(_) => entry.losses += 1.0,
                None => {
                    entry.wins += tie_credit;
                    entry.ties += 1;
                }
            }
        }
    }

    for (pid, (sum, count)) in score_totals {
        if let Some(entry) = entries.get_mut(&pid) {
            entry.average_score = sum / count as f64;
        }
    }

    let head_to_head = pairwise_net_wins(matches);

    let mut ranked: Vec<StandingEntry> = entries.into_values().collect();
    ranked.sort_by(|a, b| {
        b.wins
            .total_cmp(&a.wins)
            .then(b.average_score.total_cmp(&a.average_score))
            .then_with(|| head_to_head_ordering(&head_to_head, a.participant_id, b.participant_id))
            .then(a.participant_id.cmp(&b.participant_id))
    });

    for (index, entry) in ranked.iter_mut().enumerate() {
        entry.rank = index as u32 + 1;
    }
    ranked
}

/// Net head-to-head wins per ordered pair, from completed two-sided
/// decision matches
fn pairwise_net_wins(matches: &[Match]) -> HashMap<(Uuid, Uuid), i32> {
    let mut net: HashMap<(Uuid, Uuid), i32> = HashMap::new();
    for m in matches {
        if m.participants.len() != 2 {
            continue;
        }
        if let Some(winner) = m.winner() {
            let loser = if m.participants[0] == winner {
                m.participants[1]
            } else {
                m.participants[0]
            };
            *net.entry((winner, loser)).or_insert(0) += 1;
            *net.entry((loser, winner)).or_insert(0) -= 1;
        }
    }
    net
}

fn head_to_head_ordering(net: &HashMap<(Uuid, Uuid), i32>, a: Uuid, b: Uuid) -> Ordering {
    match net.get(&(a, b)).copied().unwrap_or(0) {
        n if n > 0 => Ordering::Less,
        n if n < 0 => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
