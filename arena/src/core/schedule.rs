//! Match schedule generation for all tournament formats
//!
//! Every plan is a pure function of the participant set, the match log so
//! far, and the configured seed. Bracket linkage is recomputed from the
//! round-indexed log each time instead of being threaded through
//! winner-of-match pointers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use shared::{Match, MatchStatus, Participant, RoundPlan, TournamentFormat};

/// Lives a participant starts with in double elimination
const DOUBLE_ELIMINATION_LIVES: u32 = 2;

/// Generate the next round for a tournament, or `None` once the format's
/// completion condition holds.
///
/// `history` is the full append-only match log; rounds present in it are
/// assumed resolved (every elimination match has a deterministic advancer,
/// see [`resolve_advancer`]).
pub fn next_round(
    tournament_id: Uuid,
    participants: &[Participant],
    format: TournamentFormat,
    history: &[Match],
    seed: Option<u64>,
) -> ArenaResult<Option<RoundPlan>> {
    if participants.len() < 2 {
        return Err(ArenaError::InvalidFormatInput {
            message: format!(
                "{format} needs at least 2 participants, got {}",
                participants.len()
            ),
        });
    }

    let round = history.iter().map(|m| m.round).max().unwrap_or(0) + 1;

    match format {
        TournamentFormat::RoundRobin => {
            // All pairs are known upfront; a single round covers the format
            if !history.is_empty() {
                return Ok(None);
            }
            Ok(Some(round_robin_plan(tournament_id, participants)))
        }
        TournamentFormat::SingleElimination => {
            let losses = loss_counts(participants, history);
            let alive = seeding_order(participants, seed)
                .into_iter()
                .filter(|p| losses.get(&p.id).copied().unwrap_or(0) == 0)
                .collect::<Vec<_>>();

            if alive.len() <= 1 {
                return Ok(None);
            }
            Ok(Some(bracket_plan(tournament_id, round, &alive)))
        }
        TournamentFormat::DoubleElimination => {
            let losses = loss_counts(participants, history);
            let order = seeding_order(participants, seed);
            let alive = order
                .iter()
                .filter(|p| losses.get(&p.id).copied().unwrap_or(0) < DOUBLE_ELIMINATION_LIVES)
                .collect::<Vec<_>>();

            if alive.len() <= 1 {
                return Ok(None);
            }

            let winners: Vec<&Participant> = alive
                .iter()
                .filter(|p| losses.get(&p.id).copied().unwrap_or(0) == 0)
                .copied()
                .collect();
            let losers: Vec<&Participant> = alive
                .iter()
                .filter(|p| losses.get(&p.id).copied().unwrap_or(0) == 1)
                .copied()
                .collect();

            // Grand final once each bracket is down to one participant
            if winners.len() == 1 && losers.len() == 1 {
                let matches = vec![Match::new(
                    tournament_id,
                    round,
                    vec![winners[0].id, losers[0].id],
                )];
                return Ok(Some(RoundPlan {
                    round,
                    matches,
                    byes: Vec::new(),
                }));
            }

            let mut matches = Vec::new();
            let mut byes = Vec::new();
            pair_within_bracket(tournament_id, round, &winners, &mut matches, &mut byes);
            pair_within_bracket(tournament_id, round, &losers, &mut matches, &mut byes);

            Ok(Some(RoundPlan { round, matches, byes }))
        }
    }
}

/// Every unordered pair of distinct participants exactly once, in a single
/// round, ordered by the input participant ordering
fn round_robin_plan(tournament_id: Uuid, participants: &[Participant]) -> RoundPlan {
    let mut matches = Vec::with_capacity(participants.len() * (participants.len() - 1) / 2);
    for (i, first) in participants.iter().enumerate() {
        for second in participants.iter().skip(i + 1) {
            matches.push(Match::new(tournament_id, 1, vec![first.id, second.id]));
        }
    }
    RoundPlan {
        round: 1,
        matches,
        byes: Vec::new(),
    }
}

/// Pair bracket entrants adjacently, padding to the next power of two with
/// byes drawn for the highest-seeded entrants first
fn bracket_plan(tournament_id: Uuid, round: u32, entrants: &[Participant]) -> RoundPlan {
    let slots = entrants.len().next_power_of_two();
    let bye_count = slots - entrants.len();

    let byes: Vec<Uuid> = entrants[..bye_count].iter().map(|p| p.id).collect();
    let matches = entrants[bye_count..]
        .chunks(2)
        .map(|pair| Match::new(tournament_id, round, vec![pair[0].id, pair[1].id]))
        .collect();

    RoundPlan { round, matches, byes }
}

/// Pair entrants of one double-elimination bracket among themselves; an odd
/// entrant count leaves the highest seed with a bye
fn pair_within_bracket(
    tournament_id: Uuid,
    round: u32,
    entrants: &[&Participant],
    matches: &mut Vec<Match>,
    byes: &mut Vec<Uuid>,
) {
    let offset = entrants.len() % 2;
    byes.extend(entrants[..offset].iter().map(|p| p.id));
    for pair in entrants[offset..].chunks(2) {
        matches.push(Match::new(tournament_id, round, vec![pair[0].id, pair[1].id]));
    }
}

/// Deterministic seeding order: seed weight descending, remaining ties
/// broken by a seeded draw when a seed is configured, by input order
/// otherwise
pub fn seeding_order(participants: &[Participant], seed: Option<u64>) -> Vec<Participant> {
    match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut keyed: Vec<(u32, u64, &Participant)> = participants
                .iter()
                .map(|p| (p.seed_weight, rng.gen::<u64>(), p))
                .collect();
            keyed.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            keyed.into_iter().map(|(_, _, p)| p.clone()).collect()
        }
        None => {
            let mut ordered: Vec<&Participant> = participants.iter().collect();
            ordered.sort_by(|a, b| b.seed_weight.cmp(&a.seed_weight));
            ordered.into_iter().cloned().collect()
        }
    }
}

/// Resolved losses per participant across the whole match log.
///
/// Every resolved match costs exactly one participant one life, including
/// ties and failed matches, which are settled by [`resolve_advancer`] so a
/// bracket is never left waiting on an unresolved slot.
fn loss_counts(participants: &[Participant], history: &[Match]) -> HashMap<Uuid, u32> {
    let scores = aggregate_scores(history);
    let mut losses: HashMap<Uuid, u32> = HashMap::new();

    for m in history {
        if m.status == MatchStatus::Pending || m.status == MatchStatus::Running {
            continue;
        }
        let advancer = resolve_advancer(m, &scores);
        for pid in &m.participants {
            if *pid != advancer {
                *losses.entry(*pid).or_insert(0) += 1;
            }
        }
    }

    // Participants absent from the log have played nothing yet
    for p in participants {
        losses.entry(p.id).or_insert(0);
    }
    losses
}

/// Deterministic advancer for a bracket match.
///
/// A declared winner advances. A tie is settled by verdict score, then
/// aggregate score across the log, then ascending participant id. A failed
/// match falls straight to aggregate score, then id.
pub fn resolve_advancer(m: &Match, aggregate: &HashMap<Uuid, f64>) -> Uuid {
    if let Some(winner) = m.winner() {
        return winner;
    }

    let verdict_score = |pid: Uuid| -> f64 {
        m.result
            .as_ref()
            .map(|r| r.verdict.score_of(pid))
            .unwrap_or(0.0)
    };
    let aggregate_score = |pid: Uuid| -> f64 { aggregate.get(&pid).copied().unwrap_or(0.0) };

    let mut best = m.participants[0];
    for &pid in &m.participants[1..] {
        let ordering = verdict_score(pid)
            .total_cmp(&verdict_score(best))
            .then(aggregate_score(pid).total_cmp(&aggregate_score(best)))
            .then(best.cmp(&pid));
        if ordering == std::cmp::Ordering::Greater {
            best = pid;
        }
    }
    best
}

/// Sole survivor of an elimination bracket, if the log has one.
///
/// Round robin has no bracket champion; its winner comes from standings.
pub fn champion(
    participants: &[Participant],
    format: TournamentFormat,
    history: &[Match],
) -> Option<Uuid> {
    let lives = match format {
        TournamentFormat::RoundRobin => return None,
        TournamentFormat::SingleElimination => 1,
        TournamentFormat::DoubleElimination => DOUBLE_ELIMINATION_LIVES,
    };
    let losses = loss_counts(participants, history);
    let alive: Vec<Uuid> = participants
        .iter()
        .map(|p| p.id)
        .filter(|id| losses.get(id).copied().unwrap_or(0) < lives)
        .collect();
    match alive.as_slice() {
        [sole] => Some(*sole),
        _ => None,
    }
}

/// Mean judge score per participant over all completed matches
pub fn aggregate_scores(history: &[Match]) -> HashMap<Uuid, f64> {
    let mut totals: HashMap<Uuid, (f64, u32)> = HashMap::new();
    for m in history {
        if m.status != MatchStatus::Completed {
            continue;
        }
        if let Some(result) = &m.result {
            for pid in &m.participants {
                let entry = totals.entry(*pid).or_insert((0.0, 0));
                entry.0 += result.verdict.score_of(*pid);
                entry.1 += 1;
            }
        }
    }
    totals
        .into_iter()
        .map(|(pid, (sum, count))| (pid, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MatchResult, Verdict};
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<Participant> {
        (0..n).map(|i| Participant::new(format!("participant_{i}"))).collect()
    }

    /// Complete every match in a plan with a fixed winner rule
    fn play_round(plan: &RoundPlan, prefer: impl Fn(&[Uuid]) -> Uuid) -> Vec<Match> {
        plan.matches
            .iter()
            .cloned()
            .map(|mut m| {
                let winner = prefer(&m.participants);
                let scores = m
                    .participants
                    .iter()
                    .map(|&pid| (pid, if pid == winner { 3.5 } else { 2.0 }))
                    .collect();
                m.status = MatchStatus::Completed;
                m.result = Some(MatchResult::new(
                    Verdict::Decision {
                        winner,
                        scores,
                        rationale: "stronger pitch".to_string(),
                    },
                    "test_model",
                ));
                m
            })
            .collect()
    }

    #[test]
    fn test_round_robin_pair_count() {
        for n in 2..=8 {
            let participants = roster(n);
            let plan = next_round(Uuid::new_v4(), &participants, TournamentFormat::RoundRobin, &[], None)
                .unwrap()
                .unwrap();
            assert_eq!(plan.matches.len(), n * (n - 1) / 2);

            let mut pairs = HashSet::new();
            for m in &plan.matches {
                assert_eq!(m.participants.len(), 2);
                let mut pair = [m.participants[0], m.participants[1]];
                pair.sort();
                assert!(pairs.insert(pair), "pair scheduled twice");
            }
        }
    }

    #[test]
    fn test_round_robin_single_round_then_terminal() {
        let participants = roster(4);
        let tid = Uuid::new_v4();
        let plan = next_round(tid, &participants, TournamentFormat::RoundRobin, &[], None)
            .unwrap()
            .unwrap();
        assert_eq!(plan.round, 1);

        let played = play_round(&plan, |ids| ids[0]);
        let next = next_round(tid, &participants, TournamentFormat::RoundRobin, &played, None).unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_too_few_participants_rejected() {
        for format in [
            TournamentFormat::RoundRobin,
            TournamentFormat::SingleElimination,
            TournamentFormat::DoubleElimination,
        ] {
            let result = next_round(Uuid::new_v4(), &roster(1), format, &[], None);
            assert!(matches!(result, Err(ArenaError::InvalidFormatInput { .. })));
        }
    }

    #[test]
    fn test_single_elimination_round_count() {
        for n in [2usize, 3, 4, 5, 6, 8, 9] {
            let participants = roster(n);
            let tid = Uuid::new_v4();
            let mut history: Vec<Match> = Vec::new();
            let mut rounds = 0;

            while let Some(plan) =
                next_round(tid, &participants, TournamentFormat::SingleElimination, &history, Some(7)).unwrap()
            {
                rounds += 1;
                assert!(rounds <= 10, "bracket failed to converge for n={n}");
                history.extend(play_round(&plan, |ids| *ids.iter().min().unwrap()));
            }

            let expected = (n as f64).log2().ceil() as u32;
            assert_eq!(rounds, expected, "wrong round count for n={n}");
        }
    }

    #[test]
    fn test_single_elimination_one_undefeated_finalist() {
        let participants = roster(8);
        let tid = Uuid::new_v4();
        let mut history: Vec<Match> = Vec::new();

        while let Some(plan) =
            next_round(tid, &participants, TournamentFormat::SingleElimination, &history, None).unwrap()
        {
            history.extend(play_round(&plan, |ids| *ids.iter().min().unwrap()));
        }

        let losses = loss_counts(&participants, &history);
        let undefeated: Vec<_> = participants
            .iter()
            .filter(|p| losses[&p.id] == 0)
            .collect();
        assert_eq!(undefeated.len(), 1);
    }

    #[test]
    fn test_single_elimination_byes_go_to_highest_seeds() {
        // 5 entrants pad to 8: three byes, drawn for the top seeds
        let participants: Vec<Participant> = (0..5)
            .map(|i| Participant::new(format!("p{i}")).with_seed_weight(10 - i))
            .collect();
        let plan = next_round(
            Uuid::new_v4(),
            &participants,
            TournamentFormat::SingleElimination,
            &[],
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(plan.byes.len(), 3);
        assert_eq!(plan.matches.len(), 1);
        let top_three: HashSet<Uuid> = participants[..3].iter().map(|p| p.id).collect();
        assert_eq!(plan.byes.iter().copied().collect::<HashSet<_>>(), top_three);
    }

    #[test]
    fn test_seeding_order_deterministic_for_fixed_seed() {
        let participants = roster(8);
        let first = seeding_order(&participants, Some(42));
        let second = seeding_order(&participants, Some(42));

        let ids = |v: &[Participant]| v.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        // Still a permutation of the same roster
        assert_eq!(
            ids(&first).into_iter().collect::<HashSet<_>>(),
            participants.iter().map(|p| p.id).collect::<HashSet<_>>()
        );
    }

    #[test]
    fn test_double_elimination_needs_two_losses() {
        let participants = roster(4);
        let tid = Uuid::new_v4();
        let mut history: Vec<Match> = Vec::new();

        while let Some(plan) =
            next_round(tid, &participants, TournamentFormat::DoubleElimination, &history, Some(3)).unwrap()
        {
            assert!(history.iter().map(|m| m.round).max().unwrap_or(0) < 20);
            history.extend(play_round(&plan, |ids| *ids.iter().min().unwrap()));
        }

        let losses = loss_counts(&participants, &history);
        let alive: Vec<_> = participants.iter().filter(|p| losses[&p.id] < 2).collect();
        assert_eq!(alive.len(), 1, "exactly one participant keeps a life");
        for p in &participants {
            if p.id != alive[0].id {
                assert_eq!(losses[&p.id], 2, "eliminated participants lose exactly twice");
            }
        }
    }

    #[test]
    fn test_double_elimination_loser_drops_not_out() {
        let participants = roster(4);
        let tid = Uuid::new_v4();
        let plan = next_round(tid, &participants, TournamentFormat::DoubleElimination, &[], None)
            .unwrap()
            .unwrap();
        assert_eq!(plan.matches.len(), 2);

        let history = play_round(&plan, |ids| *ids.iter().min().unwrap());
        let round_one_losers: HashSet<Uuid> = history
            .iter()
            .flat_map(|m| {
                let winner = m.winner().unwrap();
                m.participants.iter().copied().filter(move |&p| p != winner)
            })
            .collect();

        // Both round-one losers must reappear in round two's losers bracket
        let next = next_round(tid, &participants, TournamentFormat::DoubleElimination, &history, None)
            .unwrap()
            .unwrap();
        let scheduled: HashSet<Uuid> = next
            .matches
            .iter()
            .flat_map(|m| m.participants.iter().copied())
            .chain(next.byes.iter().copied())
            .collect();
        for loser in round_one_losers {
            assert!(scheduled.contains(&loser));
        }
    }

    #[test]
    fn test_tie_resolution_prefers_verdict_then_aggregate_then_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut m = Match::new(Uuid::new_v4(), 1, vec![a, b]);
        m.status = MatchStatus::Completed;
        m.result = Some(MatchResult::new(
            Verdict::Tie {
                scores: [(a, 3.0), (b, 2.5)].into(),
                rationale: "close call".to_string(),
            },
            "test_model",
        ));
        assert_eq!(resolve_advancer(&m, &HashMap::new()), a);

        // Equal verdict scores fall through to the aggregate index
        m.result = Some(MatchResult::new(
            Verdict::Tie {
                scores: [(a, 3.0), (b, 3.0)].into(),
                rationale: "dead even".to_string(),
            },
            "test_model",
        ));
        let aggregate = HashMap::from([(a, 2.0), (b, 3.1)]);
        assert_eq!(resolve_advancer(&m, &aggregate), b);

        // Full tie falls back to ascending id
        let expected = a.min(b);
        assert_eq!(resolve_advancer(&m, &HashMap::new()), expected);
    }

    #[test]
    fn test_failed_match_resolved_by_aggregate_score() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut m = Match::new(Uuid::new_v4(), 2, vec![a, b]);
        m.status = MatchStatus::Failed;

        let aggregate = HashMap::from([(a, 1.5), (b, 3.5)]);
        assert_eq!(resolve_advancer(&m, &aggregate), b);
    }
}
