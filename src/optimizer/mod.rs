//! Week-by-week schedule optimization.
//!
//! The optimizer never invents games: it takes each complete week
//! ("bucket" of `block_size` games), clears the team assignments while
//! preserving every slot's start, end, and rink exactly, and rebuilds the
//! week's own matchups in three phases:
//!
//! 1. Late consistency — late slots go to the matchups with the fewest
//!    late games so far, counted from the weeks already settled.
//! 2. Days-since fairness — remaining matchups place in order of longest
//!    wait, each into its best-scoring free slot.
//! 3. Conflict resolution — residual same-day collisions (within the
//!    week or against the previous week) resolve by pairwise swaps, then
//!    three-game rotations.
//!
//! A rebuild is kept only if it strictly reduces the full-schedule
//! objective; otherwise the week stays as it was. Week 1 anchors the
//! season and is never touched.
//!
//! # Modules
//! - [`score`]: the weighted objective
//! - [`days_since`]: standalone greedy re-sequencer for non-late slots

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use log::{debug, info};

use crate::error::{Result, ScheduleError};
use crate::models::{
    Game, Pairing, ResolvedParams, Schedule, ScheduleParams, Slot, Swap, SwapPhase,
};

mod days_since;
pub mod score;

pub use days_since::resequence_days_since;
pub use score::objective;

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    /// The optimized schedule; `None` on a dry run.
    pub schedule: Option<Schedule>,
    pub score_before: f64,
    pub score_after: f64,
    /// Slot-level changes, in application order.
    pub swaps: Vec<Swap>,
    /// 1-based week numbers that were rebuilt and accepted.
    pub weeks_optimized: Vec<usize>,
    /// Whether every optimizable week held a full block of games.
    pub all_weeks_complete: bool,
    /// Weeks eligible for optimization (everything past week 1).
    pub total_optimizable_weeks: usize,
}

/// Optimizes the schedule week by week.
///
/// `target_week` limits the run to a single 1-based week; `None` runs
/// every week past the first. On a dry run the outcome carries the swaps
/// and scores but `schedule` is `None` and the input is untouched.
///
/// # Errors
///
/// - [`ScheduleError::Structural`] for a target week out of range or
///   equal to 1 (the anchor week)
/// - [`ScheduleError::Timeout`] when the run exceeds its budget
pub fn optimize(
    schedule: &Schedule,
    params: &ScheduleParams,
    target_week: Option<usize>,
    dry_run: bool,
) -> Result<OptimizeOutcome> {
    let resolved = resolve_from_schedule(schedule, params);
    let bucket_count = schedule.bucket_count(resolved.block_size);
    let total_optimizable_weeks = bucket_count.saturating_sub(1);

    if let Some(week) = target_week {
        if week == 1 {
            return Err(ScheduleError::Structural(
                "week 1 anchors the season and is never optimized".to_string(),
            ));
        }
        if week == 0 || week > bucket_count {
            return Err(ScheduleError::Structural(format!(
                "target week {week} out of range (schedule has {bucket_count} week(s))"
            )));
        }
    }

    let started = Instant::now();
    let score_before = objective(schedule, &resolved);

    let mut working: Vec<Vec<Game>> = schedule
        .buckets(resolved.block_size)
        .into_iter()
        .map(<[Game]>::to_vec)
        .collect();

    let mut swaps = Vec::new();
    let mut weeks_optimized = Vec::new();
    let mut all_weeks_complete = true;
    let mut current_score = score_before;

    for bucket_idx in 1..working.len() {
        let week = bucket_idx + 1;
        if let Some(target) = target_week {
            if week != target {
                continue;
            }
        }
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > resolved.timeout_ms {
            return Err(ScheduleError::Timeout {
                elapsed_ms: elapsed,
                budget_ms: resolved.timeout_ms,
            });
        }

        if working[bucket_idx].len() < resolved.block_size {
            debug!(
                "week {week}: {} of {} games, skipping",
                working[bucket_idx].len(),
                resolved.block_size
            );
            all_weeks_complete = false;
            continue;
        }

        let prior: Vec<Game> = working[..bucket_idx].iter().flatten().cloned().collect();
        let prev_bucket = working[bucket_idx - 1].clone();
        let (rebuilt, phases) =
            rebuild_bucket(&working[bucket_idx], &prior, &prev_bucket, &resolved);

        let mut candidate = working.clone();
        candidate[bucket_idx] = rebuilt.clone();
        let candidate_schedule =
            Schedule::from_games(candidate.iter().flatten().cloned().collect());
        let candidate_score = objective(&candidate_schedule, &resolved);

        if candidate_score >= current_score {
            debug!(
                "week {week}: rebuild rejected ({candidate_score:.2} >= {current_score:.2})"
            );
            continue;
        }

        let changed: Vec<usize> = working[bucket_idx]
            .iter()
            .zip(&rebuilt)
            .enumerate()
            .filter(|(_, (old, new))| !old.pairing().same_matchup(&new.pairing())
                || old.home != new.home)
            .map(|(i, _)| i)
            .collect();
        if changed.is_empty() {
            continue;
        }
        let delta = (candidate_score - current_score) / changed.len() as f64;
        for &i in &changed {
            swaps.push(Swap {
                phase: phases[i],
                slot_id: rebuilt[i].slot.id.clone(),
                before: Some(working[bucket_idx][i].pairing()),
                after: rebuilt[i].pairing(),
                score_delta: delta,
            });
        }
        info!(
            "week {week}: {} slot(s) changed, objective {current_score:.2} -> {candidate_score:.2}",
            changed.len()
        );
        working = candidate;
        current_score = candidate_score;
        weeks_optimized.push(week);
    }

    let final_schedule = Schedule::from_games(working.into_iter().flatten().collect());
    Ok(OptimizeOutcome {
        schedule: (!dry_run).then_some(final_schedule),
        score_before,
        score_after: current_score,
        swaps,
        weeks_optimized,
        all_weeks_complete,
        total_optimizable_weeks,
    })
}

/// Derives resolved parameters from the schedule itself (distinct teams
/// per division), so the optimizer needs no separate roster input.
pub(crate) fn resolve_from_schedule(
    schedule: &Schedule,
    params: &ScheduleParams,
) -> ResolvedParams {
    let mut by_div: BTreeMap<String, HashSet<&str>> = BTreeMap::new();
    for game in schedule.games() {
        let entry = by_div.entry(game.division.clone()).or_default();
        entry.insert(game.home.as_str());
        entry.insert(game.away.as_str());
    }
    let counts: BTreeMap<String, usize> =
        by_div.into_iter().map(|(k, v)| (k, v.len())).collect();
    params.resolve(&counts)
}

/// Days since `team` last played before `on`; the configured sentinel if
/// it has never played.
pub(crate) fn days_since_last(team: &str, on: NaiveDate, prior: &[Game], sentinel: i64) -> i64 {
    prior
        .iter()
        .filter(|g| g.involves(team))
        .map(Game::date)
        .max()
        .map_or(sentinel, |d| (on - d).num_days())
}

/// Clears one bucket and rebuilds its own matchups across its own slots.
/// Returns the rebuilt games in slot order plus the phase that decided
/// each slot.
fn rebuild_bucket(
    bucket: &[Game],
    prior: &[Game],
    prev_bucket: &[Game],
    params: &ResolvedParams,
) -> (Vec<Game>, Vec<SwapPhase>) {
    let slots: Vec<Slot> = bucket.iter().map(|g| g.slot.clone()).collect();
    let matchups: Vec<Pairing> = bucket.iter().map(Game::pairing).collect();
    let week_start = slots
        .iter()
        .map(Slot::date)
        .min()
        .unwrap_or(NaiveDate::MIN);

    let mut placed: Vec<Option<usize>> = vec![None; slots.len()];
    let mut phases: Vec<SwapPhase> = vec![SwapPhase::Clearing; slots.len()];
    let mut unplaced: Vec<usize> = (0..matchups.len()).collect();

    // Phase 1: late slots, fewest-prior-lates matchups first.
    let lates = score::late_counts(prior.iter(), &params.eml);
    let late_slots: Vec<usize> = (0..slots.len())
        .filter(|&i| params.eml.is_late(slots[i].start))
        .collect();
    for &si in &late_slots {
        let Some(pos) = unplaced
            .iter()
            .enumerate()
            .min_by_key(|(_, &m)| {
                lates.get(&matchups[m].home).copied().unwrap_or(0)
                    + lates.get(&matchups[m].away).copied().unwrap_or(0)
            })
            .map(|(pos, _)| pos)
        else {
            break;
        };
        placed[si] = Some(unplaced.remove(pos));
        phases[si] = SwapPhase::LateConsistency;
    }

    // Phase 2: longest-waiting matchups into their best-scoring free slot.
    unplaced.sort_by_key(|&m| {
        let h = days_since_last(&matchups[m].home, week_start, prior, params.never_played_priority);
        let a = days_since_last(&matchups[m].away, week_start, prior, params.never_played_priority);
        (Reverse(h.max(a)), m)
    });
    for m in unplaced {
        let mut best: Option<usize> = None;
        let mut best_score = f64::NEG_INFINITY;
        for si in 0..slots.len() {
            if placed[si].is_some() {
                continue;
            }
            let s = slot_score(
                &slots[si],
                &matchups[m],
                week_start,
                &slots,
                &matchups,
                &placed,
                prev_bucket,
                prior,
                params,
            );
            if s > best_score {
                best_score = s;
                best = Some(si);
            }
        }
        if let Some(si) = best {
            placed[si] = Some(m);
            phases[si] = SwapPhase::DaysSince;
        }
    }

    let mut games: Vec<Game> = placed
        .iter()
        .zip(&slots)
        .filter_map(|(m, slot)| {
            m.map(|m| {
                let p = &matchups[m];
                Game::new(slot.clone(), p.division.clone(), p.home.clone(), p.away.clone())
            })
        })
        .collect();

    // Phase 3: resolve residual same-day collisions.
    for _ in 0..params.weights.max_passes {
        let before = conflict_indices(&games, prev_bucket).len();
        if before == 0 {
            break;
        }
        let resolved_any = resolve_conflicts(&mut games, prev_bucket, &mut phases);
        if !resolved_any {
            break;
        }
    }

    (games, phases)
}

/// Phase 2 slot score; higher is better. Early-week slots and teams with
/// long waits score up, same-day pile-ups score down hard.
#[allow(clippy::too_many_arguments)]
fn slot_score(
    slot: &Slot,
    matchup: &Pairing,
    week_start: NaiveDate,
    slots: &[Slot],
    matchups: &[Pairing],
    placed: &[Option<usize>],
    prev_bucket: &[Game],
    prior: &[Game],
    params: &ResolvedParams,
) -> f64 {
    let days_in = (slot.date() - week_start).num_days() as f64;
    let h = days_since_last(&matchup.home, slot.date(), prior, params.never_played_priority);
    let a = days_since_last(&matchup.away, slot.date(), prior, params.never_played_priority);

    let mut same_day = prev_bucket
        .iter()
        .filter(|g| {
            g.date() == slot.date() && (g.involves(&matchup.home) || g.involves(&matchup.away))
        })
        .count();
    for (si, m) in placed.iter().enumerate() {
        if let Some(m) = m {
            let p = &matchups[*m];
            if slots[si].date() == slot.date()
                && (p.involves(&matchup.home) || p.involves(&matchup.away))
            {
                same_day += 1;
            }
        }
    }

    100.0 + (7.0 - days_in) * 10.0 + h.min(a) as f64 * 5.0 - 20.0 * same_day as f64
}

/// Slots whose game collides on a calendar date, within the bucket or
/// against the previous one.
fn conflict_indices(games: &[Game], prev_bucket: &[Game]) -> Vec<usize> {
    let mut conflicted = HashSet::new();
    for i in 0..games.len() {
        for j in i + 1..games.len() {
            if games[i].date() != games[j].date() {
                continue;
            }
            for team in [&games[i].home, &games[i].away] {
                if games[j].involves(team) {
                    conflicted.insert(i);
                    conflicted.insert(j);
                }
            }
        }
        for prev in prev_bucket {
            if prev.date() == games[i].date()
                && (prev.involves(&games[i].home) || prev.involves(&games[i].away))
            {
                conflicted.insert(i);
            }
        }
    }
    let mut out: Vec<usize> = conflicted.into_iter().collect();
    out.sort_unstable();
    out
}

/// One pass of conflict resolution: pairwise swaps first, then
/// three-game rotations. Returns whether anything improved.
fn resolve_conflicts(games: &mut [Game], prev_bucket: &[Game], phases: &mut [SwapPhase]) -> bool {
    let baseline = conflict_indices(games, prev_bucket).len();
    let conflicted = conflict_indices(games, prev_bucket);

    for &i in &conflicted {
        // Pairwise: exchange the pairings of two slots.
        for j in 0..games.len() {
            if j == i {
                continue;
            }
            swap_pairings(games, i, j);
            if conflict_indices(games, prev_bucket).len() < baseline {
                phases[i] = SwapPhase::ConflictResolution;
                phases[j] = SwapPhase::ConflictResolution;
                return true;
            }
            swap_pairings(games, i, j); // undo
        }
    }

    for &i in &conflicted {
        // Rotation: i's pairing to j, j's to k, k's to i.
        for j in 0..games.len() {
            for k in 0..games.len() {
                if i == j || j == k || i == k {
                    continue;
                }
                rotate_pairings(games, i, j, k);
                if conflict_indices(games, prev_bucket).len() < baseline {
                    phases[i] = SwapPhase::ConflictResolution;
                    phases[j] = SwapPhase::ConflictResolution;
                    phases[k] = SwapPhase::ConflictResolution;
                    return true;
                }
                rotate_pairings(games, k, j, i); // undo
            }
        }
    }

    false
}

/// Exchanges the pairings of two slots in place.
pub(crate) fn swap_pairings(games: &mut [Game], i: usize, j: usize) {
    let pi = games[i].pairing();
    let pj = games[j].pairing();
    games[i] = Game::new(games[i].slot.clone(), pj.division, pj.home, pj.away);
    games[j] = Game::new(games[j].slot.clone(), pi.division, pi.home, pi.away);
}

/// Moves i's pairing to j, j's to k, and k's to i.
fn rotate_pairings(games: &mut [Game], i: usize, j: usize, k: usize) {
    let pi = games[i].pairing();
    let pj = games[j].pairing();
    let pk = games[k].pairing();
    games[j] = Game::new(games[j].slot.clone(), pi.division, pi.home, pi.away);
    games[k] = Game::new(games[k].slot.clone(), pj.division, pj.home, pj.away);
    games[i] = Game::new(games[i].slot.clone(), pk.division, pk.home, pk.away);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeSet;

    fn slot(id: &str, day: u32, hour: u32, minute: u32) -> Slot {
        let start = NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        Slot::new(id, start, start + Duration::minutes(80), "Rink A")
    }

    fn game(id: &str, day: u32, hour: u32, home: &str, away: &str) -> Game {
        Game::new(slot(id, day, hour, 45), "div4", home, away)
    }

    /// Two-week schedule where A/B hog both late slots.
    fn hoarded_schedule() -> Schedule {
        Schedule::from_games(vec![
            game("s1", 1, 22, "A", "B"), // week 1, late
            game("s2", 2, 20, "C", "D"),
            game("s3", 8, 22, "A", "B"), // week 2, late again
            game("s4", 9, 20, "C", "D"),
        ])
    }

    fn params() -> ScheduleParams {
        ScheduleParams::default()
            .with_games_per_team(2)
            .with_block_size(2)
    }

    #[test]
    fn test_week_one_never_touched() {
        let schedule = hoarded_schedule();
        let outcome = optimize(&schedule, &params(), None, false).unwrap();
        for swap in &outcome.swaps {
            assert_ne!(swap.slot_id, "s1");
            assert_ne!(swap.slot_id, "s2");
        }
    }

    #[test]
    fn test_late_slot_reassigned_to_fewest_lates() {
        let schedule = hoarded_schedule();
        let outcome = optimize(&schedule, &params(), None, false).unwrap();
        let optimized = outcome.schedule.unwrap();
        let late_game = optimized
            .games()
            .iter()
            .find(|g| g.slot.id == "s3")
            .unwrap();
        // C and D had no late games after week 1; they get the late slot.
        assert!(late_game.involves("C") && late_game.involves("D"));
        assert!(outcome.score_after <= outcome.score_before);
        assert_eq!(outcome.weeks_optimized, vec![2]);
    }

    #[test]
    fn test_slots_preserved_exactly() {
        let schedule = hoarded_schedule();
        let outcome = optimize(&schedule, &params(), None, false).unwrap();
        let optimized = outcome.schedule.unwrap();
        let before: BTreeSet<(String, _, _, String)> = schedule
            .games()
            .iter()
            .map(|g| (g.slot.id.clone(), g.slot.start, g.slot.end, g.slot.resource.clone()))
            .collect();
        let after: BTreeSet<(String, _, _, String)> = optimized
            .games()
            .iter()
            .map(|g| (g.slot.id.clone(), g.slot.start, g.slot.end, g.slot.resource.clone()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_score_never_increases() {
        let outcome = optimize(&hoarded_schedule(), &params(), None, false).unwrap();
        assert!(outcome.score_after <= outcome.score_before);
    }

    #[test]
    fn test_dry_run_returns_no_schedule() {
        let schedule = hoarded_schedule();
        let a = optimize(&schedule, &params(), None, true).unwrap();
        assert!(a.schedule.is_none());
        assert!(!a.swaps.is_empty());
        // Repeatable: a second dry run sees the untouched input.
        let b = optimize(&schedule, &params(), None, true).unwrap();
        assert_eq!(a.swaps, b.swaps);
        assert_eq!(a.score_after, b.score_after);
    }

    #[test]
    fn test_equal_score_rebuild_rejected() {
        // Symmetric two-week schedule: re-ordering week 2 leaves the
        // objective exactly where it was, so the rebuild is churn and
        // must be dropped.
        let schedule = Schedule::from_games(vec![
            game("s1", 1, 20, "A", "B"),
            game("s2", 2, 20, "C", "D"),
            game("s3", 8, 20, "C", "D"),
            game("s4", 9, 20, "A", "B"),
        ]);
        let outcome = optimize(&schedule, &params(), None, false).unwrap();
        assert!(outcome.swaps.is_empty());
        assert_eq!(outcome.score_after, outcome.score_before);
        assert_eq!(outcome.schedule.unwrap(), schedule);
    }

    #[test]
    fn test_target_week_one_rejected() {
        let err = optimize(&hoarded_schedule(), &params(), Some(1), false).unwrap_err();
        assert!(matches!(err, ScheduleError::Structural(_)));
    }

    #[test]
    fn test_target_week_out_of_range() {
        let err = optimize(&hoarded_schedule(), &params(), Some(9), false).unwrap_err();
        assert!(matches!(err, ScheduleError::Structural(_)));
    }

    #[test]
    fn test_incomplete_week_skipped() {
        let schedule = Schedule::from_games(vec![
            game("s1", 1, 22, "A", "B"),
            game("s2", 2, 20, "C", "D"),
            game("s3", 8, 22, "A", "B"), // lone game, partial week
        ]);
        let outcome = optimize(&schedule, &params(), None, false).unwrap();
        assert!(!outcome.all_weeks_complete);
        assert!(outcome.swaps.is_empty());
    }

    #[test]
    fn test_optimizable_week_count() {
        let outcome = optimize(&hoarded_schedule(), &params(), None, true).unwrap();
        assert_eq!(outcome.total_optimizable_weeks, 1);
    }

    #[test]
    fn test_days_since_sentinel_for_new_team() {
        let on = NaiveDate::from_ymd_opt(2025, 9, 8).unwrap();
        assert_eq!(days_since_last("Z", on, &[], 999), 999);
        let prior = vec![game("s1", 1, 20, "A", "B")];
        assert_eq!(days_since_last("A", on, &prior, 999), 7);
    }

    #[test]
    fn test_conflict_detection_spans_previous_bucket() {
        let prev = vec![game("p1", 7, 20, "A", "B")];
        let games = vec![game("s1", 7, 22, "A", "C"), game("s2", 8, 20, "B", "D")];
        let conflicts = conflict_indices(&games, &prev);
        assert_eq!(conflicts, vec![0]); // A already plays on the 7th
    }

    #[test]
    fn test_pairwise_swap_resolves_conflict() {
        // B plays twice on day 8; swapping slot pairings fixes it.
        let prev = vec![game("p1", 8, 20, "B", "E")];
        let mut games = vec![game("s1", 8, 22, "A", "B"), game("s2", 9, 20, "C", "D")];
        let mut phases = vec![SwapPhase::Clearing; 2];
        assert!(resolve_conflicts(&mut games, &prev, &mut phases));
        assert!(conflict_indices(&games, &prev).is_empty());
    }
}
