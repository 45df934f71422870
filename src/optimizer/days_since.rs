//! Greedy re-sequencer for non-late slots.
//!
//! A lighter pass than the full rebuild: within each week it takes only
//! the matchups sitting in non-late slots and re-orders them so the teams
//! that have waited longest play earliest. Late slots are left exactly
//! where Phase 1 of the optimizer put them. Matchups move wholesale (slot
//! assignments permute, nothing is re-paired), so the pass is idempotent:
//! running it twice produces no further swaps. Week 1 anchors the season
//! and is never re-sequenced.

use std::cmp::Reverse;
use std::time::Instant;

use log::debug;

use crate::error::{Result, ScheduleError};
use crate::models::{Game, Schedule, ScheduleParams, Swap, SwapPhase};

use super::score::objective;
use super::{days_since_last, resolve_from_schedule, OptimizeOutcome};

/// Re-orders each week's non-late matchups by days-since-last-played.
///
/// `target_week` limits the pass to a single 1-based week; `None` runs
/// every week past the first.
///
/// # Errors
///
/// - [`ScheduleError::Structural`] for a target week out of range or
///   equal to 1 (the anchor week)
/// - [`ScheduleError::Timeout`] when the run exceeds its budget
pub fn resequence_days_since(
    schedule: &Schedule,
    params: &ScheduleParams,
    target_week: Option<usize>,
) -> Result<OptimizeOutcome> {
    let resolved = resolve_from_schedule(schedule, params);
    let started = Instant::now();
    let score_before = objective(schedule, &resolved);

    let mut working: Vec<Vec<Game>> = schedule
        .buckets(resolved.block_size)
        .into_iter()
        .map(<[Game]>::to_vec)
        .collect();
    let bucket_count = working.len();

    if let Some(week) = target_week {
        if week == 1 {
            return Err(ScheduleError::Structural(
                "week 1 anchors the season and is never re-sequenced".to_string(),
            ));
        }
        if week == 0 || week > bucket_count {
            return Err(ScheduleError::Structural(format!(
                "target week {week} out of range (schedule has {bucket_count} week(s))"
            )));
        }
    }

    let mut swaps = Vec::new();
    let mut weeks_optimized = Vec::new();
    let mut all_weeks_complete = true;

    for bucket_idx in 1..bucket_count {
        if let Some(week) = target_week {
            if bucket_idx + 1 != week {
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
            all_weeks_complete = false;
        }

        let prior: Vec<Game> = working[..bucket_idx].iter().flatten().cloned().collect();
        let prev_bucket: Vec<Game> = if bucket_idx > 0 {
            working[bucket_idx - 1].clone()
        } else {
            Vec::new()
        };
        let bucket = &working[bucket_idx];

        // Non-late slots only; the late assignments are someone else's
        // fairness problem.
        let open: Vec<usize> = (0..bucket.len())
            .filter(|&i| !resolved.eml.is_late(bucket[i].slot.start))
            .collect();
        if open.len() < 2 {
            continue;
        }
        let week_start = match bucket.iter().map(Game::date).min() {
            Some(d) => d,
            None => continue,
        };

        // Longest-waiting matchups first; current position breaks ties so
        // a settled week stays settled.
        let mut priority: Vec<usize> = open.clone();
        priority.sort_by_key(|&i| {
            let g = &bucket[i];
            let h = days_since_last(&g.home, week_start, &prior, resolved.never_played_priority);
            let a = days_since_last(&g.away, week_start, &prior, resolved.never_played_priority);
            (Reverse(h.max(a)), i)
        });

        // Greedy: each matchup takes the earliest free non-late slot that
        // creates no same-day collision.
        let mut claimed = vec![false; open.len()];
        let mut assignment: Vec<Option<usize>> = vec![None; open.len()]; // open pos -> game idx
        for &gi in &priority {
            let mut chosen = None;
            for (pos, &si) in open.iter().enumerate() {
                if claimed[pos] {
                    continue;
                }
                if !creates_collision(&bucket[gi], &bucket[si].slot, bucket, &open, &assignment, &prev_bucket)
                {
                    chosen = Some(pos);
                    break;
                }
            }
            let pos = match chosen {
                Some(pos) => pos,
                // Nothing conflict-free; take the earliest free slot.
                None => match claimed.iter().position(|&c| !c) {
                    Some(pos) => pos,
                    None => break,
                },
            };
            claimed[pos] = true;
            assignment[pos] = Some(gi);
        }

        let mut rebuilt = bucket.clone();
        let mut changed = false;
        for (pos, &si) in open.iter().enumerate() {
            if let Some(gi) = assignment[pos] {
                if gi != si {
                    let source = &bucket[gi];
                    rebuilt[si] = Game::new(
                        bucket[si].slot.clone(),
                        source.division.clone(),
                        source.home.clone(),
                        source.away.clone(),
                    );
                    changed = true;
                }
            }
        }
        if !changed {
            continue;
        }

        for (old, new) in working[bucket_idx].iter().zip(&rebuilt) {
            if old.pairing() != new.pairing() {
                swaps.push(Swap {
                    phase: SwapPhase::Resequence,
                    slot_id: new.slot.id.clone(),
                    before: Some(old.pairing()),
                    after: new.pairing(),
                    score_delta: 0.0,
                });
            }
        }
        debug!("week {}: re-sequenced non-late slots", bucket_idx + 1);
        weeks_optimized.push(bucket_idx + 1);
        working[bucket_idx] = rebuilt;
    }

    let final_schedule = Schedule::from_games(working.into_iter().flatten().collect());
    let score_after = objective(&final_schedule, &resolved);
    Ok(OptimizeOutcome {
        schedule: Some(final_schedule),
        score_before,
        score_after,
        swaps,
        weeks_optimized,
        all_weeks_complete,
        total_optimizable_weeks: bucket_count.saturating_sub(1),
    })
}

/// Whether putting `matchup`'s teams into `slot` collides on a date with
/// the week's late games, the matchups already re-assigned, or the
/// previous week.
fn creates_collision(
    matchup: &Game,
    slot: &crate::models::Slot,
    bucket: &[Game],
    open: &[usize],
    assignment: &[Option<usize>],
    prev_bucket: &[Game],
) -> bool {
    let date = slot.date();
    let involves = |g: &Game| g.involves(&matchup.home) || g.involves(&matchup.away);

    // Fixed late games in this week.
    for (i, g) in bucket.iter().enumerate() {
        if !open.contains(&i) && g.date() == date && involves(g) {
            return true;
        }
    }
    // Matchups already re-assigned this pass.
    for (pos, gi) in assignment.iter().enumerate() {
        if let Some(gi) = gi {
            let g = &bucket[*gi];
            if bucket[open[pos]].date() == date && involves(g) {
                return true;
            }
        }
    }
    // The previous week.
    prev_bucket.iter().any(|g| g.date() == date && involves(g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Slot;
    use chrono::{Duration, NaiveDate};

    fn slot(id: &str, day: u32, hour: u32) -> Slot {
        let start = NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, 45, 0)
            .unwrap();
        Slot::new(id, start, start + Duration::minutes(80), "Rink A")
    }

    fn game(id: &str, day: u32, hour: u32, home: &str, away: &str) -> Game {
        Game::new(slot(id, day, hour), "div6", home, away)
    }

    fn params() -> ScheduleParams {
        ScheduleParams::default()
            .with_games_per_team(2)
            .with_block_size(3)
            .with_min_rest_days(0)
    }

    /// Week 1: E/F play day 1, A/B day 2, C/D day 3 (all non-late).
    /// Week 2 starts day 9: the E-F rematch sits last even though E and F
    /// have waited longest.
    fn sample() -> Schedule {
        Schedule::from_games(vec![
            game("s1", 1, 20, "E", "F"),
            game("s2", 2, 20, "A", "B"),
            game("s3", 3, 20, "C", "D"),
            game("s4", 9, 20, "A", "B"),
            game("s5", 10, 20, "C", "D"),
            game("s6", 11, 20, "E", "F"),
        ])
    }

    #[test]
    fn test_longest_wait_moves_earliest() {
        let outcome = resequence_days_since(&sample(), &params(), None).unwrap();
        let optimized = outcome.schedule.unwrap();
        let first_of_week2 = optimized
            .games()
            .iter()
            .find(|g| g.slot.id == "s4")
            .unwrap();
        assert!(first_of_week2.involves("E") && first_of_week2.involves("F"));
        assert!(outcome.swaps.iter().all(|s| s.phase == SwapPhase::Resequence));
    }

    #[test]
    fn test_late_slots_untouched() {
        let schedule = Schedule::from_games(vec![
            game("s1", 1, 20, "E", "F"),
            game("s2", 2, 20, "A", "B"),
            game("s3", 3, 20, "C", "D"),
            game("s4", 9, 22, "A", "B"), // late; must stay put
            game("s5", 10, 20, "C", "D"),
            game("s6", 11, 20, "E", "F"),
        ]);
        let outcome = resequence_days_since(&schedule, &params(), None).unwrap();
        let optimized = outcome.schedule.unwrap();
        let late = optimized.games().iter().find(|g| g.slot.id == "s4").unwrap();
        assert!(late.involves("A") && late.involves("B"));
    }

    #[test]
    fn test_idempotent() {
        let once = resequence_days_since(&sample(), &params(), None)
            .unwrap()
            .schedule
            .unwrap();
        let outcome = resequence_days_since(&once, &params(), None).unwrap();
        assert!(outcome.swaps.is_empty(), "second pass still swapped");
        assert_eq!(outcome.schedule.unwrap(), once);
    }

    #[test]
    fn test_slots_preserved() {
        let before = sample();
        let after = resequence_days_since(&before, &params(), None)
            .unwrap()
            .schedule
            .unwrap();
        let ids = |s: &Schedule| {
            s.games()
                .iter()
                .map(|g| (g.slot.id.clone(), g.slot.start))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&before), ids(&after));
    }

    #[test]
    fn test_target_week_limits_the_pass() {
        let outcome = resequence_days_since(&sample(), &params(), Some(2)).unwrap();
        assert_eq!(outcome.weeks_optimized, vec![2]);
    }

    #[test]
    fn test_week_one_anchored() {
        let err = resequence_days_since(&sample(), &params(), Some(1)).unwrap_err();
        assert!(matches!(err, ScheduleError::Structural(_)));

        let outcome = resequence_days_since(&sample(), &params(), None).unwrap();
        assert!(!outcome.weeks_optimized.contains(&1));
        assert_eq!(outcome.total_optimizable_weeks, 1);
        let week1: Vec<_> = outcome
            .schedule
            .unwrap()
            .games()
            .iter()
            .filter(|g| ["s1", "s2", "s3"].contains(&g.slot.id.as_str()))
            .map(|g| g.pairing())
            .collect();
        let original: Vec<_> = sample().games()[..3].iter().map(Game::pairing).collect();
        assert_eq!(week1, original);
    }

    #[test]
    fn test_target_week_out_of_range() {
        let err = resequence_days_since(&sample(), &params(), Some(9)).unwrap_err();
        assert!(matches!(err, ScheduleError::Structural(_)));
    }

    #[test]
    fn test_no_same_day_collision_introduced() {
        // Two slots share day 9; re-sequencing must not put one team in both.
        let schedule = Schedule::from_games(vec![
            game("s1", 1, 20, "E", "F"),
            game("s2", 2, 20, "A", "B"),
            game("s3", 3, 20, "C", "D"),
            game("s4", 9, 18, "A", "B"),
            game("s5", 9, 20, "C", "D"),
            game("s6", 11, 20, "E", "F"),
        ]);
        let optimized = resequence_days_since(&schedule, &params(), None)
            .unwrap()
            .schedule
            .unwrap();
        for g in optimized.games() {
            let twice = optimized
                .games()
                .iter()
                .filter(|o| o.date() == g.date() && (o.involves(&g.home) || o.involves(&g.away)))
                .count();
            assert_eq!(twice, 1, "{} double-booked on {}", g.home, g.date());
        }
    }
}
