//! Objective scoring for schedule optimization.
//!
//! The objective is a weighted sum of fairness pressures, lower is better,
//! zero is a schedule with nothing left to complain about. The optimizer
//! only ever accepts a rebuild that strictly reduces the objective, so
//! every term here must be a pure function of the schedule.

use std::collections::HashMap;

use crate::models::{EmlCategory, EmlCutoffs, Game, ResolvedParams, Schedule};

/// Late games per team over `games`. Teams absent from `games` simply
/// don't appear; callers supply the full roster to [`spread`] so idle
/// teams still count as zero.
pub(crate) fn late_counts<'a>(
    games: impl Iterator<Item = &'a Game>,
    eml: &EmlCutoffs,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for game in games {
        if eml.is_late(game.slot.start) {
            *counts.entry(game.home.clone()).or_default() += 1;
            *counts.entry(game.away.clone()).or_default() += 1;
        }
    }
    counts
}

/// Max minus min count over the full roster (missing teams count zero).
pub(crate) fn spread(counts: &HashMap<String, usize>, roster: &[String]) -> usize {
    if roster.is_empty() {
        return 0;
    }
    let mut lo = usize::MAX;
    let mut hi = 0;
    for team in roster {
        let c = counts.get(team).copied().unwrap_or(0);
        lo = lo.min(c);
        hi = hi.max(c);
    }
    hi - lo
}

/// Season-wide late spread beyond the tolerated slack.
fn global_late_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    let counts = late_counts(schedule.games().iter(), &params.eml);
    spread(&counts, roster).saturating_sub(params.weights.global_slack as usize) as f64
}

/// Late spread inside each rolling window of consecutive buckets, summed.
///
/// Catches a team soaked in late games three weeks running even when the
/// season-long totals even out.
fn rolling_late_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    let window = params.weights.rolling_window;
    let buckets = schedule.buckets(params.block_size);
    if window == 0 || buckets.len() < window {
        return 0.0;
    }
    let mut total = 0usize;
    for start in 0..=buckets.len() - window {
        let counts = late_counts(
            buckets[start..start + window].iter().flat_map(|b| b.iter()),
            &params.eml,
        );
        // Only teams active in the window; idle teams aren't owed a late
        // game they had no chance to play.
        let active: Vec<String> = {
            let mut names: Vec<String> = buckets[start..start + window]
                .iter()
                .flat_map(|b| b.iter())
                .flat_map(|g| [g.home.clone(), g.away.clone()])
                .collect();
            names.sort();
            names.dedup();
            names
        };
        total += spread(&counts, &active)
            .saturating_sub(params.weights.rolling_slack as usize);
    }
    total as f64
}

/// Immediate rematches and same-day double-headers, counted per team.
fn repeat_term(schedule: &Schedule, roster: &[String]) -> f64 {
    let mut repeats = 0usize;
    for team in roster {
        let mut prev_opponent: Option<&str> = None;
        let mut prev_date = None;
        for game in schedule.games_for_team(team) {
            let opponent = if game.home == *team {
                game.away.as_str()
            } else {
                game.home.as_str()
            };
            if prev_opponent == Some(opponent) {
                repeats += 1;
            }
            if prev_date == Some(game.date()) {
                repeats += 1;
            }
            prev_opponent = Some(opponent);
            prev_date = Some(game.date());
        }
    }
    repeats as f64
}

/// Mean per-team standard deviation of rest gaps, in days.
fn dispersion_term(schedule: &Schedule, roster: &[String]) -> f64 {
    let mut total = 0.0;
    let mut teams_with_gaps = 0usize;
    for team in roster {
        let starts: Vec<_> = schedule.games_for_team(team).map(|g| g.slot.start).collect();
        if starts.len() < 2 {
            continue;
        }
        let gaps: Vec<f64> = starts
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
            .collect();
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
        total += variance.sqrt();
        teams_with_gaps += 1;
    }
    if teams_with_gaps == 0 {
        0.0
    } else {
        total / teams_with_gaps as f64
    }
}

/// Cross-team imbalance of the full E/M/L distribution: for each band,
/// max minus min count over the roster, summed.
fn eml_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    let mut per_band: HashMap<EmlCategory, HashMap<String, usize>> = HashMap::new();
    for game in schedule.games() {
        let band = game.eml(&params.eml);
        let counts = per_band.entry(band).or_default();
        *counts.entry(game.home.clone()).or_default() += 1;
        *counts.entry(game.away.clone()).or_default() += 1;
    }
    use crate::models::EmlCategory::{Early, Late, Mid};
    [Early, Mid, Late]
        .iter()
        .map(|band| {
            per_band
                .get(band)
                .map_or(0, |counts| spread(counts, roster))
        })
        .sum::<usize>() as f64
}

/// Rest-gap bound violations: gaps shorter than the minimum rest or
/// longer than the maximum tolerated idle stretch.
fn rest_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    let mut violations = 0usize;
    for team in roster {
        let dates: Vec<_> = schedule.games_for_team(team).map(Game::date).collect();
        for w in dates.windows(2) {
            let gap = (w[1] - w[0]).num_days();
            if gap < params.min_rest_days || gap > params.max_gap_days {
                violations += 1;
            }
        }
    }
    violations as f64
}

/// Streaks of three or more consecutive games in the same E/M/L band.
fn runs_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    let mut runs = 0usize;
    for team in roster {
        let mut streak = 0usize;
        let mut prev_band = None;
        for game in schedule.games_for_team(team) {
            let band = game.eml(&params.eml);
            if prev_band == Some(band) {
                streak += 1;
                if streak >= 2 {
                    runs += 1; // every extension past two counts
                }
            } else {
                streak = 0;
            }
            prev_band = Some(band);
        }
    }
    runs as f64
}

/// Standard deviation of season late counts across the roster.
///
/// Smoother cousin of the global spread term: keeps pressure on overall
/// imbalance even when max-minus-min sits inside the slack.
fn late_fairness_term(schedule: &Schedule, roster: &[String], params: &ResolvedParams) -> f64 {
    if roster.is_empty() {
        return 0.0;
    }
    let counts = late_counts(schedule.games().iter(), &params.eml);
    let values: Vec<f64> = roster
        .iter()
        .map(|t| counts.get(t).copied().unwrap_or(0) as f64)
        .collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// The full weighted objective. Lower is better; a perfectly balanced
/// schedule scores zero.
pub fn objective(schedule: &Schedule, params: &ResolvedParams) -> f64 {
    let roster = schedule.team_names();
    let w = &params.weights;
    w.w_global * global_late_term(schedule, &roster, params)
        + w.w_rolling * rolling_late_term(schedule, &roster, params)
        + w.w_repeat * repeat_term(schedule, &roster)
        + w.w_dispersion * dispersion_term(schedule, &roster)
        + w.w_late_fairness * late_fairness_term(schedule, &roster, params)
        + w.w_eml * eml_term(schedule, &roster, params)
        + w.w_rest * rest_term(schedule, &roster, params)
        + w.w_runs * runs_term(schedule, &roster, params)
}
