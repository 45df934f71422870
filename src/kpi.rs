//! Key performance indicators of a schedule.
//!
//! Read-only fairness metrics computed after assembly or optimization:
//! per-team game counts, home/away balance, average rest gap, and the
//! Early/Mid/Late distribution, plus the season-wide late spread the
//! optimizer works to shrink. Reporting only; nothing here mutates a
//! schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{EmlCategory, EmlCutoffs, Schedule};

/// Per-team slice of the KPI report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamKpi {
    pub team: String,
    pub games: usize,
    pub home_games: usize,
    pub away_games: usize,
    /// Mean days between consecutive games; zero with fewer than two.
    pub avg_gap_days: f64,
    pub early: usize,
    pub mid: usize,
    pub late: usize,
}

/// Fairness report over a whole schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    pub total_games: usize,
    /// Max minus min late count across teams.
    pub late_spread: usize,
    /// Per-team metrics, sorted by team name.
    pub teams: Vec<TeamKpi>,
}

impl ScheduleKpi {
    /// Computes the report for a schedule under the given E/M/L cutoffs.
    pub fn calculate(schedule: &Schedule, eml: &EmlCutoffs) -> Self {
        let mut teams: BTreeMap<String, TeamKpi> = BTreeMap::new();
        let blank = |name: &str| TeamKpi {
            team: name.to_string(),
            games: 0,
            home_games: 0,
            away_games: 0,
            avg_gap_days: 0.0,
            early: 0,
            mid: 0,
            late: 0,
        };

        for game in schedule.games() {
            let band = game.eml(eml);
            for (name, is_home) in [(&game.home, true), (&game.away, false)] {
                let entry = teams
                    .entry(name.clone())
                    .or_insert_with(|| blank(name));
                entry.games += 1;
                if is_home {
                    entry.home_games += 1;
                } else {
                    entry.away_games += 1;
                }
                match band {
                    EmlCategory::Early => entry.early += 1,
                    EmlCategory::Mid => entry.mid += 1,
                    EmlCategory::Late => entry.late += 1,
                }
            }
        }

        for kpi in teams.values_mut() {
            let starts: Vec<_> = schedule
                .games_for_team(&kpi.team)
                .map(|g| g.slot.start)
                .collect();
            if starts.len() >= 2 {
                let total_days: f64 = starts
                    .windows(2)
                    .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
                    .sum();
                kpi.avg_gap_days = total_days / (starts.len() - 1) as f64;
            }
        }

        let late_spread = match (
            teams.values().map(|t| t.late).min(),
            teams.values().map(|t| t.late).max(),
        ) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        };

        Self {
            total_games: schedule.len(),
            late_spread,
            teams: teams.into_values().collect(),
        }
    }

    /// The per-team slice for `team`, if it played.
    pub fn team(&self, team: &str) -> Option<&TeamKpi> {
        self.teams.iter().find(|t| t.team == team)
    }
}
