//! Engine configuration.
//!
//! Parameters arrive from the caller as an open JSON object; here they are
//! a strongly-typed struct with documented defaults, validated and filled
//! in once at the boundary ([`ScheduleParams::resolve`]) rather than
//! re-interpreted throughout the algorithms. Knobs left unset derive
//! sensible values from the team count, so a bare `ScheduleParams::default()`
//! schedules any roster.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::division::normalize_division;
use super::slot::EmlCutoffs;

/// Per-division game count target for one block, keyed by normalized
/// division key. BTreeMap so remainder distribution during template
/// scaling is deterministic.
pub type BlockRecipe = BTreeMap<String, usize>;

/// Weights of the optimizer's objective and its pass bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerWeights {
    /// E/M/L balance pressure (Phase 1).
    pub w_eml: f64,
    /// Run/streak pressure in conflict resolution (Phase 3).
    pub w_runs: f64,
    /// Rest-gap fairness pressure (Phase 2).
    pub w_rest: f64,
    /// Season-wide late-count spread.
    pub w_global: f64,
    /// Late-count spread over the rolling window of recent weeks.
    pub w_rolling: f64,
    /// Repeat pairings and same-day repeats.
    pub w_repeat: f64,
    /// Dispersion of rest gaps within the week.
    pub w_dispersion: f64,
    /// Late-count spread within the week under optimization.
    pub w_late_fairness: f64,
    /// Spread tolerated before the global term starts charging.
    pub global_slack: u32,
    /// Spread tolerated before the rolling term starts charging.
    pub rolling_slack: u32,
    /// Number of weeks covered by the rolling window.
    pub rolling_window: usize,
    /// Upper bound on improvement passes per phase.
    pub max_passes: u32,
}

impl Default for OptimizerWeights {
    fn default() -> Self {
        Self {
            w_eml: 4.0,
            w_runs: 0.5,
            w_rest: 3.0,
            w_global: 1.0,
            w_rolling: 1.0,
            w_repeat: 2.0,
            w_dispersion: 1.0,
            w_late_fairness: 5.0,
            global_slack: 1,
            rolling_slack: 1,
            rolling_window: 3,
            max_passes: 3,
        }
    }
}

/// Full engine configuration.
///
/// Optional numeric knobs derive their value from the team count at
/// [`resolve`](Self::resolve) time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Games each team plays over the season. Default: `teams - 1`.
    pub games_per_team: Option<usize>,
    /// Games per block/bucket. Default: `teams / 2`.
    pub block_size: Option<usize>,
    /// Minimum days between two games of one team. Default:
    /// `clamp(teams / 8, 2, 4)`.
    pub min_rest_days: Option<i64>,
    /// Maximum tolerated idle stretch. Default: `clamp(teams / 2, 8, 16)`.
    pub max_gap_days: Option<i64>,
    /// Target gap the heuristic filler steers toward. Default:
    /// `clamp(teams / 3, 5, 10)`.
    pub ideal_gap_days: Option<i64>,
    /// Forbid meeting the same opponent in consecutive games.
    pub no_back_to_back: bool,
    /// Restrict pairings to teams sharing a division.
    pub no_interdivision: bool,
    /// Allow pairings across declared sub-division boundaries.
    pub sub_division_crossover: bool,
    /// Per-division games per block. Default: derived from roster sizes.
    pub recipe: Option<BlockRecipe>,
    /// Early/Mid/Late cutoffs.
    pub eml: EmlCutoffs,
    pub weights: OptimizerWeights,
    /// Seed for the round-robin rotation shuffle and tie-breaking.
    pub seed: u64,
    /// Hard wall-clock budget for one invocation, in milliseconds.
    pub timeout_ms: u64,
    /// Days-since value assigned to a team with no prior game.
    pub never_played_priority: i64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            games_per_team: None,
            block_size: None,
            min_rest_days: None,
            max_gap_days: None,
            ideal_gap_days: None,
            no_back_to_back: true,
            no_interdivision: false,
            sub_division_crossover: true,
            recipe: None,
            eml: EmlCutoffs::default(),
            weights: OptimizerWeights::default(),
            seed: 42,
            timeout_ms: 60_000,
            never_played_priority: 999,
        }
    }
}

impl ScheduleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_games_per_team(mut self, games: usize) -> Self {
        self.games_per_team = Some(games);
        self
    }

    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = Some(size);
        self
    }

    pub fn with_min_rest_days(mut self, days: i64) -> Self {
        self.min_rest_days = Some(days);
        self
    }

    /// Sets the per-block recipe, normalizing its division keys.
    pub fn with_recipe<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, usize)>,
        K: AsRef<str>,
    {
        self.recipe = Some(
            entries
                .into_iter()
                .map(|(k, v)| (normalize_division(k.as_ref()), v))
                .collect(),
        );
        self
    }

    pub fn with_eml(mut self, eml: EmlCutoffs) -> Self {
        self.eml = eml;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fills every optional knob from the per-division roster counts
    /// (normalized key → team count) and normalizes recipe keys.
    pub fn resolve(&self, teams_per_division: &BTreeMap<String, usize>) -> ResolvedParams {
        let n: usize = teams_per_division.values().sum();
        let games_per_team = self.games_per_team.unwrap_or_else(|| n.saturating_sub(1).max(1));
        let block_size = self.block_size.unwrap_or_else(|| (n / 2).max(1));
        let min_rest_days = self
            .min_rest_days
            .unwrap_or_else(|| ((n / 8) as i64).clamp(2, 4));
        let max_gap_days = self
            .max_gap_days
            .unwrap_or_else(|| ((n / 2) as i64).clamp(8, 16));
        let ideal_gap_days = self
            .ideal_gap_days
            .unwrap_or_else(|| ((n / 3) as i64).clamp(5, 10));

        let recipe = match &self.recipe {
            Some(r) => r
                .iter()
                .map(|(k, v)| (normalize_division(k), *v))
                .collect(),
            None => derive_recipe(teams_per_division),
        };

        ResolvedParams {
            games_per_team,
            block_size,
            min_rest_days,
            max_gap_days,
            ideal_gap_days,
            no_back_to_back: self.no_back_to_back,
            no_interdivision: self.no_interdivision,
            sub_division_crossover: self.sub_division_crossover,
            recipe,
            eml: self.eml,
            weights: self.weights.clone(),
            seed: self.seed,
            timeout_ms: self.timeout_ms,
            never_played_priority: self.never_played_priority,
        }
    }
}

/// One division contributes roughly half its roster in games per block.
/// The template builder rescales the sum to the block size.
fn derive_recipe(teams_per_division: &BTreeMap<String, usize>) -> BlockRecipe {
    teams_per_division
        .iter()
        .filter(|(key, count)| key.as_str() != "unknown" && **count > 0)
        .map(|(key, count)| (key.clone(), (count / 2).max(1)))
        .collect()
}

/// `ScheduleParams` with every knob filled in; what the algorithms consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub games_per_team: usize,
    pub block_size: usize,
    pub min_rest_days: i64,
    pub max_gap_days: i64,
    pub ideal_gap_days: i64,
    pub no_back_to_back: bool,
    pub no_interdivision: bool,
    pub sub_division_crossover: bool,
    pub recipe: BlockRecipe,
    pub eml: EmlCutoffs,
    pub weights: OptimizerWeights,
    pub seed: u64,
    pub timeout_ms: u64,
    pub never_played_priority: i64,
}
