//! Games, schedules, and swap records.
//!
//! A `Game` binds one slot to one home/away pairing in one division. The
//! `Schedule` is the ordered list of games; blocks ("buckets") are a view
//! obtained by slicing it, never a stored entity. `Swap` records what the
//! optimizer did (or proposes to do, on a dry run) to a single slot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::slot::{EmlCategory, EmlCutoffs, Slot};

/// A home/away pairing within a division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub home: String,
    pub away: String,
    /// Normalized division key.
    pub division: String,
}

impl Pairing {
    pub fn new(
        home: impl Into<String>,
        away: impl Into<String>,
        division: impl Into<String>,
    ) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            division: division.into(),
        }
    }

    /// Whether the two pairings involve the same two teams, in either
    /// orientation.
    pub fn same_matchup(&self, other: &Pairing) -> bool {
        (self.home == other.home && self.away == other.away)
            || (self.home == other.away && self.away == other.home)
    }

    /// Whether `team` plays in this pairing.
    #[inline]
    pub fn involves(&self, team: &str) -> bool {
        self.home == team || self.away == team
    }
}

/// A scheduled game: one slot, one pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub slot: Slot,
    /// Normalized division key.
    pub division: String,
    pub home: String,
    pub away: String,
}

impl Game {
    /// Creates a game; the identity is derived from the slot and pairing.
    pub fn new(slot: Slot, division: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        let home = home.into();
        let away = away.into();
        let id = format!("{}_{}_vs_{}", slot.id, home, away);
        Self {
            id,
            slot,
            division: division.into(),
            home,
            away,
        }
    }

    /// Whether `team` plays in this game.
    #[inline]
    pub fn involves(&self, team: &str) -> bool {
        self.home == team || self.away == team
    }

    /// Calendar date of the game.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.slot.date()
    }

    /// E/M/L band, derived from the slot start (never stored).
    #[inline]
    pub fn eml(&self, cutoffs: &EmlCutoffs) -> EmlCategory {
        self.slot.eml(cutoffs)
    }

    /// The pairing carried by this game.
    pub fn pairing(&self) -> Pairing {
        Pairing::new(self.home.clone(), self.away.clone(), self.division.clone())
    }
}

/// A full schedule, chronologically ordered by slot start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    games: Vec<Game>,
}

impl Schedule {
    /// Builds a schedule, sorting the games into chronological slot order.
    pub fn from_games(mut games: Vec<Game>) -> Self {
        games.sort_by(|a, b| a.slot.start.cmp(&b.slot.start).then_with(|| a.slot.id.cmp(&b.slot.id)));
        Self { games }
    }

    #[inline]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Blocks of `block_size` contiguous games. The final block may be
    /// partial. This is a view; nothing is stored.
    pub fn buckets(&self, block_size: usize) -> Vec<&[Game]> {
        if block_size == 0 {
            return Vec::new();
        }
        self.games.chunks(block_size).collect()
    }

    /// Number of buckets under the given block size.
    pub fn bucket_count(&self, block_size: usize) -> usize {
        if block_size == 0 {
            0
        } else {
            self.games.len().div_ceil(block_size)
        }
    }

    /// All games a team appears in, in chronological order.
    pub fn games_for_team<'a>(&'a self, team: &'a str) -> impl Iterator<Item = &'a Game> {
        self.games.iter().filter(move |g| g.involves(team))
    }

    /// Every distinct team name appearing in the schedule, sorted.
    pub fn team_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .games
            .iter()
            .flat_map(|g| [g.home.clone(), g.away.clone()])
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Optimization phase a swap originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPhase {
    /// Bucket cleared before rebuild.
    Clearing,
    /// Phase 1: late-game consistency.
    LateConsistency,
    /// Phase 2: days-since-last-played fairness.
    DaysSince,
    /// Phase 3: residual conflict resolution.
    ConflictResolution,
    /// Standalone greedy re-sequencer.
    Resequence,
}

/// A proposed or applied change to one slot's team assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub phase: SwapPhase,
    /// Slot whose assignment changed.
    pub slot_id: String,
    /// Pairing previously in the slot; `None` if it was empty.
    pub before: Option<Pairing>,
    pub after: Pairing,
    /// Objective delta attributed to this change (negative = improvement).
    /// A week rebuild spreads its total delta uniformly over the slots it
    /// changed; the value is an audit approximation, not a per-swap
    /// measurement.
    pub score_delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(id: &str, day: u32, hour: u32) -> Slot {
        let start = NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Slot::new(id, start, start + chrono::Duration::minutes(80), "Rink A")
    }

    fn sample_schedule() -> Schedule {
        Schedule::from_games(vec![
            Game::new(slot("s2", 2, 21), "div4", "C", "D"),
            Game::new(slot("s1", 1, 20), "div4", "A", "B"),
            Game::new(slot("s3", 8, 22), "div4", "A", "C"),
            Game::new(slot("s4", 9, 21), "div4", "B", "D"),
        ])
    }

    #[test]
    fn test_from_games_sorts_chronologically() {
        let schedule = sample_schedule();
        let ids: Vec<&str> = schedule.games().iter().map(|g| g.slot.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_buckets_are_chunked_views() {
        let schedule = sample_schedule();
        let buckets = schedule.buckets(2);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), 2);
        assert_eq!(schedule.bucket_count(2), 2);
        assert_eq!(schedule.bucket_count(3), 2); // 4 games -> partial final bucket
    }

    #[test]
    fn test_games_for_team() {
        let schedule = sample_schedule();
        let dates: Vec<u32> = schedule
            .games_for_team("A")
            .map(|g| chrono::Datelike::day(&g.date()))
            .collect();
        assert_eq!(dates, [1, 8]);
    }

    #[test]
    fn test_team_names_sorted_dedup() {
        assert_eq!(sample_schedule().team_names(), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_same_matchup_ignores_orientation() {
        let a = Pairing::new("A", "B", "div4");
        let b = Pairing::new("B", "A", "div4");
        let c = Pairing::new("A", "C", "div4");
        assert!(a.same_matchup(&b));
        assert!(!a.same_matchup(&c));
    }

    #[test]
    fn test_game_id_derived_from_slot_and_pairing() {
        let g = Game::new(slot("s9", 3, 20), "div4", "A", "B");
        assert_eq!(g.id, "s9_A_vs_B");
    }
}
