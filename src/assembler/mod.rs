//! Schedule assembly: the block/recipe "strict filler".
//!
//! Turns the chronological slot list into blocks of `block_size` slots,
//! stamps each slot with a division from the block template, and fills the
//! stamped slots by popping pairings off each division's round-robin
//! queue. Blocks adapt to partial or irregular supply: each division gets
//! `min(available slots, recipe count)` games rather than demanding an
//! exact recipe match. Slots the strict pass cannot serve fall through to
//! a scored heuristic filler, then a last-chance force fill that ignores
//! soft rules but keeps division assignment, once-per-block, and the
//! per-team cap.
//!
//! A recipe key with no matching round-robin aborts loudly: silently
//! degrading on a key mismatch once produced duplicate teams within a
//! block, and nothing here is allowed to pretend success.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDateTime;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::{
    Division, EmlCategory, Game, ResolvedParams, Schedule, ScheduleParams, Slot, Team,
};
use crate::roundrobin::{ordered_key, pair_quotas, round_robin_rounds, PairingQueue};
use crate::validation::validate_input;

mod template;
pub use template::{assign_divisions, block_template, scale_recipe};

/// A team that fell short of its season game target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamShortfall {
    pub team: String,
    pub scheduled: usize,
    pub target: usize,
}

/// Output of [`assemble`]: the schedule plus capacity diagnostics.
///
/// A shortfall is not fatal — a partial schedule is still useful — so it
/// is reported here rather than raised.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub schedule: Schedule,
    pub shortfalls: Vec<TeamShortfall>,
}

impl Assembly {
    /// The schedule, or [`ScheduleError::Capacity`] if any team fell
    /// short of its target. For callers that cannot use a partial season.
    pub fn require_complete(self) -> Result<Schedule> {
        if self.shortfalls.is_empty() {
            return Ok(self.schedule);
        }
        let detail: Vec<String> = self
            .shortfalls
            .iter()
            .map(|s| format!("{} ({}/{})", s.team, s.scheduled, s.target))
            .collect();
        Err(ScheduleError::Capacity(format!(
            "{} team(s) under target: {}",
            detail.len(),
            detail.join(", ")
        )))
    }
}

/// Assembles the initial schedule from slots, teams, and parameters.
///
/// # Errors
///
/// - [`ScheduleError::Validation`] for malformed input
/// - [`ScheduleError::Structural`] when a recipe key has no matching
///   round-robin, or a full block violates the exactly-once rule
/// - [`ScheduleError::Timeout`] when the invocation exceeds its budget
pub fn assemble(
    slots: &[Slot],
    teams: &[Team],
    divisions: &[Division],
    params: &ScheduleParams,
) -> Result<Assembly> {
    validate_input(slots, teams, divisions).map_err(ScheduleError::Validation)?;

    let mut teams_by_div: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut team_div: HashMap<String, String> = HashMap::new();
    let mut sub_div: HashMap<String, String> = HashMap::new();
    for team in teams {
        let key = team.division_key();
        teams_by_div.entry(key.clone()).or_default().push(team.name.clone());
        team_div.insert(team.name.clone(), key);
        if let Some(sd) = &team.sub_division {
            sub_div.insert(team.name.clone(), sd.clone());
        }
    }
    for roster in teams_by_div.values_mut() {
        roster.sort();
    }

    let counts: BTreeMap<String, usize> = teams_by_div
        .iter()
        .map(|(k, v)| (k.clone(), v.len()))
        .collect();
    let resolved = params.resolve(&counts);

    // Loud structural check: every recipe key must have a round-robin.
    for key in resolved.recipe.keys() {
        match teams_by_div.get(key) {
            Some(roster) if roster.len() >= 2 => {}
            _ => {
                return Err(ScheduleError::Structural(format!(
                    "no round-robin for division '{key}'; \
                     team divisions and recipe keys must normalize to the same value"
                )))
            }
        }
    }

    let mut sorted: Vec<Slot> = slots.to_vec();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let template = block_template(&resolved.recipe, resolved.block_size);
    let assigned = assign_divisions(sorted.len(), resolved.block_size, &template);

    let mut queues: BTreeMap<String, PairingQueue> = BTreeMap::new();
    for key in resolved.recipe.keys() {
        let roster = &teams_by_div[key];
        queues.insert(
            key.clone(),
            PairingQueue::new(round_robin_rounds(roster, resolved.seed)),
        );
    }

    let quotas = pair_quotas(&teams_by_div, resolved.games_per_team);
    let mut filler = Filler::new(sorted, assigned, resolved, team_div, sub_div, quotas);
    filler.strict_fill(&mut queues);
    filler.heuristic_fill()?;
    filler.force_fill();
    filler.validate_full_blocks()?;

    let shortfalls = filler.shortfalls();
    if !shortfalls.is_empty() {
        warn!(
            "{} team(s) below their game target after assembly",
            shortfalls.len()
        );
    }
    Ok(Assembly {
        schedule: filler.into_schedule(),
        shortfalls,
    })
}

/// Working state shared by the strict, heuristic, and force passes.
struct Filler {
    slots: Vec<Slot>,
    assigned: Vec<Option<String>>,
    params: ResolvedParams,
    team_div: HashMap<String, String>,
    sub_div: HashMap<String, String>,
    /// Per slot: (home, away, division) once filled.
    games: Vec<Option<(String, String, String)>>,
    game_count: HashMap<String, usize>,
    home_count: HashMap<String, usize>,
    last_game: HashMap<String, NaiveDateTime>,
    last_opponent: HashMap<String, String>,
    played_in_segment: HashMap<usize, HashSet<String>>,
    eml_count: HashMap<String, HashMap<EmlCategory, usize>>,
    quotas: BTreeMap<(String, String), usize>,
    rng: StdRng,
    started: Instant,
}

impl Filler {
    fn new(
        slots: Vec<Slot>,
        assigned: Vec<Option<String>>,
        params: ResolvedParams,
        team_div: HashMap<String, String>,
        sub_div: HashMap<String, String>,
        quotas: BTreeMap<(String, String), usize>,
    ) -> Self {
        let games = vec![None; slots.len()];
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            slots,
            assigned,
            params,
            team_div,
            sub_div,
            games,
            game_count: HashMap::new(),
            home_count: HashMap::new(),
            last_game: HashMap::new(),
            last_opponent: HashMap::new(),
            played_in_segment: HashMap::new(),
            eml_count: HashMap::new(),
            quotas,
            rng,
            started: Instant::now(),
        }
    }

    #[inline]
    fn capped(&self, team: &str) -> bool {
        self.game_count.get(team).copied().unwrap_or(0) >= self.params.games_per_team
    }

    fn segment_of(&self, slot_idx: usize) -> usize {
        slot_idx / self.params.block_size
    }

    fn in_segment(&self, seg: usize, team: &str) -> bool {
        self.played_in_segment
            .get(&seg)
            .is_some_and(|s| s.contains(team))
    }

    fn plays_on_date(&self, team: &str, date: chrono::NaiveDate) -> bool {
        self.games.iter().enumerate().any(|(i, g)| {
            g.as_ref()
                .is_some_and(|(h, a, _)| (h == team || a == team) && self.slots[i].date() == date)
        })
    }

    fn rest_ok(&self, team: &str, start: NaiveDateTime) -> bool {
        match self.last_game.get(team) {
            None => true,
            Some(last) => {
                let gap_days = (start - *last).num_seconds() as f64 / 86_400.0;
                gap_days >= self.params.min_rest_days as f64
            }
        }
    }

    /// Sub-division boundary: binding only when crossover is disabled and
    /// both teams carry a tag.
    fn crossover_ok(&self, a: &str, b: &str) -> bool {
        if self.params.sub_division_crossover {
            return true;
        }
        match (self.sub_div.get(a), self.sub_div.get(b)) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => true,
        }
    }

    fn place(&mut self, slot_idx: usize, home: String, away: String, division: String) {
        let seg = self.segment_of(slot_idx);
        let slot = &self.slots[slot_idx];
        let eml = slot.eml(&self.params.eml);
        let start = slot.start;

        *self.game_count.entry(home.clone()).or_default() += 1;
        *self.game_count.entry(away.clone()).or_default() += 1;
        *self.home_count.entry(home.clone()).or_default() += 1;
        self.last_game.insert(home.clone(), start);
        self.last_game.insert(away.clone(), start);
        self.last_opponent.insert(home.clone(), away.clone());
        self.last_opponent.insert(away.clone(), home.clone());
        let seg_set = self.played_in_segment.entry(seg).or_default();
        seg_set.insert(home.clone());
        seg_set.insert(away.clone());
        for t in [&home, &away] {
            *self
                .eml_count
                .entry(t.clone())
                .or_default()
                .entry(eml)
                .or_default() += 1;
        }
        let key = ordered_key(&home, &away);
        if let Some(q) = self.quotas.get_mut(&key) {
            *q = q.saturating_sub(1);
        }

        self.games[slot_idx] = Some((home, away, division));
    }

    /// Strict pass: pop round-robin pairings into each block's stamped
    /// slots, `min(available, recipe)` per division. Stops a division
    /// within a block as soon as the next pairing would breach the
    /// per-team cap or the once-per-block rule; the heuristic pass picks
    /// up whatever is left.
    fn strict_fill(&mut self, queues: &mut BTreeMap<String, PairingQueue>) {
        let block_size = self.params.block_size;
        let n = self.slots.len();
        let recipe = self.params.recipe.clone();
        let mut seg = 0;
        while seg * block_size < n {
            let lo = seg * block_size;
            let hi = (lo + block_size).min(n);

            for (division, &recipe_count) in &recipe {
                let d_slots: Vec<usize> = (lo..hi)
                    .filter(|&i| {
                        self.games[i].is_none() && self.assigned[i].as_deref() == Some(division)
                    })
                    .collect();
                let take = d_slots.len().min(recipe_count);
                if take == 0 {
                    continue;
                }
                let Some(queue) = queues.get_mut(division) else {
                    continue;
                };

                let mut placed = 0;
                for &slot_idx in &d_slots {
                    if placed >= take {
                        break;
                    }
                    let Some((a, b)) = queue.peek().cloned() else {
                        break;
                    };
                    if self.capped(&a) || self.capped(&b) {
                        debug!("block {seg}/{division}: cap reached, leaving rest to heuristic");
                        break;
                    }
                    if self.in_segment(seg, &a) || self.in_segment(seg, &b) {
                        debug!("block {seg}/{division}: once-per-block guard hit");
                        break;
                    }
                    if !self.crossover_ok(&a, &b) {
                        break;
                    }
                    // Same-day dates can straddle a block boundary.
                    let date = self.slots[slot_idx].date();
                    if self.params.min_rest_days > 0
                        && (self.plays_on_date(&a, date) || self.plays_on_date(&b, date))
                    {
                        debug!("block {seg}/{division}: same-day guard, leaving rest to heuristic");
                        break;
                    }
                    queue.pop();
                    // Orientation is the round-robin's declared order.
                    self.place(slot_idx, a, b, division.clone());
                    placed += 1;
                }
                if placed > 0 {
                    debug!("block {seg}: {placed} {division} game(s) via strict fill");
                }
            }
            seg += 1;
        }
    }

    /// Scored heuristic pass over the slots the strict pass left empty.
    fn heuristic_fill(&mut self) -> Result<()> {
        let budget = self.params.timeout_ms;
        for slot_idx in 0..self.slots.len() {
            if self.games[slot_idx].is_some() {
                continue;
            }
            let elapsed = self.started.elapsed().as_millis() as u64;
            if elapsed > budget {
                return Err(ScheduleError::Timeout {
                    elapsed_ms: elapsed,
                    budget_ms: budget,
                });
            }

            let mut picked = self.pick(slot_idx, false);
            if picked.is_none() && self.assigned[slot_idx].is_some() {
                // Coverage pressure: the block cannot finish under the
                // hard time rules, so relax them.
                picked = self.pick(slot_idx, true);
            }
            let Some((a, b)) = picked else {
                debug!(
                    "no pairing for slot {} (division {:?})",
                    self.slots[slot_idx].id, self.assigned[slot_idx]
                );
                continue;
            };

            let (home, away) = self.choose_home_away(a, b);
            let division = self
                .team_div
                .get(&home)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            self.place(slot_idx, home, away, division);
        }
        Ok(())
    }

    /// Best remaining pairing for a slot, or `None`.
    fn pick(&mut self, slot_idx: usize, relax: bool) -> Option<(String, String)> {
        let seg = self.segment_of(slot_idx);
        let slot = self.slots[slot_idx].clone();
        let slot_div = self.assigned[slot_idx].clone();
        let eml = slot.eml(&self.params.eml);

        let mut candidates: Vec<(String, String)> = self
            .quotas
            .iter()
            .filter(|(_, &q)| q > 0)
            .map(|((a, b), _)| (a.clone(), b.clone()))
            .collect();
        candidates.shuffle(&mut self.rng);

        let mut best: Option<(String, String)> = None;
        let mut best_score = f64::NEG_INFINITY;
        for (a, b) in candidates {
            if self.capped(&a) || self.capped(&b) {
                continue;
            }
            if let Some(d) = &slot_div {
                if self.team_div.get(&a) != Some(d) || self.team_div.get(&b) != Some(d) {
                    continue;
                }
            } else if self.params.no_interdivision && self.team_div.get(&a) != self.team_div.get(&b)
            {
                continue;
            }
            if self.in_segment(seg, &a) || self.in_segment(seg, &b) {
                continue;
            }
            if !self.crossover_ok(&a, &b) {
                continue;
            }
            // Same-day double-headers stay forbidden even under relax.
            if self.params.min_rest_days > 0
                && (self.plays_on_date(&a, slot.date()) || self.plays_on_date(&b, slot.date()))
            {
                continue;
            }
            if !relax {
                if !self.rest_ok(&a, slot.start) || !self.rest_ok(&b, slot.start) {
                    continue;
                }
                if self.params.no_back_to_back
                    && (self.last_opponent.get(&a) == Some(&b)
                        || self.last_opponent.get(&b) == Some(&a))
                {
                    continue;
                }
            }

            let mut score = 1000.0;
            if !relax {
                for t in [&a, &b] {
                    if let Some(last) = self.last_game.get(t) {
                        let gap = (slot.start - *last).num_seconds() as f64 / 86_400.0;
                        score -= (gap - self.params.ideal_gap_days as f64).abs() * 1.5;
                        if gap > self.params.max_gap_days as f64 {
                            score -= 1000.0;
                        }
                    }
                }
            } else if slot_div.is_some() {
                let unseen_a = !self.in_segment(seg, &a);
                let unseen_b = !self.in_segment(seg, &b);
                score += if unseen_a && unseen_b {
                    20.0
                } else if unseen_a || unseen_b {
                    8.0
                } else {
                    0.0
                };
            }
            // Steer each team toward its least-used E/M/L band.
            for t in [&a, &b] {
                let counts = self.eml_count.entry(t.clone()).or_default();
                let min = [EmlCategory::Early, EmlCategory::Mid, EmlCategory::Late]
                    .iter()
                    .map(|c| counts.get(c).copied().unwrap_or(0))
                    .min()
                    .unwrap_or(0);
                if counts.get(&eml).copied().unwrap_or(0) == min {
                    score += 2.0;
                }
            }
            let ha = self.home_count.get(&a).copied().unwrap_or(0) as f64;
            let hb = self.home_count.get(&b).copied().unwrap_or(0) as f64;
            score -= (ha - hb).abs() * 0.2;
            score += self.quotas.get(&ordered_key(&a, &b)).copied().unwrap_or(0) as f64 * 0.1;

            if score > best_score {
                best_score = score;
                best = Some((a, b));
            }
        }
        best
    }

    /// Team with fewer home games hosts.
    fn choose_home_away(&self, a: String, b: String) -> (String, String) {
        let ha = self.home_count.get(&a).copied().unwrap_or(0);
        let hb = self.home_count.get(&b).copied().unwrap_or(0);
        if ha <= hb {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Last-chance filler: ignores rest and back-to-back rules but keeps
    /// the slot's division, the once-per-block rule, the per-team cap,
    /// and the same-day guard.
    fn force_fill(&mut self) {
        for slot_idx in 0..self.slots.len() {
            if self.games[slot_idx].is_some() {
                continue;
            }
            let seg = self.segment_of(slot_idx);
            let slot_div = self.assigned[slot_idx].clone();
            let date = self.slots[slot_idx].date();

            let mut candidates: Vec<String> = self
                .team_div
                .iter()
                .filter(|(t, d)| {
                    !self.capped(t)
                        && !self.in_segment(seg, t)
                        && slot_div.as_ref().map_or(true, |want| *d == want)
                        && !(self.params.min_rest_days > 0 && self.plays_on_date(t, date))
                })
                .map(|(t, _)| (*t).clone())
                .collect();
            if candidates.len() < 2 {
                continue;
            }
            candidates.sort_by_key(|t| {
                (
                    self.game_count.get(t).copied().unwrap_or(0),
                    t.clone(),
                )
            });

            let mut placed = false;
            for i in 0..candidates.len() {
                if placed {
                    break;
                }
                for j in i + 1..candidates.len() {
                    let (a, b) = (candidates[i].clone(), candidates[j].clone());
                    if slot_div.is_none()
                        && self.params.no_interdivision
                        && self.team_div.get(&a) != self.team_div.get(&b)
                    {
                        continue;
                    }
                    if !self.crossover_ok(&a, &b) {
                        continue;
                    }
                    let (home, away) = self.choose_home_away(a, b);
                    let division = self
                        .team_div
                        .get(&home)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    debug!("force-filling slot {}", self.slots[slot_idx].id);
                    self.place(slot_idx, home, away, division);
                    placed = true;
                    break;
                }
            }
        }
    }

    /// Full, fully-filled blocks must host each team exactly once.
    fn validate_full_blocks(&self) -> Result<()> {
        let block_size = self.params.block_size;
        for (seg, chunk) in self.games.chunks(block_size).enumerate() {
            if chunk.len() != block_size || chunk.iter().any(|g| g.is_none()) {
                continue;
            }
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for game in chunk.iter().flatten() {
                *seen.entry(game.0.as_str()).or_default() += 1;
                *seen.entry(game.1.as_str()).or_default() += 1;
            }
            let mut offenders: Vec<&str> = seen
                .iter()
                .filter(|(_, &c)| c != 1)
                .map(|(t, _)| *t)
                .collect();
            if !offenders.is_empty() {
                offenders.sort();
                return Err(ScheduleError::Structural(format!(
                    "block {seg}: not exactly-once per team; offenders: {}",
                    offenders.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn shortfalls(&self) -> Vec<TeamShortfall> {
        let target = self.params.games_per_team;
        let mut out: Vec<TeamShortfall> = self
            .team_div
            .keys()
            .filter_map(|t| {
                let scheduled = self.game_count.get(t).copied().unwrap_or(0);
                (scheduled < target).then(|| TeamShortfall {
                    team: t.clone(),
                    scheduled,
                    target,
                })
            })
            .collect();
        out.sort_by(|a, b| a.team.cmp(&b.team));
        out
    }

    fn into_schedule(self) -> Schedule {
        let games: Vec<Game> = self
            .games
            .into_iter()
            .zip(self.slots)
            .filter_map(|(g, slot)| g.map(|(home, away, division)| Game::new(slot, division, home, away)))
            .collect();
        Schedule::from_games(games)
    }
}
