//! Season progress tracking for the propose/confirm workflow.
//!
//! Optimization runs week by week with a human in the loop: a dry run
//! proposes changes for the current week, someone reviews them, and only
//! a confirmation marks the week implemented. [`SeasonProgress`] is the
//! serializable record of where that walk stands. Week 1 anchors the
//! season: it enters the record already implemented and no transition can
//! reopen it.
//!
//! Confirming a week does not advance the cursor; the caller advances
//! explicitly once the confirmed schedule is actually published. At the
//! end of the season [`advance`](SeasonProgress::advance) is a no-op.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Lifecycle of one week in the optimization walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekState {
    /// Not yet looked at.
    Unoptimized,
    /// A dry run produced a proposal awaiting review.
    Proposed,
    /// The proposal was accepted and applied.
    Implemented,
}

/// Serializable record of the week-by-week optimization walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonProgress {
    weeks: Vec<WeekState>,
    /// 1-based cursor; always points at the week being worked.
    current: usize,
}

impl SeasonProgress {
    /// Starts a season of `total_weeks`. Week 1 is implemented from the
    /// start and the cursor opens on week 2.
    pub fn new(total_weeks: usize) -> Self {
        let mut weeks = vec![WeekState::Unoptimized; total_weeks];
        if let Some(first) = weeks.first_mut() {
            *first = WeekState::Implemented;
        }
        Self {
            weeks,
            current: 2.min(total_weeks.max(1)),
        }
    }

    #[inline]
    pub fn total_weeks(&self) -> usize {
        self.weeks.len()
    }

    /// The week currently being worked, or `None` once every week is
    /// implemented.
    pub fn current_week(&self) -> Option<usize> {
        if self.is_complete() {
            None
        } else {
            Some(self.current)
        }
    }

    /// State of a 1-based week, if it exists.
    pub fn state(&self, week: usize) -> Option<WeekState> {
        if week == 0 {
            return None;
        }
        self.weeks.get(week - 1).copied()
    }

    /// Whether every week of the season is implemented.
    pub fn is_complete(&self) -> bool {
        self.weeks.iter().all(|w| *w == WeekState::Implemented)
    }

    /// Records a proposal for `week`. Re-proposing an already-proposed
    /// week replaces the old proposal and is allowed.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Structural`] when the week is out of range, is
    /// week 1, is not the current week, or is already implemented.
    pub fn propose(&mut self, week: usize) -> Result<()> {
        self.check_week(week)?;
        if week != self.current {
            return Err(ScheduleError::Structural(format!(
                "week {week} is not the current week ({})",
                self.current
            )));
        }
        match self.weeks[week - 1] {
            WeekState::Implemented => Err(ScheduleError::Structural(format!(
                "week {week} is already implemented"
            ))),
            WeekState::Unoptimized | WeekState::Proposed => {
                self.weeks[week - 1] = WeekState::Proposed;
                Ok(())
            }
        }
    }

    /// Confirms the proposal for `week`, marking it implemented. The
    /// cursor stays put; call [`advance`](Self::advance) once the
    /// confirmed schedule is live.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Structural`] when the week is out of range or has
    /// no pending proposal.
    pub fn confirm(&mut self, week: usize) -> Result<()> {
        self.check_week(week)?;
        match self.weeks[week - 1] {
            WeekState::Proposed => {
                self.weeks[week - 1] = WeekState::Implemented;
                Ok(())
            }
            WeekState::Unoptimized => Err(ScheduleError::Structural(format!(
                "week {week} has no proposal to confirm"
            ))),
            WeekState::Implemented => Err(ScheduleError::Structural(format!(
                "week {week} is already implemented"
            ))),
        }
    }

    /// Moves the cursor to the next unimplemented week and returns it.
    /// A completed season stays completed; the call is then a no-op
    /// returning `None`.
    pub fn advance(&mut self) -> Option<usize> {
        let next = self
            .weeks
            .iter()
            .enumerate()
            .skip(self.current.min(self.weeks.len())) // weeks after the cursor
            .find(|(_, w)| **w != WeekState::Implemented)
            .map(|(i, _)| i + 1)
            .or_else(|| {
                // Wrap back for any unimplemented week left behind.
                self.weeks
                    .iter()
                    .position(|w| *w != WeekState::Implemented)
                    .map(|i| i + 1)
            })?;
        self.current = next;
        Some(next)
    }

    fn check_week(&self, week: usize) -> Result<()> {
        if week == 1 {
            return Err(ScheduleError::Structural(
                "week 1 anchors the season and has no lifecycle".to_string(),
            ));
        }
        if week == 0 || week > self.weeks.len() {
            return Err(ScheduleError::Structural(format!(
                "week {week} out of range (season has {} week(s))",
                self.weeks.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_season_anchors_week_one() {
        let progress = SeasonProgress::new(4);
        assert_eq!(progress.state(1), Some(WeekState::Implemented));
        assert_eq!(progress.state(2), Some(WeekState::Unoptimized));
        assert_eq!(progress.current_week(), Some(2));
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_propose_confirm_advance_lifecycle() {
        let mut progress = SeasonProgress::new(3);
        progress.propose(2).unwrap();
        assert_eq!(progress.state(2), Some(WeekState::Proposed));
        progress.confirm(2).unwrap();
        assert_eq!(progress.state(2), Some(WeekState::Implemented));
        // Confirm does not advance on its own.
        assert_eq!(progress.current_week(), Some(2));
        assert_eq!(progress.advance(), Some(3));
        progress.propose(3).unwrap();
        progress.confirm(3).unwrap();
        assert!(progress.is_complete());
        assert_eq!(progress.current_week(), None);
    }

    #[test]
    fn test_reproposal_allowed() {
        let mut progress = SeasonProgress::new(3);
        progress.propose(2).unwrap();
        progress.propose(2).unwrap();
        assert_eq!(progress.state(2), Some(WeekState::Proposed));
    }

    #[test]
    fn test_week_one_rejects_transitions() {
        let mut progress = SeasonProgress::new(3);
        assert!(progress.propose(1).is_err());
        assert!(progress.confirm(1).is_err());
    }

    #[test]
    fn test_confirm_without_proposal_rejected() {
        let mut progress = SeasonProgress::new(3);
        let err = progress.confirm(2).unwrap_err();
        assert!(err.to_string().contains("no proposal"));
    }

    #[test]
    fn test_propose_out_of_turn_rejected() {
        let mut progress = SeasonProgress::new(4);
        assert!(progress.propose(3).is_err());
    }

    #[test]
    fn test_out_of_range_week() {
        let mut progress = SeasonProgress::new(3);
        assert!(progress.propose(7).is_err());
        assert!(progress.confirm(0).is_err());
    }

    #[test]
    fn test_advance_at_completion_is_noop() {
        let mut progress = SeasonProgress::new(2);
        progress.propose(2).unwrap();
        progress.confirm(2).unwrap();
        assert!(progress.is_complete());
        assert_eq!(progress.advance(), None);
        assert!(progress.is_complete());
        assert_eq!(progress.advance(), None);
    }

    #[test]
    fn test_double_confirm_rejected() {
        let mut progress = SeasonProgress::new(3);
        progress.propose(2).unwrap();
        progress.confirm(2).unwrap();
        assert!(progress.confirm(2).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut progress = SeasonProgress::new(3);
        progress.propose(2).unwrap();
        let json = serde_json::to_string(&progress).unwrap();
        let back: SeasonProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }
}
