//! Input validation for scheduling runs.
//!
//! Checks structural integrity of slots, teams, and divisions before any
//! computation. Detects:
//! - Duplicate IDs
//! - Empty slot pools and rosters
//! - Inverted slot intervals
//! - Teams referencing undeclared divisions
//! - Divisions too small to round-robin

use std::collections::{HashMap, HashSet};

use crate::models::{normalize_division, Division, Slot, Team};

/// Validation result.
pub type ValidationOutcome = Result<(), Vec<ValidationIssue>>;

/// A validation issue.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Issue category.
    pub kind: ValidationIssueKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssueKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A required input collection is empty.
    EmptyInput,
    /// A slot ends at or before it starts.
    InvertedInterval,
    /// A team's division does not appear in the declared divisions.
    UnknownDivision,
    /// A division has fewer than two teams, so no pairing exists.
    UndersizedDivision,
}

impl ValidationIssue {
    pub(crate) fn new(kind: ValidationIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the inputs of a scheduling run.
///
/// Checks:
/// 1. At least one slot and at least two teams
/// 2. No duplicate slot or team IDs
/// 3. Every slot interval runs forward
/// 4. Every team's division key matches a declared division (when
///    divisions are declared)
/// 5. Every division with scheduled teams has at least two of them
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(issues)` with all detected issues.
pub fn validate_input(slots: &[Slot], teams: &[Team], divisions: &[Division]) -> ValidationOutcome {
    let mut issues = Vec::new();

    if slots.is_empty() {
        issues.push(ValidationIssue::new(
            ValidationIssueKind::EmptyInput,
            "no slots supplied",
        ));
    }
    if teams.len() < 2 {
        issues.push(ValidationIssue::new(
            ValidationIssueKind::EmptyInput,
            format!("need at least 2 teams, got {}", teams.len()),
        ));
    }

    let mut slot_ids = HashSet::new();
    for slot in slots {
        if !slot_ids.insert(slot.id.as_str()) {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::DuplicateId,
                format!("Duplicate slot ID: {}", slot.id),
            ));
        }
        if slot.end <= slot.start {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::InvertedInterval,
                format!("Slot '{}' ends at or before it starts", slot.id),
            ));
        }
    }

    let mut team_ids = HashSet::new();
    for team in teams {
        if !team_ids.insert(team.id.as_str()) {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::DuplicateId,
                format!("Duplicate team ID: {}", team.id),
            ));
        }
    }

    let declared: HashSet<String> = divisions.iter().map(|d| normalize_division(&d.name)).collect();
    let mut roster: HashMap<String, usize> = HashMap::new();
    for team in teams {
        let key = team.division_key();
        *roster.entry(key.clone()).or_default() += 1;
        if !divisions.is_empty() && key != "unknown" && !declared.contains(&key) {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::UnknownDivision,
                format!(
                    "Team '{}' references unknown division '{}'",
                    team.name, team.division
                ),
            ));
        }
    }

    for (key, count) in &roster {
        if key != "unknown" && *count < 2 {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::UndersizedDivision,
                format!("Division '{key}' has only {count} team(s); no pairing exists"),
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
