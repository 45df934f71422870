//! Error taxonomy for the scheduling engine.
//!
//! Four categories, matching how failures are surfaced to the caller:
//! validation failures are rejected before any computation, structural
//! failures abort loudly (never degrade silently), capacity shortfalls are
//! reported as diagnostics alongside a usable partial schedule, and
//! timeouts abandon the invocation without committing any mutation.

use thiserror::Error;

use crate::validation::ValidationIssue;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Engine-level error.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed or inconsistent input, rejected at the boundary.
    #[error("invalid input: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// A structural mismatch the engine refuses to paper over, e.g. a
    /// recipe key with no matching round-robin.
    #[error("structural error: {0}")]
    Structural(String),

    /// Round-robin supply exhausted before every team reached its target.
    /// Carried as an error only when the caller demands a complete
    /// schedule; `assemble` reports shortfalls as diagnostics instead.
    #[error("capacity shortfall: {0}")]
    Capacity(String),

    /// The invocation exceeded its time budget; nothing was mutated.
    #[error("timed out after {elapsed_ms} ms (budget {budget_ms} ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationIssue, ValidationIssueKind};

    #[test]
    fn test_validation_display_joins_messages() {
        let err = ScheduleError::Validation(vec![
            ValidationIssue::new(ValidationIssueKind::DuplicateId, "Duplicate slot ID: s1"),
            ValidationIssue::new(ValidationIssueKind::EmptyInput, "no teams supplied"),
        ]);
        let text = err.to_string();
        assert!(text.contains("Duplicate slot ID: s1"));
        assert!(text.contains("no teams supplied"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ScheduleError::Timeout {
            elapsed_ms: 61_000,
            budget_ms: 60_000,
        };
        assert_eq!(err.to_string(), "timed out after 61000 ms (budget 60000 ms)");
    }
}
