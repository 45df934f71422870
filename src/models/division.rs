//! Divisions and division-label normalization.
//!
//! Division labels arrive as free text ("12 team", "div 12", "Division 12")
//! from spreadsheets and registration forms. Every boundary of the engine
//! normalizes labels through [`normalize_division`] so team tags and recipe
//! keys always align; a mismatch between the two once silently disabled the
//! strict filler, which is why downstream code errors loudly instead of
//! guessing when a key has no match.

use serde::{Deserialize, Serialize};

/// A division: a set of teams that play round-robin against each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    /// Canonical key, e.g. `"div12"`. Always normalized.
    pub key: String,
    /// Display name as supplied by the caller.
    pub name: String,
    /// Number of teams registered in this division.
    pub roster_size: usize,
}

impl Division {
    /// Creates a division, normalizing the supplied label into the key.
    pub fn new(name: impl Into<String>, roster_size: usize) -> Self {
        let name = name.into();
        Self {
            key: normalize_division(&name),
            name,
            roster_size,
        }
    }
}

/// Canonicalizes a free-text division label.
///
/// Lower-cases and trims, then takes the first run of digits as the
/// division size: `"12 team"`, `"div 12"`, and `"Division 12"` all map to
/// `"div12"`. Labels without digits are lower-cased with whitespace
/// stripped; empty input maps to `"unknown"`. Total and idempotent.
pub fn normalize_division(label: &str) -> String {
    let trimmed = label.trim().to_lowercase();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }

    let digits: String = trimmed
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if !digits.is_empty() {
        return format!("div{digits}");
    }

    trimmed.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_spellings_collapse() {
        assert_eq!(normalize_division("12 team"), "div12");
        assert_eq!(normalize_division("div 12"), "div12");
        assert_eq!(normalize_division("Division 12"), "div12");
        assert_eq!(normalize_division("  12-Team  "), "div12");
    }

    #[test]
    fn test_first_digit_run_wins() {
        assert_eq!(normalize_division("8 of 12 teams"), "div8");
    }

    #[test]
    fn test_wordy_labels_strip_whitespace() {
        assert_eq!(normalize_division("Sunday Beer League"), "sundaybeerleague");
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(normalize_division(""), "unknown");
        assert_eq!(normalize_division("   "), "unknown");
    }

    #[test]
    fn test_idempotent() {
        for label in ["Division 12", "Sunday Beer League", ""] {
            let once = normalize_division(label);
            assert_eq!(normalize_division(&once), once);
        }
    }

    #[test]
    fn test_division_new_normalizes_key() {
        let d = Division::new("Division 8", 8);
        assert_eq!(d.key, "div8");
        assert_eq!(d.name, "Division 8");
        assert_eq!(d.roster_size, 8);
    }
}
