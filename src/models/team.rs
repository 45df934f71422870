//! Teams.

use serde::{Deserialize, Serialize};

use super::division::normalize_division;

/// A team in the league. `division` is the label as supplied by the
/// caller; use [`Team::division_key`] wherever keys must align.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub division: String,
    /// Optional sub-division tag; pairings respect this boundary when
    /// crossover is disabled.
    pub sub_division: Option<String>,
}

impl Team {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        division: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            division: division.into(),
            sub_division: None,
        }
    }

    pub fn with_sub_division(mut self, sub_division: impl Into<String>) -> Self {
        self.sub_division = Some(sub_division.into());
        self
    }

    /// Normalized division key for this team.
    #[inline]
    pub fn division_key(&self) -> String {
        normalize_division(&self.division)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_key_is_normalized() {
        let team = Team::new("t1", "Ice Dogs", "Division 12");
        assert_eq!(team.division_key(), "div12");
    }

    #[test]
    fn test_sub_division_builder() {
        let team = Team::new("t1", "Ice Dogs", "div 12").with_sub_division("North");
        assert_eq!(team.sub_division.as_deref(), Some("North"));
    }
}
